// Node path encoding — a deterministic, XPath-like identifier for a text
// node within the HTML tree.

use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::domutil::{child_index, get_parent, is_text_node, is_whitespace_only, tag_name, text_contents};

/// One segment of a node path: either an element step (tag + like-kind
/// sibling index) or a text step (like-kind sibling index among
/// non-whitespace-only text siblings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Element { tag: String, index: usize },
    Text { index: usize },
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Element { tag, index } => write!(f, "/{tag}[{index}]"),
            Segment::Text { index } => write!(f, "/text()[{index}]"),
        }
    }
}

/// A full node path from the traversal root (always written symbolically
/// as `/body`) down to a target node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath(pub Vec<Segment>);

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/body")?;
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

static TEXT_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^text\(\)(?:\[(\d+)\])?$").unwrap());
static ELEMENT_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z][a-zA-Z0-9-]*)(?:\[(\d+)\])?$").unwrap());

impl NodePath {
    /// Walk `node`'s parents up to (but not including) `root`, computing one
    /// segment per step. Returns segments in root-to-leaf order.
    pub fn encode(node: &Handle, root: &Handle) -> NodePath {
        let mut segments = Vec::new();
        let mut current = node.clone();

        loop {
            if Rc::ptr_eq(&current, root) {
                break;
            }
            let Some(parent) = get_parent(&current) else {
                break;
            };
            segments.push(segment_for(&current, &parent));
            if Rc::ptr_eq(&parent, root) {
                break;
            }
            current = parent;
        }

        segments.reverse();
        NodePath(segments)
    }

    /// Parse a path string. Unparseable segments return `None` for the
    /// whole path.
    pub fn parse(s: &str) -> Option<NodePath> {
        let mut segments = Vec::new();
        for (i, part) in s.split('/').enumerate() {
            if part.is_empty() {
                continue;
            }
            if i <= 1 && part.eq_ignore_ascii_case("body") {
                continue;
            }
            if let Some(caps) = TEXT_SEGMENT.captures(part) {
                let index = caps
                    .get(1)
                    .map(|m| m.as_str().parse().unwrap_or(0))
                    .unwrap_or(0);
                segments.push(Segment::Text { index });
            } else if let Some(caps) = ELEMENT_SEGMENT.captures(part) {
                let tag = caps[1].to_ascii_lowercase();
                let index = caps
                    .get(2)
                    .map(|m| m.as_str().parse().unwrap_or(0))
                    .unwrap_or(0);
                segments.push(Segment::Element { tag, index });
            } else {
                return None;
            }
        }
        Some(NodePath(segments))
    }

    /// Resolve this path against `root`. Returns `None` if any segment
    /// cannot be satisfied.
    pub fn resolve(&self, root: &Handle) -> Option<Handle> {
        let mut current = root.clone();
        for segment in &self.0 {
            current = match segment {
                Segment::Element { tag, index } => nth_element_child(&current, tag, *index)?,
                Segment::Text { index } => nth_text_child(&current, *index)?,
            };
        }
        Some(current)
    }
}

/// Compute the segment for `node` relative to its `parent`.
fn segment_for(node: &Handle, parent: &Handle) -> Segment {
    let my_index = child_index(parent, node).unwrap_or(0);
    let children = parent.children.borrow();

    if is_text_node(node) {
        let index = children[..my_index]
            .iter()
            .filter(|sibling| {
                is_text_node(sibling)
                    && !is_whitespace_only(&text_contents(sibling).unwrap_or_default())
            })
            .count();
        Segment::Text { index }
    } else {
        let tag = tag_name(node).unwrap_or_default();
        let index = children[..my_index]
            .iter()
            .filter(|sibling| tag_name(sibling).as_deref() == Some(tag.as_str()))
            .count();
        Segment::Element { tag, index }
    }
}

fn nth_text_child(parent: &Handle, index: usize) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .filter(|c| is_text_node(c) && !is_whitespace_only(&text_contents(c).unwrap_or_default()))
        .nth(index)
        .cloned()
}

fn nth_element_child(parent: &Handle, tag: &str, index: usize) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .filter(|c| tag_name(c).as_deref() == Some(tag))
        .nth(index)
        .cloned()
}
