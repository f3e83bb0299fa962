// HTML parsing, plain-text projection, marker removal, and serialization.

use std::rc::Rc;

use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope as HtmlTraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::domutil::{
    child_index, get_parent, has_attr, is_text_node, is_whitespace_only, tag_name, text_contents,
};
use crate::path::NodePath;
use crate::text_map::{TextMap, TextNodeRecord};

/// Default marker tag used when no `EngineConfig` override is supplied.
pub const DEFAULT_MARKER_TAG: &str = "html-hl";

/// Legacy marker form, from before the current marker tag existed:
/// `<span data-hl-id="...">`.
const LEGACY_MARKER_ATTR: &str = "data-hl-id";

/// Elements whose subtree should never be treated as highlightable text.
fn is_ignored_subtree(tag: &str, marker_tag: &str) -> bool {
    tag == "script" || tag == "style" || tag == marker_tag
}

/// Block-level elements: boundaries where the plain-text projection inserts
/// a `'\n'` separator.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre", "hr",
    "br", "table", "thead", "tbody", "tr", "td", "th", "article", "section", "header", "footer",
    "nav", "aside", "figure", "figcaption", "address", "dd", "dt", "dl",
];

fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

/// Parse an HTML string and return the body element, or the document
/// element if no body exists.
pub fn parse(html: &str) -> Handle {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let dom: RcDom = parse_document(RcDom::default(), opts)
        .from_utf8()
        .one(html.as_bytes());

    find_body(&dom.document).unwrap_or(dom.document)
}

fn find_body(node: &Handle) -> Option<Handle> {
    if tag_name(node).as_deref() == Some("body") {
        return Some(node.clone());
    }
    for child in node.children.borrow().iter() {
        if let Some(body) = find_body(child) {
            return Some(body);
        }
    }
    None
}

/// Build the plain-text projection and text-node index for `root`, using
/// the default marker tag.
pub fn build_text_map(root: &Handle) -> TextMap {
    build_text_map_with_marker(root, DEFAULT_MARKER_TAG)
}

/// Build the plain-text projection and text-node index for `root`.
pub fn build_text_map_with_marker(root: &Handle, marker_tag: &str) -> TextMap {
    let mut buffer = String::new();
    let mut records = Vec::new();
    walk_for_text_map(root, root, marker_tag, &mut buffer, &mut records);
    TextMap::new(buffer, records)
}

fn walk_for_text_map(
    node: &Handle,
    root: &Handle,
    marker_tag: &str,
    buffer: &mut String,
    records: &mut Vec<TextNodeRecord>,
) {
    match &node.data {
        NodeData::Text { .. } => {
            let text = text_contents(node).unwrap_or_default();
            if !is_whitespace_only(&text) {
                let start = buffer.len();
                buffer.push_str(&text);
                let end = buffer.len();
                records.push(TextNodeRecord {
                    node: node.clone(),
                    path: NodePath::encode(node, root),
                    plain_text_start: start,
                    plain_text_end: end,
                    text,
                });
            }
        }
        NodeData::Element { name, .. } => {
            let tag = name.local.as_ref().to_ascii_lowercase();
            if is_ignored_subtree(&tag, marker_tag) {
                return;
            }
            let block = is_block_tag(&tag);
            if block && !buffer.is_empty() && !buffer.ends_with('\n') {
                buffer.push('\n');
            }
            for child in node.children.borrow().iter() {
                walk_for_text_map(child, root, marker_tag, buffer, records);
            }
            if block && !buffer.is_empty() && !buffer.ends_with('\n') {
                buffer.push('\n');
            }
        }
        NodeData::Document => {
            for child in node.children.borrow().iter() {
                walk_for_text_map(child, root, marker_tag, buffer, records);
            }
        }
        _ => {}
    }
}

/// Remove every marker element (current tag or legacy `data-hl-id` span),
/// unwrapping its children into its parent, then normalize adjacent text
/// nodes.
pub fn remove_highlights(root: &Handle, marker_tag: &str) {
    loop {
        let Some(marker) = find_first_marker(root, marker_tag) else {
            break;
        };
        unwrap_node(&marker);
    }
    normalize_text_nodes(root);
}

fn find_first_marker(node: &Handle, marker_tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &node.data {
        let tag = name.local.as_ref().to_ascii_lowercase();
        if tag == marker_tag || (tag == "span" && has_attr(node, LEGACY_MARKER_ATTR)) {
            return Some(node.clone());
        }
    }
    for child in node.children.borrow().iter() {
        if let Some(found) = find_first_marker(child, marker_tag) {
            return Some(found);
        }
    }
    None
}

/// Move `node`'s children into its parent at its position, then remove the
/// now-empty node.
fn unwrap_node(node: &Handle) {
    let Some(parent) = get_parent(node) else {
        return;
    };
    let Some(index) = child_index(&parent, node) else {
        return;
    };

    let children: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
    for child in &children {
        child.parent.set(Some(Rc::downgrade(&parent)));
    }

    let mut parent_children = parent.children.borrow_mut();
    parent_children.remove(index);
    for (offset, child) in children.into_iter().enumerate() {
        parent_children.insert(index + offset, child);
    }
    node.parent.set(None);
}

/// Recursively merge adjacent text siblings throughout the tree, restoring
/// the "no adjacent text nodes" invariant that stable paths depend on.
pub fn normalize_text_nodes(root: &Handle) {
    {
        let children: Vec<Handle> = root.children.borrow().clone();
        for child in &children {
            normalize_text_nodes(child);
        }
    }

    let mut children = root.children.borrow_mut();
    let mut i = 0;
    while i + 1 < children.len() {
        if is_text_node(&children[i]) && is_text_node(&children[i + 1]) {
            let next_text = text_contents(&children[i + 1]).unwrap_or_default();
            if let NodeData::Text { contents } = &children[i].data {
                contents.borrow_mut().push_slice(&next_text);
            }
            children[i + 1].parent.set(None);
            children.remove(i + 1);
        } else {
            i += 1;
        }
    }
}

/// Serialize the inner HTML of `root` (its children, not `root` itself —
/// `root` is body and is never re-emitted).
pub fn serialize_children(root: &Handle) -> String {
    let mut output = Vec::new();
    for child in root.children.borrow().iter() {
        let handle = SerializableHandle::from(child.clone());
        serialize(
            &mut output,
            &handle,
            SerializeOpts {
                traversal_scope: HtmlTraversalScope::IncludeNode,
                ..Default::default()
            },
        )
        .expect("serializing to an in-memory Vec<u8> never fails");
    }
    String::from_utf8(output).expect("html5ever always serializes valid UTF-8")
}

/// Check if any attribute named `data-hl-id` exists anywhere in `root`
/// (used by the overlap-free idempotence tests).
#[cfg(test)]
pub(crate) fn count_markers(root: &Handle, marker_tag: &str) -> usize {
    let mut count = 0;
    fn walk(node: &Handle, marker_tag: &str, count: &mut usize) {
        if let NodeData::Element { name, .. } = &node.data {
            let tag = name.local.as_ref().to_ascii_lowercase();
            if tag == marker_tag {
                *count += 1;
            }
        }
        for child in node.children.borrow().iter() {
            walk(child, marker_tag, count);
        }
    }
    walk(root, marker_tag, &mut count);
    count
}
