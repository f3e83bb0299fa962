// Small `markup5ever_rcdom` navigation helpers shared by the path, DOM
// processor, and applicator modules.

use markup5ever_rcdom::{Handle, NodeData};
use std::rc::Rc;

/// Whitespace-only text is vacuously true for the empty string too — both
/// are non-addressable content
pub(crate) fn is_whitespace_only(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

pub(crate) fn is_text_node(handle: &Handle) -> bool {
    matches!(handle.data, NodeData::Text { .. })
}

/// Lowercased tag name of an element node.
pub(crate) fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref().to_ascii_lowercase()),
        _ => None,
    }
}

pub(crate) fn get_attr(handle: &Handle, name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref() == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub(crate) fn has_attr(handle: &Handle, name: &str) -> bool {
    get_attr(handle, name).is_some()
}

/// The node's text content — only meaningful for `Text` nodes.
pub(crate) fn text_contents(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

pub(crate) fn set_text_contents(handle: &Handle, text: &str) {
    if let NodeData::Text { contents } = &handle.data {
        *contents.borrow_mut() = text.into();
    }
}

/// Upgrade a node's weak parent pointer without consuming it.
pub(crate) fn get_parent(handle: &Handle) -> Option<Handle> {
    let weak = handle.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    handle.parent.set(weak);
    parent
}

/// Index of `child` among `parent`'s children, by pointer identity.
pub(crate) fn child_index(parent: &Handle, child: &Handle) -> Option<usize> {
    parent
        .children
        .borrow()
        .iter()
        .position(|c| Rc::ptr_eq(c, child))
}

/// True if any ancestor of `node` (strictly above it, stopping at `root`
/// inclusive) has tag `tag`.
pub(crate) fn has_ancestor_tag(node: &Handle, root: &Handle, tag: &str) -> bool {
    let mut current = match get_parent(node) {
        Some(p) => p,
        None => return false,
    };
    loop {
        if tag_name(&current).as_deref() == Some(tag) {
            return true;
        }
        if Rc::ptr_eq(&current, root) {
            return false;
        }
        current = match get_parent(&current) {
            Some(p) => p,
            None => return false,
        };
    }
}
