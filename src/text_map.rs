// The plain-text projection and its text-node index, plus the queries used
// to map between it and the DOM that produced it.

use markup5ever_rcdom::Handle;
use std::collections::HashMap;

use crate::path::NodePath;

/// One addressable text node: its position in `TextMap::plain_text`, its
/// path, and the node's own literal text (unchanged from source).
#[derive(Clone)]
pub struct TextNodeRecord {
    pub node: Handle,
    pub path: NodePath,
    pub plain_text_start: usize,
    pub plain_text_end: usize,
    pub text: String,
}

/// The plain-text projection of a document plus the index needed to map
/// between it and the DOM that produced it.
pub struct TextMap {
    pub plain_text: String,
    pub text_nodes: Vec<TextNodeRecord>,
    pub by_path: HashMap<String, usize>,
}

impl TextMap {
    pub fn new(plain_text: String, text_nodes: Vec<TextNodeRecord>) -> TextMap {
        let by_path = text_nodes
            .iter()
            .enumerate()
            .map(|(i, record)| (record.path.to_string(), i))
            .collect();
        TextMap {
            plain_text,
            text_nodes,
            by_path,
        }
    }

    pub fn get_node_by_path(&self, path: &str) -> Option<&TextNodeRecord> {
        self.by_path.get(path).map(|&i| &self.text_nodes[i])
    }

    /// The record whose `[start, end)` contains `position`, if any.
    pub fn find_node_at_position(&self, position: usize) -> Option<&TextNodeRecord> {
        self.text_nodes
            .iter()
            .find(|r| position >= r.plain_text_start && position < r.plain_text_end)
    }

    /// All records whose `[start, end)` intersects `[start, end)`, in
    /// document order.
    pub fn get_nodes_in_range(&self, start: usize, end: usize) -> Vec<&TextNodeRecord> {
        self.text_nodes
            .iter()
            .filter(|r| r.plain_text_start < end && r.plain_text_end > start)
            .collect()
    }

    /// Map a plain-text position to the `(path, local_offset)` of the text
    /// node that contains it.
    pub fn plain_text_to_dom(&self, position: usize) -> Option<(String, usize)> {
        let record = self.find_node_at_position(position)?;
        Some((record.path.to_string(), position - record.plain_text_start))
    }

    /// Map a `(path, local_offset)` back to a plain-text position.
    pub fn dom_to_plain_text(&self, path: &str, offset: usize) -> Option<usize> {
        let record = self.get_node_by_path(path)?;
        Some(record.plain_text_start + offset)
    }
}
