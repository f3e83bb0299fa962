// Wraps resolved, non-overlapping ranges in marker elements. 

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::{ns, Attribute, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData};

use crate::anchor::Anchor;
use crate::domutil::{child_index, get_parent, has_ancestor_tag, set_text_contents, text_contents};
use crate::resolver::ResolvedHighlight;
use crate::text_map::{TextMap, TextNodeRecord};

/// Apply every range in `ranges` (already overlap-filtered and sorted
/// descending by `start_position`,) against `root`, looking up
/// each range's anchor in `anchors` by id.
///
/// `root` and `map` must describe the *same* tree: `map` was built before
/// any of these wraps were applied, and the text-node records it holds
/// still point at live nodes in `root` that this function mutates in
/// place. Ranges must be applied in descending document order so that an
/// earlier (later-starting) wrap never shifts a still-unprocessed range's
/// target node or offsets.
pub fn apply_ranges(
    root: &Handle,
    map: &TextMap,
    ranges: &[ResolvedHighlight],
    anchors: &std::collections::HashMap<String, &Anchor>,
    marker_tag: &str,
) {
    for range in ranges {
        let Some(anchor) = anchors.get(&range.anchor_id) else {
            continue;
        };
        apply_one(root, map, range, anchor, marker_tag);
    }
}

fn apply_one(root: &Handle, map: &TextMap, range: &ResolvedHighlight, anchor: &Anchor, marker_tag: &str) {
    if range.start_position < 0 || range.end_position < 0 {
        return;
    }
    let start = range.start_position as usize;
    let end = range.end_position as usize;
    if start >= end {
        return;
    }

    let records = map.get_nodes_in_range(start, end);
    match records.len() {
        0 => {}
        1 => wrap_single(root, records[0], start, end, anchor, marker_tag),
        _ => wrap_multi(root, &records, start, end, anchor, marker_tag),
    }
}

/// Clamp `(start, end)` (already record-relative) into `[0, len]` and
/// reject the span if clamping collapsed it to empty.
fn clamp(start: i64, end: i64, len: usize) -> Option<(usize, usize)> {
    let start = start.clamp(0, len as i64) as usize;
    let end = end.clamp(0, len as i64) as usize;
    if start < end {
        Some((start, end))
    } else {
        None
    }
}

fn wrap_single(
    root: &Handle,
    record: &TextNodeRecord,
    global_start: usize,
    global_end: usize,
    anchor: &Anchor,
    marker_tag: &str,
) {
    let local_start = global_start as i64 - record.plain_text_start as i64;
    let local_end = global_end as i64 - record.plain_text_start as i64;
    wrap_record(root, record, local_start, local_end, anchor, marker_tag);
}

fn wrap_multi(
    root: &Handle,
    records: &[&TextNodeRecord],
    global_start: usize,
    global_end: usize,
    anchor: &Anchor,
    marker_tag: &str,
) {
    let last_index = records.len() - 1;
    // Reverse document order: mutating a later record first never shifts
    // an earlier record's parent or child indices.
    for (i, record) in records.iter().enumerate().rev() {
        let text_len = record.text.len() as i64;
        let (local_start, local_end) = if i == 0 && i == last_index {
            (
                global_start as i64 - record.plain_text_start as i64,
                global_end as i64 - record.plain_text_start as i64,
            )
        } else if i == 0 {
            (global_start as i64 - record.plain_text_start as i64, text_len)
        } else if i == last_index {
            (0, global_end as i64 - record.plain_text_start as i64)
        } else {
            (0, text_len)
        };
        wrap_record(root, record, local_start, local_end, anchor, marker_tag);
    }
}

/// Wrap `[local_start, local_end)` of `record`'s node's *current* text.
///
/// Reads the node's live text rather than `record.text`,'s
/// note that "local offsets are recomputed against the node's current
/// text" — this matters when two disjoint global ranges land on the same
/// original text-node record (only possible when one range's local span
/// starts after the other's local span ends, since overlap elimination
/// already guarantees the global ranges are disjoint). To keep the
/// original node addressable for a later (lower-start) touch, the
/// original text-node handle is reused as the shrinking `before` prefix
/// — mutated in place, not replaced — rather than discarded; `middle` and
/// `after` become new sibling nodes inserted just after it. `before` is
/// only ever empty on the *last* touch this record can receive (a local
/// start of 0 can't shrink further), so removing the node outright in
/// that case is safe.
fn wrap_record(
    root: &Handle,
    record: &TextNodeRecord,
    local_start: i64,
    local_end: i64,
    anchor: &Anchor,
    marker_tag: &str,
) {
    let node = &record.node;
    let text = text_contents(node).unwrap_or_default();
    let Some((start, end)) = clamp(local_start, local_end, text.len()) else {
        return;
    };
    let Some((before, middle, after)) = split_text(&text, start, end) else {
        return;
    };

    let Some(parent) = get_parent(node) else {
        return;
    };
    let Some(index) = child_index(&parent, node) else {
        return;
    };

    let wrapper = build_wrapper(node, root, anchor, marker_tag);
    append_text_child(&wrapper, &middle);

    let mut trailing: Vec<Handle> = Vec::with_capacity(2);
    trailing.push(wrapper);
    if !after.is_empty() {
        trailing.push(make_text_node(&after));
    }

    if before.is_empty() {
        splice_children(&parent, index, 1, trailing);
    } else {
        set_text_contents(node, &before);
        splice_children(&parent, index + 1, 0, trailing);
    }
}

fn split_text(text: &str, start: usize, end: usize) -> Option<(String, String, String)> {
    let before = text.get(..start)?;
    let middle = text.get(start..end)?;
    let after = text.get(end..)?;
    Some((before.to_string(), middle.to_string(), after.to_string()))
}

/// Tag and `style` attribute are both ancestor-sensitive: an
/// `a` ancestor forces `span` instead of the marker tag (no nested anchors);
/// a `pre`/`code` ancestor drops the border-radius/padding from the style.
fn build_wrapper(node: &Handle, root: &Handle, anchor: &Anchor, marker_tag: &str) -> Handle {
    let tag = if has_ancestor_tag(node, root, "a") {
        "span"
    } else {
        marker_tag
    };
    let in_code = has_ancestor_tag(node, root, "pre") || has_ancestor_tag(node, root, "code");
    let style = highlight_style(anchor, in_code);

    let attrs = vec![
        Attribute {
            name: QualName::new(None, ns!(), "data-hl-id".into()),
            value: anchor.id.as_str().into(),
        },
        Attribute {
            name: QualName::new(None, ns!(), "style".into()),
            value: style.as_str().into(),
        },
    ];

    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), tag.into()),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// The two CSS strings, written without internal spaces — this is the
/// exact format the highlighting contract's literal end-to-end scenarios
/// assert against, not the looser prose rendering some writeups use.
fn highlight_style(anchor: &Anchor, in_code: bool) -> String {
    let (r, g, b) = anchor.color.rgb();
    if in_code {
        format!("background-color:rgba({r},{g},{b},0.3);")
    } else {
        format!("background-color:rgba({r},{g},{b},0.4);border-radius:2px;padding:0 2px;")
    }
}

fn make_text_node(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(text.into()),
    })
}

fn append_text_child(parent: &Handle, text: &str) {
    let child = make_text_node(text);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Replace `count` children of `parent` starting at `index` with
/// `replacement`, fixing up parent pointers on the new children.
fn splice_children(parent: &Handle, index: usize, count: usize, replacement: Vec<Handle>) {
    for child in &replacement {
        child.parent.set(Some(Rc::downgrade(parent)));
    }
    let mut children = parent.children.borrow_mut();
    children.splice(index..index + count, replacement);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{build_text_map, parse, serialize_children, DEFAULT_MARKER_TAG};
    use crate::overlap::eliminate_overlaps;
    use crate::resolver::{resolve, ResolverConfig};
    use std::collections::HashMap;

    fn make_anchor(id: &str, exact: &str, prefix: &str, suffix: &str, color: &str) -> Anchor {
        Anchor {
            id: id.to_string(),
            article_id: "art1".to_string(),
            schema_version: 1,
            core: crate::anchor::PositionCore {
                start_offset: 0,
                end_offset: exact.chars().count() as i64,
                exact_text: exact.to_string(),
                prefix_context: prefix.to_string(),
                suffix_context: suffix.to_string(),
            },
            locator: None,
            note_content: None,
            color: crate::anchor::Color::from_name(color),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn apply_all(html: &str, anchors: Vec<Anchor>) -> String {
        let root = parse(html);
        let map = build_text_map(&root);
        let resolved: Vec<_> = anchors
            .iter()
            .map(|a| resolve(a, &map, &ResolverConfig::default()))
            .filter(|r| !r.is_failed())
            .collect();
        let ranges = eliminate_overlaps(resolved);
        let by_id: HashMap<String, &Anchor> = anchors.iter().map(|a| (a.id.clone(), a)).collect();
        apply_ranges(&root, &map, &ranges, &by_id, DEFAULT_MARKER_TAG);
        serialize_children(&root)
    }

    #[test]
    fn single_word_gets_wrapped_with_default_marker_tag() {
        let html = apply_all(
            "<p>This is a powerful engine.</p>",
            vec![make_anchor("a1", "powerful", "is a ", " engine", "yellow")],
        );
        assert!(html.contains(r#"data-hl-id="a1""#));
        assert!(html.contains("background-color:rgba(255,241,118,0.4);border-radius:2px;padding:0 2px;"));
        assert!(html.contains("<html-hl"));
        assert!(html.contains(">powerful</html-hl>"));
    }

    #[test]
    fn code_block_ancestor_uses_the_reduced_style() {
        let html = apply_all(
            "<pre><code>let x = 1;</code></pre>",
            vec![make_anchor("a1", "x = 1", "let ", ";", "yellow")],
        );
        assert!(html.contains("background-color:rgba(255,241,118,0.3);"));
        assert!(!html.contains("border-radius"));
    }

    #[test]
    fn anchor_ancestor_forces_span_wrapper() {
        let html = apply_all(
            r#"<p><a href="#">click to read more</a></p>"#,
            vec![make_anchor("a1", "read", "to ", " more", "yellow")],
        );
        assert!(html.contains("<span"));
        assert!(!html.contains("<html-hl"));
    }

    #[test]
    fn highlight_spanning_two_elements_wraps_both() {
        let html = apply_all(
            "<p>Alpha beta.</p><p>Gamma delta.</p>",
            vec![make_anchor("a1", "beta.\nGamma", "Alpha ", " delta", "green")],
        );
        assert_eq!(html.matches("data-hl-id=\"a1\"").count(), 2);
    }

    #[test]
    fn two_disjoint_anchors_within_the_same_text_node_both_apply() {
        let html = apply_all(
            "<p>one two three four</p>",
            vec![
                make_anchor("a", "one", "", " two", "yellow"),
                make_anchor("b", "three", "two ", " four", "blue"),
            ],
        );
        assert!(html.contains("data-hl-id=\"a\""));
        assert!(html.contains("data-hl-id=\"b\""));
        assert!(html.contains(">one</html-hl>"));
        assert!(html.contains(">three</html-hl>"));
    }

    #[test]
    fn overlapping_anchors_only_the_winner_is_applied() {
        let html = apply_all(
            "<p>cat sat. cat sat. cat sat.</p>",
            vec![
                make_anchor("a", "cat sat. cat", "", "", "yellow"),
                make_anchor("b", "sat. cat sat", "cat ", "", "blue"),
            ],
        );
        assert!(html.contains("data-hl-id=\"a\""));
        assert!(!html.contains("data-hl-id=\"b\""));
    }
}
