// Property tests over the invariants the highlighting contract lists:
// idempotence, determinism, plain-text preservation, orphan accounting,
// marker well-formedness, anchor and path round-trips, similarity bounds.

use html_highlight::{apply, extract_plain_text, Anchor, NodePath};
use pretty_assertions::assert_eq;

fn anchor_json(id: &str, exact: &str, prefix: &str, suffix: &str, start: i64) -> String {
    let end = start + exact.chars().count() as i64;
    format!(
        r#"{{
            "id": {id:?},
            "article_id": "art1",
            "start_offset": {start},
            "end_offset": {end},
            "exact_text": {exact:?},
            "prefix_context": {prefix:?},
            "suffix_context": {suffix:?},
            "note_content": null,
            "color": "blue",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }}"#
    )
}

fn anchor(id: &str, exact: &str, prefix: &str, suffix: &str, start: i64) -> Anchor {
    Anchor::from_json(&anchor_json(id, exact, prefix, suffix, start)).unwrap()
}

#[test]
fn idempotence_holds_across_a_second_apply() {
    let anchors = vec![anchor("a1", "quick brown fox", "The ", " jumps", 4)];
    let html = "<p>The quick brown fox jumps over the lazy dog.</p>";
    let first = apply(html, &anchors, None, false);
    let second = apply(&first.html, &anchors, None, false);
    assert_eq!(first.html, second.html);
}

#[test]
fn determinism_across_repeated_runs() {
    let anchors = vec![anchor("a1", "lazy dog", "the ", ".", 38)];
    let html = "<p>The quick brown fox jumps over the lazy dog.</p>";
    let first = apply(html, &anchors, None, false);
    let second = apply(html, &anchors, None, false);
    assert_eq!(first.html, second.html);
    assert_eq!(first.applied, second.applied);
    assert_eq!(first.orphaned_ids, second.orphaned_ids);
}

#[test]
fn plain_text_projection_is_unchanged_by_applying_highlights() {
    let anchors = vec![anchor("a1", "beta.\nGamma", "Alpha ", " delta", 6)];
    let html = "<p>Alpha beta.</p><p>Gamma delta.</p>";
    let result = apply(html, &anchors, None, false);
    assert_eq!(extract_plain_text(&result.html), extract_plain_text(html));
}

#[test]
fn orphan_accounting_never_exceeds_input_count() {
    let anchors = vec![
        anchor("a1", "quick brown fox", "The ", " jumps", 4),
        anchor("a2", "does not exist anywhere", "", "", 0),
    ];
    let html = "<p>The quick brown fox jumps over the lazy dog.</p>";
    let result = apply(html, &anchors, None, false);
    assert!(result.applied + result.orphaned_ids.len() <= anchors.len());
    assert_eq!(result.applied, 1);
    assert_eq!(result.orphaned_ids, vec!["a2".to_string()]);
}

#[test]
fn marker_elements_are_well_formed_and_never_nest() {
    let anchors = vec![anchor("a1", "quick brown fox", "The ", " jumps", 4)];
    let html = "<p>The quick brown fox jumps over the lazy dog.</p>";
    let result = apply(html, &anchors, None, false);
    assert_eq!(result.html.matches("data-hl-id").count(), 1);
    assert_eq!(result.html.matches("<html-hl").count(), 1);
    // No marker nested inside another marker.
    assert_eq!(result.html.matches("<html-hl").count(), result.html.matches("</html-hl>").count());
}

#[test]
fn anchor_round_trip_preserves_v1_and_v2_fields() {
    let v1 = anchor("a1", "foo", "bar ", " baz", 4);
    let back = Anchor::from_json(&v1.to_json()).unwrap();
    assert_eq!(back, v1); // id-only equality
    assert_eq!(back.core, v1.core);

    let v2_json = format!(
        r#"{{
            "id": "a2",
            "article_id": "art1",
            "start_offset": 0,
            "end_offset": 3,
            "exact_text": "foo",
            "prefix_context": "",
            "suffix_context": "",
            "note_content": "a note",
            "color": "green",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
            "schema_version": 2,
            "start_node_path": "/body/p[0]/text()[0]",
            "start_node_offset": 0,
            "end_node_path": "/body/p[0]/text()[0]",
            "end_node_offset": 3,
            "text_fingerprint": "abc"
        }}"#
    );
    let v2 = Anchor::from_json(&v2_json).unwrap();
    let back2 = Anchor::from_json(&v2.to_json()).unwrap();
    assert_eq!(back2.locator, v2.locator);
    assert!(back2.has_v2_data());
}

#[test]
fn every_text_node_path_round_trips_through_the_resolver() {
    // Build a map directly via the engine's public text-map accessor,
    // then confirm every record's path parses back to the same node path
    // string (resolution through the DOM tree is covered in src/path.rs;
    // here we confirm the path format survives a string round-trip).
    let map = html_highlight::get_text_map("<p>Alpha <b>beta</b> gamma.</p>", None);
    for record in &map.text_nodes {
        let parsed = NodePath::parse(&record.path.to_string()).unwrap();
        assert_eq!(parsed.to_string(), record.path.to_string());
    }
}
