// html-highlight — durable highlight anchors against a re-parsed HTML
// document, resolved with a three-strategy cascade and applied as marker
// elements.
//
// Architecture:
//   HTML string → html5ever parse → body tree → strip prior markers →
//   text map (plain-text projection + node index) → resolve each anchor →
//   overlap filter → wrap ranges in marker elements → serialize

mod anchor;
mod applicator;
mod dom;
mod domutil;
mod engine;
mod error;
mod overlap;
mod path;
mod resolver;
mod similarity;
mod text_map;

pub use anchor::{Anchor, AnchorPosition, Color, NodeLocator, PositionCore};
pub use dom::DEFAULT_MARKER_TAG;
pub use engine::{
    apply, clear_all_cache, clear_cache, extract_plain_text, get_text_map, Engine, EngineConfig,
    EngineState, HighlightResult,
};
pub use error::HighlightError;
pub use path::NodePath;
pub use resolver::{ResolvedHighlight, ResolverConfig, Strategy};
pub use text_map::{TextMap, TextNodeRecord};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_empty_anchors_returns_input_html() {
        let result = apply("<p>Hello, world!</p>", &[], None, false);
        assert_eq!(result.html, "<p>Hello, world!</p>");
        assert_eq!(result.applied, 0);
    }

    #[test]
    fn apply_resolves_and_wraps_a_single_anchor() {
        let anchor = Anchor::from_json(
            r#"{
                "id": "a1",
                "article_id": "art1",
                "start_offset": 10,
                "end_offset": 18,
                "exact_text": "powerful",
                "prefix_context": "is a ",
                "suffix_context": " engine",
                "note_content": null,
                "color": "yellow",
                "created_at": "2026-01-01T00:00:00Z",
                "updated_at": "2026-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        let result = apply("<p>This is a powerful engine.</p>", &[anchor], None, false);
        assert_eq!(result.applied, 1);
        assert!(result.orphaned_ids.is_empty());
        assert!(result.html.contains(r#"data-hl-id="a1""#));
        assert!(result.html.contains(">powerful</html-hl>"));
    }
}
