// The durable anchor record — the caller-owned description of a previously
// made highlight, plus its JSON wire form.
//
// The in-memory shape uses a tagged `AnchorPosition` view that distinguishes
// v1 (text-only) from v2 (text + path) data more clearly than a flat struct
// with a pile of `Option`s would. The JSON wire format stays flat for
// backward compatibility, so `Anchor` itself stores the flat fields and
// exposes the tagged view as a borrowing method.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::HighlightError;

/// The v1 (text-only) fields shared by every anchor, regardless of schema
/// version: legacy plain-text offsets (a locality hint, not authoritative
/// after edits) plus the exact text and its surrounding context.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionCore {
    pub start_offset: i64,
    pub end_offset: i64,
    pub exact_text: String,
    pub prefix_context: String,
    pub suffix_context: String,
}

impl PositionCore {
    /// `end_offset - start_offset`.
    pub fn length(&self) -> i64 {
        self.end_offset - self.start_offset
    }
}

/// The v2 (text + path) fields: a precise DOM location captured at the time
/// the highlight was made, which may go stale if the document changes.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLocator {
    pub start_node_path: String,
    pub start_node_offset: i64,
    pub end_node_path: String,
    pub end_node_offset: i64,
    pub text_fingerprint: Option<String>,
}

/// A read-only, tagged view over an anchor's position data.
#[derive(Debug, Clone, Copy)]
pub enum AnchorPosition<'a> {
    V1(&'a PositionCore),
    V2(&'a PositionCore, &'a NodeLocator),
}

impl<'a> AnchorPosition<'a> {
    pub fn core(&self) -> &'a PositionCore {
        match self {
            AnchorPosition::V1(c) => c,
            AnchorPosition::V2(c, _) => c,
        }
    }

    pub fn locator(&self) -> Option<&'a NodeLocator> {
        match self {
            AnchorPosition::V1(_) => None,
            AnchorPosition::V2(_, l) => Some(l),
        }
    }
}

/// A highlight color: the value as the caller provided it (a palette name
/// or a recognizable hex string) plus the hex triplet resolved from it.
/// Unknown palette names decode to the default (yellow).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color {
    pub raw: String,
    pub hex: String,
}

const DEFAULT_PALETTE: &[(&str, &str)] = &[
    ("yellow", "FFF176"),
    ("green", "AED581"),
    ("blue", "81D4FA"),
    ("pink", "F48FB1"),
    ("orange", "FFCC80"),
    ("purple", "CE93D8"),
];

const DEFAULT_HEX: &str = "FFF176";

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^#?([0-9a-f]{6})$").unwrap());

impl Color {
    /// Resolve a palette name or hex string to a `Color`. Never fails: an
    /// unrecognized name falls back to yellow.
    pub fn from_name(raw: &str) -> Color {
        let lower = raw.trim().to_ascii_lowercase();
        if let Some((_, hex)) = DEFAULT_PALETTE.iter().find(|(name, _)| *name == lower) {
            return Color {
                raw: raw.to_string(),
                hex: (*hex).to_string(),
            };
        }
        if let Some(caps) = HEX_COLOR.captures(&lower) {
            return Color {
                raw: raw.to_string(),
                hex: caps[1].to_ascii_uppercase(),
            };
        }
        Color {
            raw: raw.to_string(),
            hex: DEFAULT_HEX.to_string(),
        }
    }

    /// Decode the resolved hex triplet into `(r, g, b)` components.
    pub fn rgb(&self) -> (u8, u8, u8) {
        let byte = |i: usize| u8::from_str_radix(&self.hex[i..i + 2], 16).unwrap_or(0);
        (byte(0), byte(2), byte(4))
    }
}

/// A durable description of a highlight, sufficient to re-locate it in a
/// possibly-changed document.
#[derive(Debug, Clone)]
pub struct Anchor {
    pub id: String,
    pub article_id: String,
    pub schema_version: u8,
    pub core: PositionCore,
    pub locator: Option<NodeLocator>,
    pub note_content: Option<String>,
    pub color: Color,
    pub created_at: String,
    pub updated_at: String,
}

/// Anchor-record equality is defined by id alone, deliberately: the engine
/// and its callers use anchors in sets/maps keyed by identity, not content.
/// Two anchors with the same id but different fields compare equal. This
/// can confuse naive diffing, but the identity-based behavior is intentional.
impl PartialEq for Anchor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Anchor {}

impl Anchor {
    /// Tagged view over this anchor's position data.
    pub fn position(&self) -> AnchorPosition<'_> {
        match &self.locator {
            Some(loc) => AnchorPosition::V2(&self.core, loc),
            None => AnchorPosition::V1(&self.core),
        }
    }

    /// True iff all four v2 path/offset fields are present, independent of
    /// the declared `schema_version`.
    pub fn has_v2_data(&self) -> bool {
        self.locator.is_some()
    }

    /// `end_offset - start_offset`.
    pub fn length(&self) -> i64 {
        self.core.length()
    }

    /// Parse an anchor from its JSON wire form. Required-field and type
    /// errors are reported per-field rather than failing on the first one.
    pub fn from_json(s: &str) -> Result<Anchor, HighlightError> {
        let value: Value = serde_json::from_str(s)?;
        Anchor::from_value(&value)
    }

    /// Serialize this anchor to its JSON wire form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_value()).expect("anchor JSON value is always serializable")
    }

    fn from_value(value: &Value) -> Result<Anchor, HighlightError> {
        let obj = value.as_object().ok_or_else(|| HighlightError::InvalidAnchorField {
            field: "<root>",
            reason: "expected a JSON object".to_string(),
        })?;

        let get_str = |field: &'static str| -> Result<String, HighlightError> {
            obj.get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| HighlightError::InvalidAnchorField {
                    field,
                    reason: "missing or not a string".to_string(),
                })
        };
        let get_i64 = |field: &'static str| -> Result<i64, HighlightError> {
            obj.get(field)
                .and_then(Value::as_i64)
                .ok_or_else(|| HighlightError::InvalidAnchorField {
                    field,
                    reason: "missing or not an integer".to_string(),
                })
        };
        let opt_str = |field: &'static str| -> Result<Option<String>, HighlightError> {
            match obj.get(field) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => v
                    .as_str()
                    .map(|s| Some(s.to_string()))
                    .ok_or_else(|| HighlightError::InvalidAnchorField {
                        field,
                        reason: "not a string".to_string(),
                    }),
            }
        };
        let opt_i64 = |field: &'static str| -> Result<Option<i64>, HighlightError> {
            match obj.get(field) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => v
                    .as_i64()
                    .map(Some)
                    .ok_or_else(|| HighlightError::InvalidAnchorField {
                        field,
                        reason: "not an integer".to_string(),
                    }),
            }
        };

        let id = get_str("id")?;
        let article_id = get_str("article_id")?;
        let start_offset = get_i64("start_offset")?;
        let end_offset = get_i64("end_offset")?;
        if end_offset < start_offset {
            return Err(HighlightError::InvalidAnchorField {
                field: "end_offset",
                reason: "end_offset must be >= start_offset".to_string(),
            });
        }
        let exact_text = get_str("exact_text")?;
        let prefix_context = get_str("prefix_context")?;
        let suffix_context = get_str("suffix_context")?;
        let note_content = opt_str("note_content")?;
        let color = Color::from_name(&get_str("color")?);
        let created_at = get_str("created_at")?;
        validate_iso8601("created_at", &created_at)?;
        let updated_at = get_str("updated_at")?;
        validate_iso8601("updated_at", &updated_at)?;

        let schema_version = match obj.get("schema_version") {
            None | Some(Value::Null) => 1,
            Some(v) => v.as_i64().ok_or_else(|| HighlightError::InvalidAnchorField {
                field: "schema_version",
                reason: "not an integer".to_string(),
            })?,
        };
        if schema_version != 1 && schema_version != 2 {
            return Err(HighlightError::InvalidAnchorField {
                field: "schema_version",
                reason: format!("expected 1 or 2, got {schema_version}"),
            });
        }

        let start_node_path = opt_str("start_node_path")?;
        let start_node_offset = opt_i64("start_node_offset")?;
        let end_node_path = opt_str("end_node_path")?;
        let end_node_offset = opt_i64("end_node_offset")?;
        let text_fingerprint = opt_str("text_fingerprint")?;

        let locator = match (start_node_path, start_node_offset, end_node_path, end_node_offset) {
            (Some(sp), Some(so), Some(ep), Some(eo)) => Some(NodeLocator {
                start_node_path: sp,
                start_node_offset: so,
                end_node_path: ep,
                end_node_offset: eo,
                text_fingerprint,
            }),
            _ => None,
        };

        Ok(Anchor {
            id,
            article_id,
            schema_version: schema_version as u8,
            core: PositionCore {
                start_offset,
                end_offset,
                exact_text,
                prefix_context,
                suffix_context,
            },
            locator,
            note_content,
            color,
            created_at,
            updated_at,
        })
    }

    fn to_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("id".into(), Value::String(self.id.clone()));
        obj.insert("article_id".into(), Value::String(self.article_id.clone()));
        obj.insert("start_offset".into(), Value::from(self.core.start_offset));
        obj.insert("end_offset".into(), Value::from(self.core.end_offset));
        obj.insert("exact_text".into(), Value::String(self.core.exact_text.clone()));
        obj.insert("prefix_context".into(), Value::String(self.core.prefix_context.clone()));
        obj.insert("suffix_context".into(), Value::String(self.core.suffix_context.clone()));
        obj.insert(
            "note_content".into(),
            self.note_content.clone().map(Value::String).unwrap_or(Value::Null),
        );
        obj.insert("color".into(), Value::String(self.color.raw.clone()));
        obj.insert("created_at".into(), Value::String(self.created_at.clone()));
        obj.insert("updated_at".into(), Value::String(self.updated_at.clone()));
        obj.insert("schema_version".into(), Value::from(self.schema_version));

        let (start_node_path, start_node_offset, end_node_path, end_node_offset, text_fingerprint) =
            match &self.locator {
                Some(loc) => (
                    Value::String(loc.start_node_path.clone()),
                    Value::from(loc.start_node_offset),
                    Value::String(loc.end_node_path.clone()),
                    Value::from(loc.end_node_offset),
                    loc.text_fingerprint.clone().map(Value::String).unwrap_or(Value::Null),
                ),
                None => (Value::Null, Value::Null, Value::Null, Value::Null, Value::Null),
            };
        obj.insert("start_node_path".into(), start_node_path);
        obj.insert("start_node_offset".into(), start_node_offset);
        obj.insert("end_node_path".into(), end_node_path);
        obj.insert("end_node_offset".into(), end_node_offset);
        obj.insert("text_fingerprint".into(), text_fingerprint);

        Value::Object(obj)
    }
}

/// Structural ISO-8601 check: four digit year, dashes, `T`, colons. Not
/// calendar-validated — no date library is in the dependency graph, and
/// calendar validity isn't a property any test requires.
fn validate_iso8601(field: &'static str, s: &str) -> Result<(), HighlightError> {
    static ISO8601: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").unwrap()
    });
    if ISO8601.is_match(s) {
        Ok(())
    } else {
        Err(HighlightError::InvalidAnchorField {
            field,
            reason: format!("not an ISO-8601 timestamp: {s:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json(extra: &str) -> String {
        format!(
            r#"{{
                "id": "a1",
                "article_id": "art1",
                "start_offset": 5,
                "end_offset": 13,
                "exact_text": "powerful",
                "prefix_context": "is a ",
                "suffix_context": " engine",
                "note_content": null,
                "color": "yellow",
                "created_at": "2026-01-01T00:00:00Z",
                "updated_at": "2026-01-01T00:00:00Z"
                {extra}
            }}"#
        )
    }

    #[test]
    fn round_trips_v1_anchor() {
        let json = sample_json("");
        let anchor = Anchor::from_json(&json).unwrap();
        assert_eq!(anchor.schema_version, 1);
        assert!(!anchor.has_v2_data());
        let back = Anchor::from_json(&anchor.to_json()).unwrap();
        assert_eq!(anchor, back); // id-only equality
        assert_eq!(back.core, anchor.core);
        assert_eq!(back.color, anchor.color);
    }

    #[test]
    fn round_trips_v2_anchor() {
        let extra = r#","schema_version": 2,
            "start_node_path": "/body/p[0]/text()[0]",
            "start_node_offset": 5,
            "end_node_path": "/body/p[0]/text()[0]",
            "end_node_offset": 13,
            "text_fingerprint": "abc123""#;
        let json = sample_json(extra);
        let anchor = Anchor::from_json(&json).unwrap();
        assert!(anchor.has_v2_data());
        let back = Anchor::from_json(&anchor.to_json()).unwrap();
        assert_eq!(back.locator, anchor.locator);
    }

    #[test]
    fn missing_required_field_is_reported_by_name() {
        let json = r#"{"article_id":"a"}"#;
        let err = Anchor::from_json(json).unwrap_err();
        match err {
            HighlightError::InvalidAnchorField { field, .. } => assert_eq!(field, "id"),
            other => panic!("expected InvalidAnchorField, got {other:?}"),
        }
    }

    #[test]
    fn unknown_palette_name_decodes_to_yellow() {
        let color = Color::from_name("not-a-color");
        assert_eq!(color.hex, DEFAULT_HEX);
    }

    #[test]
    fn hex_color_is_parsed_directly() {
        let color = Color::from_name("#336699");
        assert_eq!(color.hex, "336699");
        assert_eq!(color.rgb(), (0x33, 0x66, 0x99));
    }

    #[test]
    fn ids_alone_determine_equality() {
        let mut a = Anchor::from_json(&sample_json("")).unwrap();
        let mut b = a.clone();
        b.core.exact_text = "different".to_string();
        assert_eq!(a, b);
        a.id = "other".to_string();
        assert_ne!(a, b);
    }
}
