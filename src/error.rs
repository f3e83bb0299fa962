/// Errors that can occur while working with anchor records.
///
/// `apply` itself never fails: per-anchor resolution failure is reported
/// through the orphan list, not through this type. This enum covers only
/// the caller-visible failure described in the anchor JSON contract —
/// malformed input reports which field was invalid.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HighlightError {
    #[error("invalid anchor field `{field}`: {reason}")]
    InvalidAnchorField {
        field: &'static str,
        reason: String,
    },

    #[error("anchor JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
