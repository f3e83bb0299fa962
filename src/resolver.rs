// The anchor → plain-text-range resolver. Tries three strategies in a fixed
// order with separately calibrated acceptance thresholds, falling through to
// the next strategy whenever the current one can't clear its own bar.

use std::sync::LazyLock;

use regex::Regex;

use crate::anchor::Anchor;
use crate::similarity::similarity;
use crate::text_map::TextMap;

/// Which strategy produced a resolved range, or that none did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    DomPath,
    TextPosition,
    ContextSearch,
    Failed,
}

/// The outcome of resolving one anchor against one text map.
#[derive(Debug, Clone)]
pub struct ResolvedHighlight {
    pub anchor_id: String,
    /// Half-open `[start, end)` into the text map's plain text. `-1, -1` on
    /// failure.
    pub start_position: i64,
    pub end_position: i64,
    pub strategy: Strategy,
    pub confidence: f64,
}

impl ResolvedHighlight {
    fn failed(anchor_id: String) -> ResolvedHighlight {
        ResolvedHighlight {
            anchor_id,
            start_position: -1,
            end_position: -1,
            strategy: Strategy::Failed,
            confidence: 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.strategy == Strategy::Failed
    }
}

/// The three acceptance thresholds. Calibrated independently and kept
/// separable — do not merge them into a single scoring function, since each
/// strategy's tolerance for noise is different by design.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub dom_path_threshold: f64,
    pub text_position_threshold: f64,
    pub context_search_threshold: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            dom_path_threshold: 0.9,
            text_position_threshold: 0.7,
            context_search_threshold: 0.5,
        }
    }
}

/// Resolve `anchor` against `map`, trying dom_path, then text_position,
/// then context_search, returning the first accepted result or `Failed`.
pub fn resolve(anchor: &Anchor, map: &TextMap, config: &ResolverConfig) -> ResolvedHighlight {
    if let Some(result) = try_dom_path(anchor, map) {
        if result.confidence >= config.dom_path_threshold {
            return result;
        }
    }
    if let Some(result) = try_text_position(anchor, map) {
        if result.confidence >= config.text_position_threshold {
            return result;
        }
    }
    if let Some(result) = try_context_search(anchor, map, config.context_search_threshold) {
        return result;
    }
    ResolvedHighlight::failed(anchor.id.clone())
}

fn make(anchor: &Anchor, start: usize, end: usize, strategy: Strategy, confidence: f64) -> ResolvedHighlight {
    ResolvedHighlight {
        anchor_id: anchor.id.clone(),
        start_position: start as i64,
        end_position: end as i64,
        strategy,
        confidence,
    }
}

// ---------------------------------------------------------------------------
// Strategy A — DOM path
// ---------------------------------------------------------------------------

fn try_dom_path(anchor: &Anchor, map: &TextMap) -> Option<ResolvedHighlight> {
    let locator = anchor.position().locator()?;

    let start_record = map.get_node_by_path(&locator.start_node_path)?;
    let end_record = map.get_node_by_path(&locator.end_node_path)?;

    let start_offset = usize::try_from(locator.start_node_offset).ok()?;
    let end_offset = usize::try_from(locator.end_node_offset).ok()?;

    let start = start_record.plain_text_start + start_offset;
    let end = end_record.plain_text_start + end_offset;

    if start >= end || end > map.plain_text.len() {
        return None;
    }
    let candidate = map.plain_text.get(start..end)?;

    let sim = similarity(candidate, &anchor.core.exact_text);
    if sim >= 0.7 {
        Some(make(anchor, start, end, Strategy::DomPath, sim))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Strategy B — text position
// ---------------------------------------------------------------------------

fn try_text_position(anchor: &Anchor, map: &TextMap) -> Option<ResolvedHighlight> {
    let text = &map.plain_text;
    let core = &anchor.core;
    let exact = core.exact_text.as_str();
    let prefix = core.prefix_context.as_str();
    let suffix = core.suffix_context.as_str();

    let combined = format!("{prefix}{exact}{suffix}");
    if let Some(idx) = text.find(&combined) {
        let start = idx + prefix.len();
        let end = start + exact.len();
        return Some(make(anchor, start, end, Strategy::TextPosition, 1.0));
    }

    if !prefix.is_empty() {
        let combined = format!("{prefix}{exact}");
        if let Some(idx) = text.find(&combined) {
            let start = idx + prefix.len();
            let end = start + exact.len();
            return Some(make(anchor, start, end, Strategy::TextPosition, 0.9));
        }
    }

    if !suffix.is_empty() {
        let combined = format!("{exact}{suffix}");
        if let Some(idx) = text.find(&combined) {
            let end = idx + exact.len();
            return Some(make(anchor, idx, end, Strategy::TextPosition, 0.9));
        }
    }

    let occurrences = find_all(text, exact);
    match occurrences.len() {
        0 => None,
        1 => {
            let start = occurrences[0];
            let end = start + exact.len();
            Some(make(anchor, start, end, Strategy::TextPosition, 0.8))
        }
        _ => {
            let hint = core.start_offset;
            let mut best = occurrences[0];
            let mut best_dist = (best as i64 - hint).abs();
            for &occ in &occurrences[1..] {
                let dist = (occ as i64 - hint).abs();
                if dist < best_dist {
                    best = occ;
                    best_dist = dist;
                }
            }
            let end = best + exact.len();
            Some(make(anchor, best, end, Strategy::TextPosition, 0.7))
        }
    }
}

fn find_all(text: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    let mut positions = Vec::new();
    let mut start = 0;
    while let Some(rel) = text[start..].find(needle) {
        let pos = start + rel;
        positions.push(pos);
        start = pos + 1;
        if start >= text.len() {
            break;
        }
    }
    positions
}

// ---------------------------------------------------------------------------
// Strategy C — context search
// ---------------------------------------------------------------------------

fn try_context_search(anchor: &Anchor, map: &TextMap, threshold: f64) -> Option<ResolvedHighlight> {
    let core = &anchor.core;

    if let Some((start, end, score)) = scan_best_window(
        &map.plain_text,
        &core.exact_text,
        &core.prefix_context,
        &core.suffix_context,
        core.exact_text.chars().count(),
    ) {
        if score >= threshold {
            return Some(make(anchor, start, end, Strategy::ContextSearch, score));
        }
    }

    // Whitespace-normalized fallback: collapse runs of whitespace to a
    // single space and trim, then repeat the scan. The candidate substring
    // still reuses the raw (non-normalized) exact-text length rather than
    // the normalized length — preserved as documented behavior. The match
    // position the scan finds is in `norm_text`'s coordinate space, though,
    // which diverges from `map.plain_text`'s byte offsets whenever a
    // whitespace run anywhere before the match changes length under
    // normalization, so it has to be translated back to a raw offset before
    // becoming a `ResolvedHighlight` (the applicator and `TextMap` queries
    // only understand `map.plain_text` coordinates).
    let (norm_text, raw_offsets) = normalize_whitespace_with_offsets(&map.plain_text);
    let norm_exact = normalize_whitespace(&core.exact_text);
    let norm_prefix = normalize_whitespace(&core.prefix_context);
    let norm_suffix = normalize_whitespace(&core.suffix_context);

    let (norm_start, score) = scan_best_window(
        &norm_text,
        &norm_exact,
        &norm_prefix,
        &norm_suffix,
        norm_exact.chars().count(),
    )
    .map(|(start, _end, score)| (start, score))?;

    if score < threshold {
        return None;
    }

    let bounds = char_byte_bounds(&norm_text);
    let start = translate_offset(&bounds, &raw_offsets, norm_start)?;
    let end = (start + core.exact_text.len()).min(map.plain_text.len());
    Some(make(anchor, start, end, Strategy::ContextSearch, score))
}

/// Slide a `window_chars`-wide window over `text`, scoring each offset
/// against `exact` (60%) and the clamped surrounding context against
/// `prefix`/`suffix` (40%). Returns the best-scoring `(start_byte,
/// end_byte, score)`, if any offset met the 0.7 text-similarity floor.
fn scan_best_window(
    text: &str,
    exact: &str,
    prefix: &str,
    suffix: &str,
    window_chars: usize,
) -> Option<(usize, usize, f64)> {
    if window_chars == 0 {
        return None;
    }
    let bounds = char_byte_bounds(text);
    let total_chars = bounds.len() - 1;
    if window_chars > total_chars {
        return None;
    }
    let prefix_chars = prefix.chars().count();
    let suffix_chars = suffix.chars().count();

    let mut best: Option<(usize, usize, f64)> = None;

    for i in 0..=(total_chars - window_chars) {
        let start_b = bounds[i];
        let end_b = bounds[i + window_chars];
        let window = &text[start_b..end_b];

        let text_sim = similarity(window, exact);
        if text_sim < 0.7 {
            continue;
        }

        let ctx_prefix_start = i.saturating_sub(prefix_chars);
        let ctx_prefix = &text[bounds[ctx_prefix_start]..bounds[i]];

        let ctx_suffix_end = (i + window_chars + suffix_chars).min(total_chars);
        let ctx_suffix = &text[bounds[i + window_chars]..bounds[ctx_suffix_end]];

        let context_score = (similarity(ctx_prefix, prefix) + similarity(ctx_suffix, suffix)) / 2.0;
        let total = 0.6 * text_sim + 0.4 * context_score;

        if best.as_ref().map_or(true, |(_, _, b)| total > *b) {
            best = Some((start_b, end_b, total));
        }
    }

    best
}

/// Byte offset of each char boundary in `text`, plus a trailing sentinel
/// equal to `text.len()`. `bounds[i]..bounds[j]` is always a valid `&str`
/// slice for `i <= j <= bounds.len() - 1`.
fn char_byte_bounds(text: &str) -> Vec<usize> {
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    bounds
}

fn normalize_whitespace(s: &str) -> String {
    static RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
    RUNS.replace_all(s.trim(), " ").into_owned()
}

/// Like [`normalize_whitespace`], but also returns, for every char boundary
/// in the normalized output (one entry per char plus a trailing sentinel,
/// same shape as [`char_byte_bounds`]), the byte offset in `s` that char
/// came from — the start of the run it collapsed, for a run-replacing
/// space. Lets a match position found in the normalized text be translated
/// back into `s`'s own coordinate space.
fn normalize_whitespace_with_offsets(s: &str) -> (String, Vec<usize>) {
    let leading_trim = s.len() - s.trim_start().len();
    let mut out = String::new();
    let mut raw_offsets = Vec::new();
    let mut in_ws_run = false;

    for (i, c) in s.char_indices() {
        if i < leading_trim {
            continue;
        }
        if c.is_whitespace() {
            if !in_ws_run {
                raw_offsets.push(i);
                out.push(' ');
                in_ws_run = true;
            }
        } else {
            raw_offsets.push(i);
            out.push(c);
            in_ws_run = false;
        }
    }

    if out.ends_with(' ') {
        out.pop();
        raw_offsets.pop();
    }
    raw_offsets.push(s.len());

    (out, raw_offsets)
}

/// Translate a byte offset known to be a char boundary in the normalized
/// text (as produced alongside `raw_offsets` by
/// `normalize_whitespace_with_offsets`) back into a byte offset in the
/// original text.
fn translate_offset(bounds: &[usize], raw_offsets: &[usize], byte_offset: usize) -> Option<usize> {
    let index = bounds.binary_search(&byte_offset).ok()?;
    raw_offsets.get(index).copied()
}
