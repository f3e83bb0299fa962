// Overlap elimination over resolved highlight ranges.

use crate::resolver::ResolvedHighlight;

/// Greedy, stable, first-wins overlap elimination:
///
/// 1. Sort ascending by `start_position` with a *stable* sort, so ties break
///    toward whichever anchor was listed earlier in the input — not by id or
///    any other secondary key.
/// 2. Walk the sorted list, keeping a range only if its `start_position` is
///    `>=` the `end_position` of the most recently kept range.
/// 3. Re-sort the survivors descending by `start_position`, so callers that
///    apply wraps in reverse document order don't invalidate earlier byte
///    offsets as they go.
///
/// Anchors eliminated here are not reported as orphaned: they
/// *did* resolve, they just lost a scheduling conflict to another anchor.
pub fn eliminate_overlaps(mut resolved: Vec<ResolvedHighlight>) -> Vec<ResolvedHighlight> {
    resolved.sort_by(|a, b| a.start_position.cmp(&b.start_position));

    let mut kept: Vec<ResolvedHighlight> = Vec::with_capacity(resolved.len());
    for candidate in resolved {
        let overlaps = kept
            .last()
            .is_some_and(|prev| candidate.start_position < prev.end_position);
        if !overlaps {
            kept.push(candidate);
        }
    }

    kept.sort_by(|a, b| b.start_position.cmp(&a.start_position));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Strategy;

    fn range(id: &str, start: i64, end: i64) -> ResolvedHighlight {
        ResolvedHighlight {
            anchor_id: id.to_string(),
            start_position: start,
            end_position: end,
            strategy: Strategy::TextPosition,
            confidence: 1.0,
        }
    }

    #[test]
    fn disjoint_ranges_all_survive() {
        let input = vec![range("a", 0, 5), range("b", 5, 10), range("c", 10, 15)];
        let kept = eliminate_overlaps(input);
        assert_eq!(kept.len(), 3);
        // Descending by start_position.
        assert_eq!(kept[0].anchor_id, "c");
        assert_eq!(kept[1].anchor_id, "b");
        assert_eq!(kept[2].anchor_id, "a");
    }

    #[test]
    fn overlapping_range_loses_to_the_earlier_starting_one() {
        let input = vec![range("a", 0, 10), range("b", 5, 15)];
        let kept = eliminate_overlaps(input);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].anchor_id, "a");
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        // b starts exactly where a ends: not a conflict.
        let input = vec![range("a", 0, 5), range("b", 5, 10)];
        let kept = eliminate_overlaps(input);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn nested_range_is_eliminated_by_its_container() {
        let input = vec![range("outer", 0, 20), range("inner", 5, 10)];
        let kept = eliminate_overlaps(input);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].anchor_id, "outer");
    }

    #[test]
    fn ties_at_the_same_start_keep_the_earlier_listed_anchor() {
        // Same start_position: the stable sort must preserve input order, so
        // whichever anchor was listed first wins regardless of id ordering.
        let input = vec![range("zzz", 0, 5), range("aaa", 0, 8)];
        let kept = eliminate_overlaps(input);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].anchor_id, "zzz");

        let input = vec![range("aaa", 0, 5), range("zzz", 0, 8)];
        let kept = eliminate_overlaps(input);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].anchor_id, "aaa");
    }

    #[test]
    fn empty_input_returns_empty_output() {
        assert!(eliminate_overlaps(Vec::new()).is_empty());
    }
}
