//! Tier reconciliation
//!
//! Merges the report views of the three tiers into one deduplicated,
//! newest-first list. Tiers are ranked cache, then durable log, then remote:
//! when the same id appears in several tiers the highest-ranked copy wins,
//! so a local edit is never shadowed by a stale remote echo. Records without
//! an id cannot be deduplicated and are dropped. Ordering uses the parsed
//! creation instant with the epoch fallback, so records with unreadable
//! timestamps sink to the oldest end instead of poisoning the sort.

use std::cmp::Reverse;
use std::collections::HashSet;

use tracing::debug;

use sitrep_core::Report;

/// Merge tier views in priority order, newest first. The remote tier is
/// optional; `None` (no fetch, or fetch failed) contributes zero records
/// and is indistinguishable from an empty one in the output.
pub fn merge_tiers(
    cache: Vec<Report>,
    durable: Vec<Report>,
    remote: Option<Vec<Report>>,
) -> Vec<Report> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    let mut dropped = 0u64;
    for report in cache.into_iter().chain(durable).chain(remote.into_iter().flatten()) {
        if !report.has_id() {
            dropped += 1;
            continue;
        }
        if seen.insert(report.id.clone()) {
            merged.push(report);
        }
    }
    if dropped > 0 {
        debug!(dropped, "dropped records without an id during merge");
    }
    merged.sort_by_cached_key(|r| Reverse(r.sort_timestamp()));
    merged
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, timestamp: &str, laporan: &str) -> Report {
        Report {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            laporan: laporan.to_string(),
            ..Report::default()
        }
    }

    #[test]
    fn test_merge_of_empty_tiers_is_empty() {
        assert!(merge_tiers(Vec::new(), Vec::new(), None).is_empty());
        assert!(merge_tiers(Vec::new(), Vec::new(), Some(Vec::new())).is_empty());
    }

    #[test]
    fn test_higher_tier_wins_on_duplicate_id() {
        let cache = vec![record("a", "2024-01-01T04:00:00Z", "from cache")];
        let durable = vec![record("a", "2024-01-01T04:00:00Z", "from log")];
        let remote = vec![
            record("a", "2024-01-01T04:00:00Z", "from remote"),
            record("b", "2024-01-02T04:00:00Z", "remote only"),
        ];

        let merged = merge_tiers(cache, durable, Some(remote));
        assert_eq!(merged.len(), 2);
        let a = merged.iter().find(|r| r.id == "a").unwrap();
        assert_eq!(a.laporan, "from cache");
    }

    #[test]
    fn test_durable_beats_remote() {
        let durable = vec![record("a", "2024-01-01T04:00:00Z", "from log")];
        let remote = vec![record("a", "2024-01-01T04:00:00Z", "from remote")];
        let merged = merge_tiers(Vec::new(), durable, Some(remote));
        assert_eq!(merged[0].laporan, "from log");
    }

    #[test]
    fn test_missing_remote_same_as_empty_remote() {
        let cache = vec![record("a", "2024-01-01T04:00:00Z", "local")];
        let without = merge_tiers(cache.clone(), Vec::new(), None);
        let with_empty = merge_tiers(cache, Vec::new(), Some(Vec::new()));
        assert_eq!(without, with_empty);
        assert_eq!(without.len(), 1);
    }

    #[test]
    fn test_records_without_id_are_dropped() {
        let remote = vec![
            record("", "2024-01-05T04:00:00Z", "anonymous"),
            record("a", "2024-01-01T04:00:00Z", "named"),
        ];
        let merged = merge_tiers(Vec::new(), Vec::new(), Some(remote));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "a");
    }

    #[test]
    fn test_sorted_newest_first_with_epoch_fallback() {
        let cache = vec![record("old", "2023-06-01T04:00:00Z", "")];
        let durable = vec![record("broken", "tanggal tidak jelas", "")];
        let remote = vec![record("new", "2024-06-01T16:00:00Z", "")];

        let merged = merge_tiers(cache, durable, Some(remote));
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "broken"]);
    }

    #[test]
    fn test_equal_timestamps_keep_tier_order() {
        let cache = vec![record("c", "2024-01-01T04:00:00Z", "")];
        let durable = vec![record("d", "2024-01-01T04:00:00Z", "")];
        let remote = vec![record("r", "2024-01-01T04:00:00Z", "")];

        let merged = merge_tiers(cache, durable, Some(remote));
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "r"]);
    }
}
