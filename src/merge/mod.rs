//! Merge & Recovery Engine (M): line-level three-way merge over the log,
//! conflict-marker quarantine, the persisted merge state machine, and the
//! named corruption-recovery patterns.

pub mod quarantine;
pub mod recovery;
pub mod state;

use std::fs;
use std::path::Path;

use crate::error::BeadsError;
use crate::model::types::LogRecord;

pub use recovery::RecoveryPattern;
pub use state::{MergePhase, MergeState};

/// Perform the line-level three-way merge over the log's base/left/right
/// versions. Each log line is a complete, self-contained record, so
/// merging at line granularity is safe (no record is ever split across a
/// merge boundary).
///
/// # Errors
/// Propagates [`beads_core::Error::AmbiguousMarker`] if one of the inputs
/// already contains a conflict marker line (a pre-existing marker would
/// make the merge's own marker output ambiguous).
pub fn three_way_merge(base: &str, left: &str, right: &str) -> Result<beads_core::MergeOutcome, BeadsError> {
    beads_core::merge_lines(base, left, right).map_err(|e| BeadsError::Usage { detail: e.to_string() })
}

/// Run the full merge-resolve step against a log file whose working copy
/// still has conflict markers: quarantine the three versions, merge them,
/// and if the merge is clean (no remaining conflicts) write the merged
/// content back to the log and advance the merge state to `Resolved`.
///
/// If the merge itself produces conflicts, the log is left quarantined and
/// this returns the outcome without writing anything back — the caller
/// must resolve by hand and re-run.
///
/// # Errors
/// Propagates quarantine, state, and I/O errors.
pub fn merge_resolve(
    log_path: &Path,
    base: &str,
    left: &str,
    right: &str,
    now: &str,
) -> Result<beads_core::MergeOutcome, BeadsError> {
    let mut state = MergeState::load(log_path)?.unwrap_or_else(|| MergeState::start(log_path, now));

    if matches!(state.phase, MergePhase::Detected) {
        quarantine::quarantine(log_path, base, left, right, "conflict-markers-in-log", now)?;
        state.advance(MergePhase::Quarantined, now)?;
    }

    let outcome = three_way_merge(base, left, right)?;
    if outcome.has_conflicts {
        return Ok(outcome);
    }

    let mut merged = outcome.lines.join("\n");
    if !merged.is_empty() {
        merged.push('\n');
    }
    fs::write(log_path, merged)?;
    state.advance(MergePhase::Resolved, now)?;
    Ok(outcome)
}

/// After a clean `merge_resolve`, clear the quarantine sidecars and the
/// merge state once import-only has confirmed the merged log imports
/// cleanly.
///
/// # Errors
/// Propagates I/O errors.
pub fn finish_merge(log_path: &Path, now: &str) -> Result<(), BeadsError> {
    let mut state = MergeState::load(log_path)?.ok_or_else(|| BeadsError::Usage {
        detail: format!("no merge in progress for {}", log_path.display()),
    })?;
    state.advance(MergePhase::Imported, now)?;
    quarantine::clear(log_path)?;
    MergeState::clear(log_path)?;
    Ok(())
}

/// A reported, never-auto-applied warning about a cycle-check anomaly.
/// Self-loops and undirected-interpretation mistakes are surfaced, never
/// silently deleted — see [`RecoveryPattern::FalsePositiveCycle`].
#[must_use]
pub fn detect_false_positive_cycle(edges: &[(String, String, bool)]) -> Vec<String> {
    edges
        .iter()
        .filter(|(from, to, is_directional)| from == to || !is_directional)
        .map(|(from, to, _)| format!("edge {from} -> {to} looks like a false-positive cycle candidate, not auto-fixed"))
        .collect()
}

/// Apply the duplicate-id tie-break rule described in the export/import
/// contract to a pair of candidate records for the same id, used by
/// `doctor`'s reporting pass (the cache store applies the same rule
/// internally during `Apply`).
#[must_use]
pub fn tie_break<'a>(a: &'a LogRecord, b: &'a LogRecord) -> &'a LogRecord {
    if a.updated_at != b.updated_at {
        if a.updated_at > b.updated_at {
            a
        } else {
            b
        }
    } else if a.content_hash > b.content_hash {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::IssueId;
    use beads_core::ContentHash;
    use tempfile::tempdir;

    fn record(id: &str, hash: &str, updated_at: &str) -> LogRecord {
        LogRecord {
            id: IssueId::new(id).unwrap(),
            content_hash: ContentHash::from_hex(hash.to_owned()),
            updated_at: updated_at.to_owned(),
            status: crate::model::types::IssueStatus::Open,
            fields: serde_json::Map::new(),
        }
    }

    #[test]
    fn merge_resolve_writes_merged_log_when_clean() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("issues.jsonl");
        fs::write(&log_path, "a\nb\nc\n").unwrap();

        let outcome = merge_resolve(&log_path, "a\nb\nc\n", "a\nx\nc\n", "a\nb\nc\n", "2026-01-01T00:00:00Z").unwrap();
        assert!(!outcome.has_conflicts);
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "a\nx\nc\n");

        let state = MergeState::load(&log_path).unwrap().unwrap();
        assert_eq!(state.phase, MergePhase::Resolved);
    }

    #[test]
    fn merge_resolve_leaves_quarantine_on_real_conflict() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("issues.jsonl");
        fs::write(&log_path, "a\nb\nc\n").unwrap();

        let outcome = merge_resolve(&log_path, "a\nb\nc\n", "a\nx\nc\n", "a\ny\nc\n", "2026-01-01T00:00:00Z").unwrap();
        assert!(outcome.has_conflicts);
        assert!(quarantine::is_quarantined(&log_path));
    }

    #[test]
    fn tie_break_prefers_later_timestamp() {
        let older = record("x-1", &"1".repeat(64), "2026-01-01T00:00:00Z");
        let newer = record("x-1", &"1".repeat(64), "2026-01-02T00:00:00Z");
        assert_eq!(tie_break(&older, &newer).updated_at, newer.updated_at);
    }

    #[test]
    fn tie_break_prefers_larger_hash_on_tie() {
        let h1 = record("x-1", &"1".repeat(64), "2026-01-01T00:00:00Z");
        let h2 = record("x-1", &"2".repeat(64), "2026-01-01T00:00:00Z");
        assert_eq!(tie_break(&h1, &h2).content_hash, h2.content_hash);
    }

    #[test]
    fn false_positive_cycle_flags_self_loop_not_real_cycle() {
        let edges = vec![("a".to_owned(), "a".to_owned(), true)];
        let warnings = detect_false_positive_cycle(&edges);
        assert_eq!(warnings.len(), 1);
    }
}
