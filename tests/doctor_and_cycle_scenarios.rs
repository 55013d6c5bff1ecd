//! `doctor`'s read-only guarantee and the acyclic-invariant scope.

use beads::doctor::diagnose;
use beads::model::types::{Issue, IssueId, IssueStatus, RelationType};
use beads::store::{CacheEngine, OpenMode, SqliteEngine};
use beads_core::ContentHash;
use tempfile::tempdir;

fn sample_issue(id: &str) -> Issue {
    Issue {
        id: IssueId::new(id).unwrap(),
        title: id.to_owned(),
        description: String::new(),
        design: String::new(),
        status: IssueStatus::Open,
        priority: 1,
        issue_type: "task".to_owned(),
        created_at: "2026-01-01T00:00:00Z".to_owned(),
        updated_at: "2026-01-01T00:00:00Z".to_owned(),
        content_hash: ContentHash::from_hex("1".repeat(64)),
    }
}

/// S4 "False-positive cycle": `a` and `b` linked only by `relates` edges
/// in both directions never trip the acyclic invariant, because `relates`
/// doesn't participate in cycle checking at all.
#[test]
fn s4_relates_edges_never_form_a_cycle_violation() {
    let dir = tempdir().unwrap();
    let mut engine = SqliteEngine::open(&dir.path().join("cache.db"), OpenMode::ReadWrite).unwrap();

    let a = sample_issue("a-1");
    let b = sample_issue("b-1");
    engine.create_issue(&a).unwrap();
    engine.create_issue(&b).unwrap();

    engine.add_edge(&a.id, &b.id, RelationType::Relates).unwrap();
    engine.add_edge(&b.id, &a.id, RelationType::Relates).unwrap();
}

/// The same cycle, expressed with `blocks` edges, is rejected up front —
/// confirming the contrast that makes S4 meaningful: cycle checking is
/// real, it's just correctly scoped to `blocks`/`parent-child`.
#[test]
fn blocks_edges_do_form_a_cycle_violation() {
    let dir = tempdir().unwrap();
    let mut engine = SqliteEngine::open(&dir.path().join("cache.db"), OpenMode::ReadWrite).unwrap();

    let a = sample_issue("a-1");
    let b = sample_issue("b-1");
    engine.create_issue(&a).unwrap();
    engine.create_issue(&b).unwrap();

    engine.add_edge(&a.id, &b.id, RelationType::Blocks).unwrap();
    let err = engine.add_edge(&b.id, &a.id, RelationType::Blocks).unwrap_err();
    assert!(matches!(err, beads::BeadsError::CycleWouldForm { .. }));
}

/// Property 6: observing a named recovery pattern without `--fix`
/// produces a report but mutates nothing — not even creating the cache
/// file `diagnose` had to check for.
#[test]
fn property6_diagnose_never_mutates_on_cache_missing() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("cache.db");
    let log_dir = dir.path().to_path_buf();
    let ctx = beads::model::types::RepoContext {
        log_dir: log_dir.clone(),
        repo_root: log_dir.clone(),
        worktree_root: log_dir,
        is_redirected: false,
        is_worktree: false,
    };
    let registry = beads::daemon::Registry::new(dir.path().join("daemon-registry.json"));

    let report = diagnose(&ctx, &cache_path, &registry).unwrap();
    assert!(!report.findings.is_empty());
    assert!(!cache_path.exists(), "diagnose must never create the cache file it's reporting missing");
}
