use std::path::Path;

use beads::log::export;
use beads::model::types::{IssueId, IssueStatus};
use beads::store::{CacheEngine, IssuePatch, OpenMode};
use beads::BeadsError;

use super::{cache_path, current_actor, log_path, resolve_context, Engine};

/// Mark an issue `in_progress`, export the change to the log, and clear
/// its dirty flag. Thin wrapper: the concrete issue schema and its CRUD
/// surface are not this engine's concern — only that the status mutation
/// flows through the same dirty-mark/export path every writer uses.
pub fn open(log_dir: Option<&Path>, id: &str) -> Result<(), BeadsError> {
    set_status(log_dir, id, IssueStatus::InProgress)
}

/// Mark an issue `closed`.
pub fn close(log_dir: Option<&Path>, id: &str) -> Result<(), BeadsError> {
    set_status(log_dir, id, IssueStatus::Closed)
}

fn set_status(log_dir: Option<&Path>, id: &str, status: IssueStatus) -> Result<(), BeadsError> {
    let ctx = resolve_context(log_dir)?;
    let issue_id = IssueId::new(id)?;
    let actor = current_actor();

    let mut engine = Engine::open(&cache_path(&ctx), OpenMode::ReadWrite)?;
    engine.update_issue(
        &issue_id,
        &IssuePatch {
            status: Some(status),
            ..IssuePatch::default()
        },
        &actor,
    )?;

    let log_file = log_path(&ctx);
    export::export_dirty(&mut engine, &log_file)?;

    println!("{id} -> {status}");
    Ok(())
}
