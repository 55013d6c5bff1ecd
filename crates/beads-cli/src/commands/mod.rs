pub mod doctor;
pub mod init;
pub mod merge_resolve;
pub mod open_close;
pub mod sync;

use std::path::{Path, PathBuf};

use beads::model::types::RepoContext;
use beads::resolver;
use beads::store::SqliteEngine;
use beads::BeadsError;

/// Resolve the [`RepoContext`] for the current working directory, honoring
/// an explicit `--log-dir` override. Every command starts here.
pub fn resolve_context(log_dir: Option<&Path>) -> Result<RepoContext, BeadsError> {
    let cwd = std::env::current_dir()?;
    resolver::resolve(&cwd, log_dir)
}

pub fn cache_path(ctx: &RepoContext) -> PathBuf {
    ctx.log_dir.join("cache.db")
}

pub fn log_path(ctx: &RepoContext) -> PathBuf {
    ctx.log_dir.join("issues.jsonl")
}

pub fn cursor_path(ctx: &RepoContext) -> PathBuf {
    ctx.log_dir.join("sync-cursor")
}

pub fn current_actor() -> beads::model::types::Actor {
    let name = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_owned());
    beads::model::types::Actor::new(name)
}

pub type Engine = SqliteEngine;
