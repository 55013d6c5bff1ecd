use std::path::Path;

use beads::log::import::{self, ImportMode};
use beads::lockfile::{LockHandle, DEFAULT_LOCK_DEADLINE};
use beads::store::{CacheEngine, OpenMode};
use beads::BeadsError;
use clap::Subcommand;

use super::{cache_path, cursor_path, log_path, resolve_context, Engine};

/// Which replay mode to run — mirrors [`ImportMode`] so the CLI's help
/// text is the only place that needs the plain-English description.
#[derive(Subcommand)]
pub enum SyncMode {
    /// Apply only the log lines appended since the last sync.
    Incremental,
    /// Discard the cache if present and replay the full log.
    ImportOnly,
    /// As `import-only`, plus a full relational invariant recheck.
    ForceRebuild,
}

pub fn run(log_dir: Option<&Path>, mode: &SyncMode) -> Result<(), BeadsError> {
    let ctx = resolve_context(log_dir)?;
    let lock_path = ctx.log_dir.join("log.lock");
    let _lock = LockHandle::acquire_blocking(&lock_path, DEFAULT_LOCK_DEADLINE)?;

    let import_mode = match mode {
        SyncMode::Incremental => ImportMode::Incremental,
        SyncMode::ImportOnly => ImportMode::ImportOnly,
        SyncMode::ForceRebuild => ImportMode::ForceRebuild,
    };

    let mut engine = Engine::open(&cache_path(&ctx), OpenMode::ReadWrite)?;
    let report = import::import(&mut engine, &log_path(&ctx), &cursor_path(&ctx), import_mode, false)?;

    println!(
        "applied={} skipped={} rejected={}",
        report.applied, report.skipped, report.rejected
    );
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    if !report.is_clean() {
        return Err(BeadsError::CorruptionDetected {
            pattern: "duplicate-ids-divergent-hashes",
            log_dir: ctx.log_dir,
            detail: format!("{} record(s) rejected during import", report.rejected),
        });
    }
    Ok(())
}
