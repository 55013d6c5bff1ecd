//! The eight named recovery patterns and the universal recovery sequence
//! that converges any of them in a single idempotent pass: stop daemons →
//! prune stale worktree references → delete cache and cache side-files →
//! run import-only.

use std::fs;
use std::path::Path;

use crate::daemon::registry::Registry;
use crate::error::BeadsError;
use crate::log::import::{self, ImportMode};
use crate::store::{ApplyReport, CacheEngine};

/// One of the eight catalogued corruption/race conditions this engine
/// recognizes by name. Every [`BeadsError::CorruptionDetected`] names one
/// of these so an operator (or `doctor`) can look up the right response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryPattern {
    CacheMissing,
    CacheSchemaDrift,
    CacheLockedByDeadProcess,
    ConflictMarkersInLog,
    DuplicateIdsDivergentHashes,
    FalsePositiveCycle,
    DaemonRaceOnMultiClone,
    WorktreeStubDir,
}

impl RecoveryPattern {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CacheMissing => "cache-missing",
            Self::CacheSchemaDrift => "cache-schema-drift",
            Self::CacheLockedByDeadProcess => "cache-locked-by-dead-process",
            Self::ConflictMarkersInLog => "conflict-markers-in-log",
            Self::DuplicateIdsDivergentHashes => "duplicate-ids-divergent-hashes",
            Self::FalsePositiveCycle => "false-positive-cycle",
            Self::DaemonRaceOnMultiClone => "daemon-race-on-multi-clone",
            Self::WorktreeStubDir => "worktree-stub-dir",
        }
    }

    /// Whether this pattern's response requires an explicit `--fix` opt-in
    /// (true for everything except read-only detection).
    #[must_use]
    pub const fn requires_explicit_fix(self) -> bool {
        !matches!(self, Self::FalsePositiveCycle)
    }
}

/// Run the universal recovery sequence against `log_dir`: stop any daemon
/// serving it, prune stale worktree refs it held, delete the cache and its
/// side-files, then replay the log in import-only mode. Idempotent — safe
/// to run again if interrupted partway through.
///
/// # Errors
/// Propagates registry, I/O, and import errors.
pub fn universal_recovery_sequence(
    log_dir: &Path,
    cache_path: &Path,
    log_path: &Path,
    cursor_path: &Path,
    registry: &Registry,
    fresh_engine: &mut dyn CacheEngine,
) -> Result<ApplyReport, BeadsError> {
    stop_daemon(log_dir, registry)?;
    prune_stale_worktree_refs(log_dir)?;
    delete_cache_and_sidefiles(cache_path)?;
    import::import(fresh_engine, log_path, cursor_path, ImportMode::ImportOnly, true)
}

fn stop_daemon(log_dir: &Path, registry: &Registry) -> Result<(), BeadsError> {
    if let Some(registration) = registry.lookup(log_dir)? {
        #[cfg(unix)]
        {
            let _ = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(registration.pid as i32),
                nix::sys::signal::Signal::SIGTERM,
            );
        }
        registry.unregister(log_dir)?;
    }
    Ok(())
}

/// Remove daemon socket/lock leftovers from a worktree-local `.beads`
/// stub directory that no longer has a live daemon — the worktree stub
/// dir pattern.
pub(crate) fn prune_stale_worktree_refs(log_dir: &Path) -> Result<(), BeadsError> {
    for name in ["daemon.sock", "daemon.lock"] {
        let path = log_dir.join(name);
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }
    Ok(())
}

fn delete_cache_and_sidefiles(cache_path: &Path) -> Result<(), BeadsError> {
    if cache_path.exists() {
        fs::remove_file(cache_path)?;
    }
    for suffix in ["-wal", "-shm"] {
        let mut name = cache_path.as_os_str().to_owned();
        name.push(suffix);
        let path = Path::new(&name);
        if path.exists() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}
