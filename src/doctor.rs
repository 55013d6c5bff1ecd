//! `doctor`: read-only diagnosis of the eight named recovery patterns,
//! plus an explicit `--fix` opt-in that warns before running any
//! destructive remediation.

use std::path::Path;

use crate::daemon::registry::{self, Registry};
use crate::error::BeadsError;
use crate::merge::{quarantine, recovery, RecoveryPattern};
use crate::model::types::RepoContext;
use crate::resolver::passes_project_files_test;
use crate::store::{CacheEngine, OpenMode, SqliteEngine};

/// One finding from a `doctor` pass: the pattern observed and enough
/// detail to report it without the caller re-deriving it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub pattern: RecoveryPattern,
    pub detail: String,
}

/// The outcome of a `doctor` (or `doctor --fix`) invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DoctorReport {
    pub findings: Vec<Finding>,
    /// Recorded only when `--fix` actually mutated state, so callers can
    /// include "a remediation happened" in their diagnostics per the
    /// error-handling policy's never-swallow-silently requirement.
    pub remediations: Vec<String>,
}

/// Run read-only diagnosis against `ctx`. Never mutates anything.
///
/// # Errors
/// Propagates I/O and registry errors encountered while inspecting state.
pub fn diagnose(ctx: &RepoContext, cache_path: &Path, registry: &Registry) -> Result<DoctorReport, BeadsError> {
    let mut report = DoctorReport::default();

    if !cache_path.exists() {
        report.findings.push(Finding {
            pattern: RecoveryPattern::CacheMissing,
            detail: format!("no cache file at {}", cache_path.display()),
        });
    } else if let Err(err) = SqliteEngine::open(cache_path, OpenMode::ReadOnly) {
        if matches!(err, BeadsError::SchemaDrift { .. }) {
            report.findings.push(Finding {
                pattern: RecoveryPattern::CacheSchemaDrift,
                detail: err.to_string(),
            });
        }
    }

    let log_path = ctx.log_dir.join("issues.jsonl");
    if let Ok(text) = std::fs::read_to_string(&log_path) {
        if text.lines().any(|l| {
            l.starts_with("<<<<<<<") || l.starts_with("=======") || l.starts_with(">>>>>>>")
        }) {
            report.findings.push(Finding {
                pattern: RecoveryPattern::ConflictMarkersInLog,
                detail: format!("{} contains unresolved conflict markers", log_path.display()),
            });
        }
    }

    if quarantine::is_quarantined(&log_path) {
        report.findings.push(Finding {
            pattern: RecoveryPattern::ConflictMarkersInLog,
            detail: "a prior merge is still quarantined; run merge-resolve".to_owned(),
        });
    }

    if let Some(registration) = registry.peek(&ctx.log_dir)? {
        if !registry::is_alive(registration.pid) {
            report.findings.push(Finding {
                pattern: RecoveryPattern::CacheLockedByDeadProcess,
                detail: format!("registry still lists pid {} for this log dir, but it's no longer running", registration.pid),
            });
        } else if registration.log_dir != ctx.log_dir {
            report.findings.push(Finding {
                pattern: RecoveryPattern::DaemonRaceOnMultiClone,
                detail: "registry entry's log_dir doesn't match this context".to_owned(),
            });
        }
    }

    if ctx.is_worktree {
        let local_stub = ctx.worktree_root.join(".beads");
        if local_stub.is_dir() && local_stub != ctx.log_dir && !passes_project_files_test(&local_stub) {
            report.findings.push(Finding {
                pattern: RecoveryPattern::WorktreeStubDir,
                detail: format!("{} has no project files; this worktree should use the main repo's cache", local_stub.display()),
            });
        }
    }

    Ok(report)
}

/// Run diagnosis, then apply remediation for any finding whose pattern
/// permits an automatic fix. The caller must have already obtained
/// explicit user opt-in and displayed the "auto-fix can destroy legitimate
/// relationships" warning before calling this.
///
/// # Errors
/// Propagates recovery and I/O errors.
pub fn diagnose_and_fix(
    ctx: &RepoContext,
    cache_path: &Path,
    log_path: &Path,
    cursor_path: &Path,
    registry: &Registry,
    fresh_engine: &mut dyn CacheEngine,
) -> Result<DoctorReport, BeadsError> {
    let mut report = diagnose(ctx, cache_path, registry)?;

    for finding in report.findings.clone() {
        if !finding.pattern.requires_explicit_fix() {
            continue;
        }
        match finding.pattern {
            RecoveryPattern::CacheMissing | RecoveryPattern::CacheSchemaDrift => {
                let apply_report = recovery::universal_recovery_sequence(
                    &ctx.log_dir,
                    cache_path,
                    log_path,
                    cursor_path,
                    registry,
                    fresh_engine,
                )?;
                report.remediations.push(format!(
                    "ran universal recovery sequence: applied={} rejected={}",
                    apply_report.applied, apply_report.rejected
                ));
            }
            RecoveryPattern::CacheLockedByDeadProcess | RecoveryPattern::DaemonRaceOnMultiClone => {
                registry.unregister(&ctx.log_dir)?;
                report.remediations.push("cleared stale registry entry".to_owned());
            }
            RecoveryPattern::WorktreeStubDir => {
                recovery::prune_stale_worktree_refs(&ctx.worktree_root.join(".beads"))?;
                report.remediations.push("pruned stale worktree stub directory".to_owned());
            }
            _ => {}
        }
    }

    Ok(report)
}
