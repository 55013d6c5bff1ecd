//! Repo Resolver (R): turn a workspace path plus environment into a
//! [`RepoContext`], following the lookup chain, the project-files test,
//! the one-hop redirect rule, and the unsafe-location guard.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use beads_git::{GitRepo, GixRepo};

use crate::error::BeadsError;
use crate::model::layout::{CACHE_FILE, CONFIG_FILE, LOG_DIR_NAME, METADATA_FILE, REDIRECT_FILE};
use crate::model::types::RepoContext;

/// `LOG_DIR` environment variable: explicit log directory override, the
/// highest-priority entry in the lookup chain after configuration.
pub const LOG_DIR_ENV: &str = "LOG_DIR";

/// Prefixes that must never be selected as a log directory, even if they
/// happen to contain project files (e.g. a maliciously crafted system
/// package).
const FORBIDDEN_PREFIXES: &[&str] = &["/etc", "/usr", "/bin", "/sbin"];

/// Resolve a [`RepoContext`] starting from `start`, optionally honoring an
/// explicit `configured_path` (highest priority in the lookup chain).
///
/// # Errors
/// Returns [`BeadsError::NotFound`] if no directory in the chain passes the
/// project-files test, and [`BeadsError::UnsafeLocation`] if the only
/// candidate sits under a forbidden path or another user's home.
pub fn resolve(start: &Path, configured_path: Option<&Path>) -> Result<RepoContext, BeadsError> {
    if let Some(path) = configured_path {
        return build_context(start, path);
    }

    if let Some(env_path) = env::var_os(LOG_DIR_ENV) {
        let path = PathBuf::from(env_path);
        check_safe(&path)?;
        return build_context(start, &path);
    }

    let mut dir = Some(start.to_path_buf());
    while let Some(candidate) = dir {
        let log_dir = candidate.join(LOG_DIR_NAME);
        if log_dir.is_dir() && passes_project_files_test(&log_dir) {
            check_safe(&log_dir)?;
            return build_context(start, &log_dir);
        }
        dir = candidate.parent().map(Path::to_path_buf);
    }

    // The ancestor walk above only reaches the main repo's `.beads` when the
    // linked worktree happens to be a filesystem descendant of it. A real
    // `git worktree add` checkout is a sibling directory instead, so fall
    // back to asking git directly for the main worktree's root (the
    // worktree stub dir pattern, spec §4.5 scenario S2).
    if let Some(main_root) = main_worktree_root(start) {
        let log_dir = main_root.join(LOG_DIR_NAME);
        if log_dir.is_dir() && passes_project_files_test(&log_dir) {
            check_safe(&log_dir)?;
            return build_context(start, &log_dir);
        }
    }

    if let Some(default_dir) = user_scoped_default_dir() {
        if default_dir.is_dir() && passes_project_files_test(&default_dir) {
            check_safe(&default_dir)?;
            return build_context(start, &default_dir);
        }
    }

    Err(BeadsError::NotFound {
        what: "log directory".to_owned(),
        log_dir: start.to_path_buf(),
    })
}

/// The lookup chain's last resort: a single user-scoped directory outside
/// any repository, for issues not tied to a particular git checkout. Only
/// selected if it already exists and passes the project-files test — this
/// fallback never creates a directory on the caller's behalf.
fn user_scoped_default_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|data_dir| data_dir.join("beads"))
}

/// A directory qualifies as a log directory iff it holds at least one of:
/// the cache file, a `*.jsonl` log file that isn't a merge/deletion
/// artefact, the metadata descriptor, or the config file. A directory
/// holding only daemon registry/lock files does not qualify.
#[must_use]
pub fn passes_project_files_test(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == CACHE_FILE || name == METADATA_FILE || name == CONFIG_FILE {
            return true;
        }
        if name.ends_with(".jsonl") && !is_artefact_jsonl(&name) {
            return true;
        }
    }
    false
}

fn is_artefact_jsonl(name: &str) -> bool {
    name == "deletions.jsonl"
        || name.ends_with(".base.jsonl")
        || name.ends_with(".left.jsonl")
        || name.ends_with(".right.jsonl")
}

/// Reject system paths and other users' home directories. OS temp
/// directories, resolved through symlinks, are permitted.
fn check_safe(path: &Path) -> Result<(), BeadsError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let tmp = env::temp_dir().canonicalize().unwrap_or_else(|_| env::temp_dir());
    if canonical.starts_with(&tmp) {
        return Ok(());
    }
    for prefix in FORBIDDEN_PREFIXES {
        if canonical.starts_with(prefix) {
            return Err(BeadsError::UnsafeLocation {
                path: canonical,
                reason: format!("under forbidden system prefix {prefix}"),
            });
        }
    }
    if let Some(home) = env::var_os("HOME") {
        let home = PathBuf::from(home);
        if let Ok(home_canonical) = home.canonicalize() {
            if canonical.starts_with("/home") || canonical.starts_with("/Users") {
                if !canonical.starts_with(&home_canonical) {
                    return Err(BeadsError::UnsafeLocation {
                        path: canonical,
                        reason: "under another user's home directory".to_owned(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Follow at most one redirect hop, build the worktree/repo-root flags, and
/// assemble a [`RepoContext`].
fn build_context(start: &Path, log_dir: &Path) -> Result<RepoContext, BeadsError> {
    let (resolved_log_dir, is_redirected) = follow_redirect(log_dir)?;
    check_safe(&resolved_log_dir)?;

    let (repo_root, worktree_root, is_worktree) = resolve_repo_roots(start, &resolved_log_dir);

    Ok(RepoContext {
        log_dir: dedup_symlinks(&resolved_log_dir),
        repo_root,
        worktree_root,
        is_redirected,
        is_worktree,
    })
}

/// Read `redirect` if present; follow exactly one hop. If the target itself
/// contains a redirect, stop there and warn rather than following further.
fn follow_redirect(log_dir: &Path) -> Result<(PathBuf, bool), BeadsError> {
    let redirect_path = log_dir.join(REDIRECT_FILE);
    let Ok(content) = fs::read_to_string(&redirect_path) else {
        return Ok((log_dir.to_path_buf(), false));
    };

    let Some(target_line) = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
    else {
        return Ok((log_dir.to_path_buf(), false));
    };

    let target = PathBuf::from(target_line);
    let target = if target.is_absolute() {
        target
    } else {
        log_dir
            .parent()
            .map_or_else(|| log_dir.to_path_buf(), Path::to_path_buf)
            .join(target)
    };

    if !target.is_dir() || !passes_project_files_test(&target) {
        return Err(BeadsError::NotFound {
            what: "redirect target".to_owned(),
            log_dir: target,
        });
    }

    if target.join(REDIRECT_FILE).exists() {
        tracing::warn!(
            target = %target.display(),
            "redirect target itself contains a redirect; stopping after one hop"
        );
    }

    Ok((target, true))
}

/// If `start` sits in a linked git worktree, the main worktree's work
/// directory — found by asking git for every worktree and picking the one
/// whose `git_dir` equals the repo's `common_dir`, since that's exactly the
/// main worktree regardless of where the linked one lives on disk. Returns
/// `None` if `start` isn't in a git repo at all, or is already the main
/// worktree.
fn main_worktree_root(start: &Path) -> Option<PathBuf> {
    let repo = GixRepo::discover(start).ok()?;
    let location = repo.location();
    if location.git_dir == location.common_dir {
        return None;
    }
    let worktrees = repo.worktrees().ok()?;
    worktrees
        .into_iter()
        .find(|wt| wt.git_dir == location.common_dir)
        .map(|wt| wt.work_dir)
}

/// Worktree-aware repo root resolution: for a command run from a linked
/// worktree, `repo_root` is always the main repository's root, while
/// `worktree_root` is the directory the command actually ran from.
fn resolve_repo_roots(start: &Path, log_dir: &Path) -> (PathBuf, PathBuf, bool) {
    let default_root = log_dir
        .parent()
        .map_or_else(|| start.to_path_buf(), Path::to_path_buf);

    let Ok(repo) = GixRepo::discover(start) else {
        return (default_root.clone(), default_root, false);
    };

    let location = repo.location();
    let worktree_root = location.work_dir.clone();
    let is_worktree = location.git_dir != location.common_dir;

    let repo_root = if is_worktree {
        location
            .common_dir
            .parent()
            .map_or_else(|| worktree_root.clone(), Path::to_path_buf)
    } else {
        worktree_root.clone()
    };

    (repo_root, worktree_root, is_worktree)
}

/// Canonicalize `path` so that two symlink-aliased candidates collapse to
/// the same inode-identified directory, preventing duplicate daemon
/// registrations under symlinked worktrees.
fn dedup_symlinks(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Discover every log directory under `root`, deduplicated by canonical
/// path. Used by diagnostics that need to enumerate all candidates rather
/// than resolve a single one.
#[must_use]
pub fn discover_all(root: &Path) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if path.file_name().and_then(|n| n.to_str()) == Some(LOG_DIR_NAME) {
                if passes_project_files_test(&path) {
                    let canonical = dedup_symlinks(&path);
                    if seen.insert(canonical.clone()) {
                        out.push(canonical);
                    }
                }
            } else {
                stack.push(path);
            }
        }
    }
    out
}
