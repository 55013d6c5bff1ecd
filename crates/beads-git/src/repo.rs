//! Repository and worktree discovery.
//!
//! `beads` never stores issue data as git objects or refs — git is transport
//! and history, not the source of truth (that's the log, see the root
//! crate's `log` module). This trait is deliberately narrow: find the
//! repository a path belongs to, and enumerate its worktrees so the resolver
//! (R) can apply the "same repo, any worktree" rule from the lookup chain.

use std::path::{Path, PathBuf};

use crate::error::GitError;

/// Where a discovered repository's git metadata and work tree live.
///
/// `git_dir` is the worktree-specific `.git` entry (for a linked worktree
/// this is the `worktrees/<name>` directory, not the common one).
/// `common_dir` is the shared directory every worktree's refs and objects
/// ultimately resolve through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    pub git_dir: PathBuf,
    pub common_dir: PathBuf,
    pub work_dir: PathBuf,
}

/// One entry from `git worktree list`, used by the resolver to recognize
/// that two paths belong to the same logical repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    pub work_dir: PathBuf,
    pub git_dir: PathBuf,
    pub head: Option<String>,
    pub is_bare: bool,
}

/// The single interface through which `beads` touches git. No other crate
/// should import `gix` directly; program against this trait instead.
pub trait GitRepo {
    /// Walk upward from `start` until a `.git` entry is found, following the
    /// same "project files first, then ancestors" rule the resolver applies
    /// to its own log-directory search.
    fn discover(start: &Path) -> Result<Self, GitError>
    where
        Self: Sized;

    /// The location this handle was opened against.
    fn location(&self) -> &RepoLocation;

    /// All worktrees known to this repository, including the one this
    /// handle was opened from.
    fn worktrees(&self) -> Result<Vec<WorktreeInfo>, GitError>;
}

/// `gix`-backed implementation of [`GitRepo`].
pub struct GixRepo {
    location: RepoLocation,
    repo: gix::Repository,
}

impl GitRepo for GixRepo {
    fn discover(start: &Path) -> Result<Self, GitError> {
        let repo = gix::discover(start).map_err(|source| GitError::Discovery {
            path: start.to_path_buf(),
            source,
        })?;

        let work_dir = repo
            .work_dir()
            .ok_or_else(|| GitError::BareRepository {
                path: start.to_path_buf(),
            })?
            .to_path_buf();

        let git_dir = repo.git_dir().to_path_buf();
        let common_dir = repo.common_dir().to_path_buf();

        Ok(Self {
            location: RepoLocation {
                git_dir,
                common_dir,
                work_dir,
            },
            repo,
        })
    }

    fn location(&self) -> &RepoLocation {
        &self.location
    }

    fn worktrees(&self) -> Result<Vec<WorktreeInfo>, GitError> {
        let proxies = self
            .repo
            .worktrees()
            .map_err(|source| GitError::WorktreeEnumeration {
                git_dir: self.location.common_dir.clone(),
                reason: source.to_string(),
            })?;

        let mut out = Vec::with_capacity(proxies.len() + 1);

        // The main worktree isn't included in `Repository::worktrees()`.
        out.push(WorktreeInfo {
            work_dir: self.location.work_dir.clone(),
            git_dir: self.location.git_dir.clone(),
            head: head_name(&self.repo),
            is_bare: false,
        });

        for proxy in proxies {
            let Some(base) = proxy.base().ok() else {
                continue;
            };
            let git_dir = proxy.git_dir().to_path_buf();
            let head = proxy
                .into_repo_with_possibly_inaccessible_worktree()
                .ok()
                .as_ref()
                .and_then(head_name);
            out.push(WorktreeInfo {
                work_dir: base,
                git_dir,
                head,
                is_bare: false,
            });
        }

        Ok(out)
    }
}

fn head_name(repo: &gix::Repository) -> Option<String> {
    repo.head_name()
        .ok()
        .flatten()
        .map(|name| name.as_bstr().to_string())
}
