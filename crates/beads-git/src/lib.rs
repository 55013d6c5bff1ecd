//! Git abstraction layer for beads.
//!
//! This crate defines [`GitRepo`] — the single interface through which the
//! resolver (R) and merge/recovery engine (M) touch git. No other beads
//! crate should import `gix` or spawn `git` directly; program against this
//! crate instead.
//!
//! # Crate layout
//!
//! - [`repo`] — repository and worktree discovery, backed by `gix`.
//! - [`invocation`] — pinned `git` subprocess invocation (`GIT_DIR`/
//!   `GIT_WORK_TREE` set explicitly, hooks and templates disabled) for the
//!   operations `gix` doesn't cover.
//! - [`error`] — the [`GitError`] enum returned by all of the above.

pub mod error;
pub mod invocation;
pub mod repo;

pub use error::GitError;
pub use invocation::PinnedCommand;
pub use repo::{GitRepo, GixRepo, RepoLocation, WorktreeInfo};
