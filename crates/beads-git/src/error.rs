//! Error type returned by every `beads-git` operation.

use std::path::PathBuf;

/// Everything that can go wrong resolving or invoking git on behalf of the
/// resolver (R) and merge engine (M) components.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error(
        "no git repository found starting from {path}: {source}. \
         To fix: run this command from inside a git working tree or pass \
         an explicit --repo path."
    )]
    Discovery {
        path: PathBuf,
        #[source]
        source: gix::discover::Error,
    },

    #[error(
        "{path} resolved to a bare repository with no work tree. \
         To fix: run from a checked-out worktree, not the bare repository directory."
    )]
    BareRepository { path: PathBuf },

    #[error("failed to enumerate worktrees for {git_dir}: {reason}")]
    WorktreeEnumeration { git_dir: PathBuf, reason: String },

    #[error(
        "git {args:?} exited with status {status}: {stderr}. \
         To fix: inspect the command above and the repository state by hand."
    )]
    Invocation {
        args: Vec<String>,
        status: i32,
        stderr: String,
    },

    #[error("failed to spawn git process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git produced non-UTF-8 output: {0}")]
    NonUtf8(#[source] std::string::FromUtf8Error),
}
