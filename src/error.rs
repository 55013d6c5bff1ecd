//! The unified error type for the beads engine.
//!
//! Error messages are agent-friendly: every variant states what happened
//! and the next command to run. No corruption-class error is ever
//! swallowed — see [`BeadsError::CorruptionDetected`].

use std::fmt;
use std::path::PathBuf;

use crate::model::types::ValidationError;

/// The taxonomy of error kinds from the propagation policy. `Usage` and
/// `UnsafeLocation` are fatal and non-retriable; `Locked` and
/// `TransportError` are retried by the caller before surfacing; the rest
/// are always surfaced.
#[derive(Debug)]
pub enum BeadsError {
    /// Bad CLI arguments or malformed caller input.
    Usage { detail: String },

    /// An entity, log directory, or cache file is missing.
    NotFound { what: String, log_dir: PathBuf },

    /// A lock could not be acquired before its deadline.
    Locked { resource: String, log_dir: PathBuf },

    /// One of the named recovery patterns in the merge & recovery engine
    /// was observed. Never silently repaired — the specific pattern name
    /// is always included.
    CorruptionDetected {
        pattern: &'static str,
        log_dir: PathBuf,
        detail: String,
    },

    /// The cache schema doesn't match what this binary expects.
    SchemaDrift { log_dir: PathBuf, found: String },

    /// A socket or git subprocess call failed after exhausting retries.
    TransportError { detail: String, attempts: u32 },

    /// The resolved directory sits under a forbidden system path or
    /// another user's home. Fatal, non-retriable.
    UnsafeLocation { path: PathBuf, reason: String },

    /// `AddEdge` would close a `blocks`/`parent-child` cycle.
    CycleWouldForm { from: String, to: String },

    /// An I/O error not already covered by a more specific variant.
    Io(std::io::Error),
}

impl BeadsError {
    /// The process exit code this error maps to, per the external
    /// interface's exit-code table.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. } => 2,
            Self::CorruptionDetected { .. } | Self::SchemaDrift { .. } => 3,
            Self::Locked { .. } => 4,
            Self::UnsafeLocation { .. } => 5,
            Self::NotFound { .. }
            | Self::TransportError { .. }
            | Self::CycleWouldForm { .. }
            | Self::Io(_) => 1,
        }
    }
}

impl fmt::Display for BeadsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage { detail } => write!(f, "usage error: {detail}"),
            Self::NotFound { what, log_dir } => write!(
                f,
                "{what} not found in {}.\n  To fix: run `bd doctor` to diagnose, or `bd sync --import-only` to rebuild.",
                log_dir.display()
            ),
            Self::Locked { resource, log_dir } => write!(
                f,
                "{resource} is locked in {}.\n  To fix: wait for the other process to finish, or check for a stale lock with `bd doctor`.",
                log_dir.display()
            ),
            Self::CorruptionDetected {
                pattern,
                log_dir,
                detail,
            } => write!(
                f,
                "corruption detected ({pattern}) in {}: {detail}\n  To fix: run `bd doctor` for diagnosis and `bd doctor --fix` to repair, or `bd sync --import-only` to rebuild the cache.",
                log_dir.display()
            ),
            Self::SchemaDrift { log_dir, found } => write!(
                f,
                "cache schema drift in {} (found: {found}).\n  To fix: run `bd sync --import-only` to rebuild the cache from the log.",
                log_dir.display()
            ),
            Self::TransportError { detail, attempts } => write!(
                f,
                "transport error after {attempts} attempt(s): {detail}"
            ),
            Self::UnsafeLocation { path, reason } => write!(
                f,
                "refusing to operate on unsafe location {}: {reason}",
                path.display()
            ),
            Self::CycleWouldForm { from, to } => write!(
                f,
                "adding an edge {from} -> {to} would close a cycle.\n  To fix: choose a different relation type, such as 'relates'."
            ),
            Self::Io(err) => write!(f, "I/O error: {err}\n  To fix: check file permissions and disk space."),
        }
    }
}

impl std::error::Error for BeadsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BeadsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ValidationError> for BeadsError {
    fn from(err: ValidationError) -> Self {
        Self::Usage {
            detail: err.to_string(),
        }
    }
}
