//! Export/Import Pipeline (X): move dirty entities between the log and
//! the cache, detect format, deduplicate, and account for partial
//! failures.

pub mod export;
pub mod import;

use std::fs;
use std::path::Path;

use crate::error::BeadsError;

/// The log's recognized wire formats. Detected from the first non-blank
/// bytes of the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    JsonLines,
    /// A square-bracket-prefixed compact form: `[id, content_hash,
    /// updated_at, status]` per line, with domain fields omitted. Accepted
    /// for backward-compatible ingestion; export always produces
    /// `JsonLines`.
    Compact,
}

/// # Errors
/// Returns [`BeadsError::Usage`] if the input is empty or its first
/// non-blank byte doesn't match a recognized format.
pub fn detect_format(text: &str) -> Result<LogFormat, BeadsError> {
    let Some(first_line) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Err(BeadsError::Usage {
            detail: "log input is empty".to_owned(),
        });
    };
    match first_line.as_bytes().first() {
        Some(b'{') => Ok(LogFormat::JsonLines),
        Some(b'[') => Ok(LogFormat::Compact),
        _ => Err(BeadsError::Usage {
            detail: format!("unrecognized log format, first line starts with {first_line:?}"),
        }),
    }
}

/// Files that are never imported as a primary log: deletion and
/// merge-artefact basenames are repair inputs only.
#[must_use]
pub fn is_forbidden_source(basename: &str) -> bool {
    basename == "deletions.jsonl"
        || basename.ends_with(".base.jsonl")
        || basename.ends_with(".left.jsonl")
        || basename.ends_with(".right.jsonl")
}

/// The persisted position of the last successfully imported incremental
/// batch, stored as a byte offset into the primary log file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncCursor(pub u64);

impl SyncCursor {
    /// # Errors
    /// Propagates I/O errors; a missing cursor file means "start from
    /// zero", not an error.
    pub fn load(path: &Path) -> Result<Self, BeadsError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self(text.trim().parse().unwrap_or(0))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self(0)),
            Err(e) => Err(BeadsError::from(e)),
        }
    }

    /// # Errors
    /// Propagates I/O errors.
    pub fn save(&self, path: &Path) -> Result<(), BeadsError> {
        fs::write(path, self.0.to_string())?;
        Ok(())
    }
}
