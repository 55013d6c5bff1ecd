//! Error type for the leaf domain algorithms.

use std::fmt;

/// Everything that can go wrong inside `beads-core`'s pure logic.
///
/// None of these are I/O errors — this crate never touches the filesystem
/// or the network. They surface malformed input the caller handed in.
#[derive(Debug)]
pub enum Error {
    /// A value could not be serialized to canonical JSON (not itself an
    /// object or array of objects, or contains non-finite floats).
    NotCanonicalizable { detail: String },

    /// `merge_lines` was given a base/left/right triple where a line body
    /// contained a conflict marker sequence already, which would make the
    /// merge's own markers ambiguous.
    AmbiguousMarker { line: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCanonicalizable { detail } => {
                write!(f, "value cannot be canonicalized: {detail}")
            }
            Self::AmbiguousMarker { line } => {
                write!(
                    f,
                    "input line already contains a conflict marker sequence: {line:?}"
                )
            }
        }
    }
}

impl std::error::Error for Error {}
