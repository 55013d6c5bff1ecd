//! Leaf domain algorithms for beads.
//!
//! Pure logic with no filesystem or process I/O, shared by the resolver,
//! cache store, and merge & recovery engine:
//!
//! - [`canonical`] — canonical JSON serialization and content hashing.
//! - [`cycle`] — cycle detection over the `blocks`/`parent-child` edge graphs.
//! - [`merge_line`] — line-level three-way merge of append-only log files.
//! - [`error`] — the [`Error`] type shared by the above.

pub mod canonical;
pub mod cycle;
pub mod error;
pub mod merge_line;

pub use canonical::{canonical_json, content_hash, ContentHash};
pub use cycle::{would_create_cycle, EdgeKind};
pub use error::Error;
pub use merge_line::{merge_lines, MergeOutcome};
