//! Cache Store (S): a typed, transactional API over the derived
//! relational cache, dispatched through [`CacheEngine`] regardless of the
//! concrete backend. No engine-specific behavior leaks past this trait —
//! the export/import pipeline and merge engine program against it alone.

pub mod pool;
pub mod sqlite;
#[cfg(feature = "cache-versioned")]
pub mod versioned;

use crate::error::BeadsError;
use crate::model::types::{Actor, Issue, IssueId, LogRecord, RelationType};

pub use sqlite::SqliteEngine;

/// Read-only or read-write, as passed to [`CacheEngine::open`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// A partial update to an issue's mutable attributes. `None` leaves a
/// field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub design: Option<String>,
    pub status: Option<crate::model::types::IssueStatus>,
    pub priority: Option<i32>,
}

/// A compaction tier passed to [`CacheEngine::check_eligibility`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompactionTier {
    Summary,
    Archive,
}

/// The outcome of an eligibility check: whether the issue may be compacted
/// at the requested tier, and if not, why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason: String,
}

/// The per-batch outcome of [`CacheEngine::apply`], used by the import
/// pipeline's partial-failure accounting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub warnings: Vec<String>,
}

impl ApplyReport {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.rejected == 0
    }
}

/// The typed contract every cache backend implements. Dispatch is static
/// (callers hold a concrete `SqliteEngine`/`VersionedEngine`) or dynamic
/// (`Box<dyn CacheEngine>`) depending on call site; both forms see the
/// same seven operations and nothing engine-specific.
pub trait CacheEngine: Send {
    /// Open the cache at `path`. Creates the schema on first open; fails
    /// with [`BeadsError::SchemaDrift`] if an existing schema doesn't
    /// match what this engine version expects.
    fn open(path: &std::path::Path, mode: OpenMode) -> Result<Self, BeadsError>
    where
        Self: Sized;

    /// # Errors
    /// Returns an error if an issue with this id already exists.
    fn create_issue(&mut self, issue: &Issue) -> Result<(), BeadsError>;

    /// # Errors
    /// Returns [`BeadsError::NotFound`] if `id` doesn't exist.
    fn update_issue(&mut self, id: &IssueId, patch: &IssuePatch, actor: &Actor) -> Result<(), BeadsError>;

    /// Fetch an issue's current state, used by the export pipeline to
    /// serialize dirty issues back to the log.
    ///
    /// # Errors
    /// Returns [`BeadsError::NotFound`] if `id` doesn't exist.
    fn get_issue(&self, id: &IssueId) -> Result<Issue, BeadsError>;

    /// # Errors
    /// Returns [`BeadsError::CycleWouldForm`] if adding this edge would
    /// close a cycle in the `blocks`/`parent-child` sub-graph.
    fn add_edge(&mut self, from: &IssueId, to: &IssueId, relation_type: RelationType) -> Result<(), BeadsError>;

    /// Idempotent upsert of a batch of log records by (id, content hash);
    /// newer records win on timestamp ties per the dedup tie-break rule.
    ///
    /// # Errors
    /// Never fails the whole batch; per-record failures are counted in the
    /// returned [`ApplyReport`] instead.
    fn apply(&mut self, batch: &[LogRecord]) -> Result<ApplyReport, BeadsError>;

    /// # Errors
    /// Returns [`BeadsError::NotFound`] if `id` doesn't exist.
    fn check_eligibility(&self, id: &IssueId, tier: CompactionTier) -> Result<Eligibility, BeadsError>;

    /// Ensure the next export includes this record.
    ///
    /// # Errors
    /// Returns [`BeadsError::NotFound`] if `id` doesn't exist.
    fn mark_dirty(&mut self, id: &IssueId) -> Result<(), BeadsError>;

    /// All issue ids currently marked dirty, in the order export should
    /// process them (modification timestamp then id).
    ///
    /// # Errors
    /// Propagates storage errors.
    fn dirty_issues(&self) -> Result<Vec<IssueId>, BeadsError>;

    /// Clear the dirty flag for `id`, called by the export pipeline after
    /// a successful log write under the same lock that performed it.
    ///
    /// # Errors
    /// Propagates storage errors.
    fn clear_dirty(&mut self, id: &IssueId) -> Result<(), BeadsError>;

    /// Discard every issue and edge currently held, as if the cache had
    /// just been created. Used by `ImportOnly`/`ForceRebuild` so a replay
    /// starts from nothing rather than upserting over stray rows the log
    /// no longer accounts for.
    ///
    /// # Errors
    /// Propagates storage errors.
    fn reset(&mut self) -> Result<(), BeadsError>;
}
