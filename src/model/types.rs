//! Core data-model types: validated identifiers, issues, relations, log
//! records, and the resolver's output type.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Which validated type rejected a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IssueId,
    ContentHashHex,
    Actor,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IssueId => write!(f, "issue id"),
            Self::ContentHashHex => write!(f, "content hash"),
            Self::Actor => write!(f, "actor"),
        }
    }
}

/// A validated-type rejection, carrying enough detail for an agent-facing
/// error message without the caller needing to re-derive it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?} ({})", self.kind, self.value, self.reason)
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// IssueId
// ---------------------------------------------------------------------------

/// A validated issue identifier, `<prefix>-<suffix>` (e.g. `bd-142`,
/// `p-1`). Prefix and suffix are each non-empty, lowercase ASCII
/// alphanumeric (suffix may also contain `.` for compacted sub-ids).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssueId(String);

impl IssueId {
    /// # Errors
    /// Returns an error if `s` is not `<prefix>-<suffix>` with both parts
    /// non-empty lowercase ASCII alphanumeric (suffix may include `.`).
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The portion before the first `-`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        let Some((prefix, suffix)) = s.split_once('-') else {
            return Err(ValidationError {
                kind: ErrorKind::IssueId,
                value: s.to_owned(),
                reason: "must contain a '-' separating prefix and suffix".to_owned(),
            });
        };
        let valid_prefix =
            !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        let valid_suffix = !suffix.is_empty()
            && suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.');
        if !valid_prefix || !valid_suffix {
            return Err(ValidationError {
                kind: ErrorKind::IssueId,
                value: s.to_owned(),
                reason: "prefix and suffix must be lowercase alphanumeric (suffix may contain '.')"
                    .to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IssueId {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for IssueId {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<IssueId> for String {
    fn from(id: IssueId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The identifier of whoever performed a mutation: a human username, an
/// agent id, or the sentinel `"system"` used by recovery-driven writes
/// (e.g. the `doctor --fix` remediation actor `beads-doctor`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn system() -> Self {
        Self("system".to_owned())
    }

    #[must_use]
    pub fn doctor() -> Self {
        Self("beads-doctor".to_owned())
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// IssueStatus / RelationType
// ---------------------------------------------------------------------------

/// Lifecycle state of an [`Issue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Blocked,
    Closed,
    Archived,
    /// A deletion marker. Never physically removed from the log.
    Tombstone,
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Closed => "closed",
            Self::Archived => "archived",
            Self::Tombstone => "tombstone",
        };
        f.write_str(s)
    }
}

/// The closed set of directed relation types between two issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationType {
    Blocks,
    ParentChild,
    Relates,
    DiscoveredFrom,
    ProvidesSkill,
    RequiresSkill,
}

impl RelationType {
    /// Only `blocks` and `parent-child` graphs are required to stay
    /// acyclic; see [`beads_core::cycle`].
    #[must_use]
    pub const fn participates_in_cycle_check(self) -> bool {
        matches!(self, Self::Blocks | Self::ParentChild)
    }

    #[must_use]
    pub const fn as_edge_kind(self) -> Option<beads_core::EdgeKind> {
        match self {
            Self::Blocks => Some(beads_core::EdgeKind::Blocks),
            Self::ParentChild => Some(beads_core::EdgeKind::ParentChild),
            _ => None,
        }
    }

    /// Self-edges are forbidden except for relation types that are
    /// explicitly self-referencing (none in the current closed set).
    #[must_use]
    pub const fn allows_self_edge(self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Issue / Relation
// ---------------------------------------------------------------------------

/// The domain object the whole engine exists to synchronize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub design: String,
    pub status: IssueStatus,
    pub priority: i32,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub created_at: String,
    pub updated_at: String,
    pub content_hash: beads_core::ContentHash,
}

impl Issue {
    /// Recompute [`Issue::content_hash`] from the normalized fields that
    /// participate in content identity (excludes the hash itself).
    ///
    /// # Errors
    /// Propagates [`beads_core::Error::NotCanonicalizable`], which cannot
    /// actually occur for this shape but is kept explicit rather than
    /// unwrapped.
    pub fn recompute_hash(&mut self) -> Result<(), beads_core::Error> {
        #[derive(Serialize)]
        struct Normalized<'a> {
            id: &'a str,
            title: &'a str,
            description: &'a str,
            design: &'a str,
            status: IssueStatus,
            priority: i32,
            #[serde(rename = "type")]
            issue_type: &'a str,
        }
        let normalized = Normalized {
            id: self.id.as_str(),
            title: &self.title,
            description: &self.description,
            design: &self.design,
            status: self.status,
            priority: self.priority,
            issue_type: &self.issue_type,
        };
        self.content_hash = beads_core::content_hash(&normalized)?;
        Ok(())
    }
}

/// A typed, directional edge between two issues.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub from: IssueId,
    pub to: IssueId,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
}

// ---------------------------------------------------------------------------
// LogRecord
// ---------------------------------------------------------------------------

/// One line of the append-oriented log: a single issue version, or a
/// tombstone. Consumers must tolerate unknown fields (forward-compat), so
/// deserialization keeps an `extra` bag of whatever this implementation
/// doesn't model yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: IssueId,
    pub content_hash: beads_core::ContentHash,
    pub updated_at: String,
    pub status: IssueStatus,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// A line is rejected as a primary log input if it contains a conflict
    /// marker sequence. This check is on the raw line, not the parsed
    /// JSON, since a marker line never parses as JSON in the first place.
    #[must_use]
    pub fn line_has_conflict_marker(line: &str) -> bool {
        line.starts_with("<<<<<<<") || line.starts_with("=======") || line.starts_with(">>>>>>>")
    }
}

// ---------------------------------------------------------------------------
// RepoContext
// ---------------------------------------------------------------------------

/// A resolved triple produced once per command by the resolver (R) and
/// consumed by every other component that needs to run git.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoContext {
    pub log_dir: PathBuf,
    pub repo_root: PathBuf,
    pub worktree_root: PathBuf,
    pub is_redirected: bool,
    pub is_worktree: bool,
}

// ---------------------------------------------------------------------------
// DaemonRegistration
// ---------------------------------------------------------------------------

/// A record in the process-wide daemon registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonRegistration {
    pub log_dir: PathBuf,
    pub pid: u32,
    pub socket_path: PathBuf,
}
