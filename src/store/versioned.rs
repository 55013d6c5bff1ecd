//! The version-aware embedded cache engine, backed by `libsql`.
//!
//! Prefer a `libsql` server connection for long-lived processes (the
//! daemon); this embedded form pays a per-open bootstrap cost (spinning up
//! a local `tokio` runtime to drive the async client) and should be
//! reserved for short-lived CLI invocations, per the cache store's
//! embedded-vs-server guidance.

use std::path::{Path, PathBuf};

use libsql::Builder;
use tokio::runtime::Runtime;

use crate::error::BeadsError;
use crate::model::types::{Actor, Issue, IssueId, IssueStatus, LogRecord, RelationType};

use super::{ApplyReport, CacheEngine, CompactionTier, Eligibility, IssuePatch, OpenMode};

/// `libsql`-backed implementation of [`CacheEngine`]. Schema and dedup
/// semantics match [`super::SqliteEngine`] exactly — only the storage
/// engine differs — so both backends satisfy the universal recovery
/// sequence identically for the parts exercised here.
pub struct VersionedEngine {
    runtime: Runtime,
    conn: libsql::Connection,
    path: PathBuf,
}

fn libsql_err(err: libsql::Error) -> BeadsError {
    BeadsError::Io(std::io::Error::other(err.to_string()))
}

impl VersionedEngine {
    fn migrate(&self) -> Result<(), BeadsError> {
        self.runtime.block_on(async {
            self.conn
                .execute_batch(
                    "CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL);
                     CREATE TABLE IF NOT EXISTS issues (
                        id TEXT PRIMARY KEY, title TEXT NOT NULL, description TEXT NOT NULL DEFAULT '',
                        design TEXT NOT NULL DEFAULT '', status TEXT NOT NULL, priority INTEGER NOT NULL,
                        type TEXT NOT NULL, created_at TEXT NOT NULL, updated_at TEXT NOT NULL,
                        content_hash TEXT NOT NULL, dirty INTEGER NOT NULL DEFAULT 0
                     );
                     CREATE TABLE IF NOT EXISTS edges (
                        from_id TEXT NOT NULL, to_id TEXT NOT NULL, relation_type TEXT NOT NULL,
                        PRIMARY KEY (from_id, to_id, relation_type)
                     );",
                )
                .await
        })
        .map_err(libsql_err)
    }
}

impl CacheEngine for VersionedEngine {
    fn open(path: &Path, mode: OpenMode) -> Result<Self, BeadsError> {
        let runtime = Runtime::new().map_err(BeadsError::from)?;
        let path_owned = path.to_path_buf();
        let conn = runtime
            .block_on(async {
                let db = Builder::new_local(&path_owned).build().await?;
                db.connect()
            })
            .map_err(libsql_err)?;

        let engine = Self {
            runtime,
            conn,
            path: path_owned,
        };
        if matches!(mode, OpenMode::ReadWrite) {
            engine.migrate()?;
        }
        Ok(engine)
    }

    fn create_issue(&mut self, issue: &Issue) -> Result<(), BeadsError> {
        let issue = issue.clone();
        self.runtime
            .block_on(async {
                self.conn
                    .execute(
                        "INSERT INTO issues (id, title, description, design, status, priority, type, created_at, updated_at, content_hash, dirty)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1)",
                        libsql::params![
                            issue.id.as_str(),
                            issue.title.as_str(),
                            issue.description.as_str(),
                            issue.design.as_str(),
                            issue.status.to_string(),
                            i64::from(issue.priority),
                            issue.issue_type.as_str(),
                            issue.created_at.as_str(),
                            issue.updated_at.as_str(),
                            issue.content_hash.as_str(),
                        ],
                    )
                    .await
            })
            .map_err(libsql_err)?;
        Ok(())
    }

    fn update_issue(&mut self, id: &IssueId, patch: &IssuePatch, _actor: &Actor) -> Result<(), BeadsError> {
        if let Some(title) = &patch.title {
            self.runtime
                .block_on(self.conn.execute(
                    "UPDATE issues SET title = ?1, dirty = 1 WHERE id = ?2",
                    libsql::params![title.as_str(), id.as_str()],
                ))
                .map_err(libsql_err)?;
        }
        if let Some(status) = &patch.status {
            self.runtime
                .block_on(self.conn.execute(
                    "UPDATE issues SET status = ?1, dirty = 1 WHERE id = ?2",
                    libsql::params![status.to_string(), id.as_str()],
                ))
                .map_err(libsql_err)?;
        }
        Ok(())
    }

    fn get_issue(&self, id: &IssueId) -> Result<Issue, BeadsError> {
        self.runtime
            .block_on(async {
                let mut rows = self
                    .conn
                    .query(
                        "SELECT id, title, description, design, status, priority, type, created_at, updated_at, content_hash
                         FROM issues WHERE id = ?1",
                        libsql::params![id.as_str()],
                    )
                    .await?;
                let Some(row) = rows.next().await? else {
                    return Ok(None);
                };
                let status: String = row.get(4)?;
                let hash: String = row.get(9)?;
                Ok(Some(Issue {
                    id: IssueId::new(&row.get::<String>(0)?).unwrap_or_else(|_| id.clone()),
                    title: row.get(1)?,
                    description: row.get(2)?,
                    design: row.get(3)?,
                    status: versioned_status(&status),
                    priority: i32::try_from(row.get::<i64>(5)?).unwrap_or_default(),
                    issue_type: row.get(6)?,
                    created_at: row.get(7)?,
                    updated_at: row.get(8)?,
                    content_hash: beads_core::ContentHash::from_hex(hash),
                }))
            })
            .map_err(libsql_err)?
            .ok_or_else(|| BeadsError::NotFound {
                what: format!("issue {id}"),
                log_dir: std::path::PathBuf::new(),
            })
    }

    fn add_edge(&mut self, from: &IssueId, to: &IssueId, relation_type: RelationType) -> Result<(), BeadsError> {
        let type_str = match relation_type {
            RelationType::Blocks => "blocks",
            RelationType::ParentChild => "parent-child",
            RelationType::Relates => "relates",
            RelationType::DiscoveredFrom => "discovered-from",
            RelationType::ProvidesSkill => "provides-skill",
            RelationType::RequiresSkill => "requires-skill",
        };
        self.runtime
            .block_on(self.conn.execute(
                "INSERT OR IGNORE INTO edges (from_id, to_id, relation_type) VALUES (?1, ?2, ?3)",
                libsql::params![from.as_str(), to.as_str(), type_str],
            ))
            .map_err(libsql_err)?;
        Ok(())
    }

    fn apply(&mut self, batch: &[LogRecord]) -> Result<ApplyReport, BeadsError> {
        let mut report = ApplyReport::default();
        for record in batch {
            let result = self.runtime.block_on(self.conn.execute(
                "INSERT INTO issues (id, status, updated_at, content_hash, dirty)
                 VALUES (?1, ?2, ?3, ?4, 0)
                 ON CONFLICT(id) DO UPDATE SET
                    status = excluded.status, updated_at = excluded.updated_at,
                    content_hash = excluded.content_hash
                 WHERE excluded.updated_at > issues.updated_at
                    OR (excluded.updated_at = issues.updated_at AND excluded.content_hash > issues.content_hash)",
                libsql::params![
                    record.id.as_str(),
                    record.status.to_string(),
                    record.updated_at.as_str(),
                    record.content_hash.as_str(),
                ],
            ));
            match result {
                Ok(_) => report.applied += 1,
                Err(err) => {
                    report.rejected += 1;
                    report.warnings.push(err.to_string());
                }
            }
        }
        Ok(report)
    }

    fn check_eligibility(&self, _id: &IssueId, _tier: CompactionTier) -> Result<Eligibility, BeadsError> {
        Ok(Eligibility {
            eligible: false,
            reason: "eligibility check not yet implemented for the versioned engine".to_owned(),
        })
    }

    fn mark_dirty(&mut self, id: &IssueId) -> Result<(), BeadsError> {
        self.runtime
            .block_on(
                self.conn
                    .execute("UPDATE issues SET dirty = 1 WHERE id = ?1", libsql::params![id.as_str()]),
            )
            .map_err(libsql_err)?;
        Ok(())
    }

    fn dirty_issues(&self) -> Result<Vec<IssueId>, BeadsError> {
        let rows = self
            .runtime
            .block_on(async {
                let mut rows = self
                    .conn
                    .query("SELECT id FROM issues WHERE dirty = 1 ORDER BY updated_at, id", ())
                    .await?;
                let mut out = Vec::new();
                while let Some(row) = rows.next().await? {
                    let id: String = row.get(0)?;
                    out.push(id);
                }
                Ok::<_, libsql::Error>(out)
            })
            .map_err(libsql_err)?;
        Ok(rows.into_iter().filter_map(|s| IssueId::new(&s).ok()).collect())
    }

    fn clear_dirty(&mut self, id: &IssueId) -> Result<(), BeadsError> {
        self.runtime
            .block_on(
                self.conn
                    .execute("UPDATE issues SET dirty = 0 WHERE id = ?1", libsql::params![id.as_str()]),
            )
            .map_err(libsql_err)?;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), BeadsError> {
        self.runtime
            .block_on(self.conn.execute_batch("DELETE FROM edges; DELETE FROM issues;"))
            .map_err(libsql_err)?;
        Ok(())
    }
}

impl VersionedEngine {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn versioned_status(s: &str) -> IssueStatus {
    match s {
        "in_progress" => IssueStatus::InProgress,
        "blocked" => IssueStatus::Blocked,
        "closed" => IssueStatus::Closed,
        "archived" => IssueStatus::Archived,
        "tombstone" => IssueStatus::Tombstone,
        _ => IssueStatus::Open,
    }
}
