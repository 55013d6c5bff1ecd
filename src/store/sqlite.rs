//! The embedded single-file cache engine, backed by `rusqlite` with the
//! `bundled` feature so the binary never depends on a system SQLite.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::BeadsError;
use crate::model::types::{Actor, Issue, IssueId, IssueStatus, LogRecord, RelationType};

use super::{ApplyReport, CacheEngine, CompactionTier, Eligibility, IssuePatch, OpenMode};

/// Bumped whenever the schema changes. Stored in `schema_migrations`;
/// `Open` runs any migration whose version is greater than what's on disk
/// and fails the whole open with `SchemaDrift` if a migration can't run
/// forward.
const SCHEMA_VERSION: i64 = 1;

/// `rusqlite`-backed implementation of [`CacheEngine`].
pub struct SqliteEngine {
    conn: Connection,
}

impl SqliteEngine {
    fn migrate(conn: &Connection) -> Result<(), BeadsError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )
        .map_err(sqlite_err)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .map_err(sqlite_err)?;

        if current > SCHEMA_VERSION {
            return Err(BeadsError::SchemaDrift {
                log_dir: std::path::PathBuf::new(),
                found: format!("on-disk schema version {current} is newer than this engine's {SCHEMA_VERSION}"),
            });
        }

        if current < 1 {
            conn.execute_batch(
                "CREATE TABLE issues (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    design TEXT NOT NULL DEFAULT '',
                    status TEXT NOT NULL,
                    priority INTEGER NOT NULL,
                    type TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    content_hash TEXT NOT NULL,
                    dirty INTEGER NOT NULL DEFAULT 0
                );
                CREATE TABLE edges (
                    from_id TEXT NOT NULL,
                    to_id TEXT NOT NULL,
                    relation_type TEXT NOT NULL,
                    PRIMARY KEY (from_id, to_id, relation_type)
                );",
            )
            .map_err(sqlite_err)?;
            conn.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (1, datetime('now'))",
                [],
            )
            .map_err(sqlite_err)?;
        }

        Ok(())
    }

    /// Existing edges of exactly `kind` — the `blocks` and `parent-child`
    /// sub-graphs are checked independently, since an edge of one kind
    /// never participates in the other kind's cycle check.
    fn existing_cycle_edges(&self, kind: &str) -> Result<Vec<(String, String)>, BeadsError> {
        let mut stmt = self
            .conn
            .prepare("SELECT from_id, to_id FROM edges WHERE relation_type = ?1")
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map(params![kind], |row| {
                let from: String = row.get(0)?;
                let to: String = row.get(1)?;
                Ok((from, to))
            })
            .map_err(sqlite_err)?;

        let mut edges = Vec::new();
        for row in rows {
            edges.push(row.map_err(sqlite_err)?);
        }
        Ok(edges)
    }
}

fn sqlite_err(err: rusqlite::Error) -> BeadsError {
    BeadsError::Io(std::io::Error::other(err.to_string()))
}

impl CacheEngine for SqliteEngine {
    fn open(path: &Path, mode: OpenMode) -> Result<Self, BeadsError> {
        let conn = if matches!(mode, OpenMode::ReadOnly) {
            Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(sqlite_err)?
        } else {
            Connection::open(path).map_err(sqlite_err)?
        };
        conn.pragma_update(None, "journal_mode", "WAL").map_err(sqlite_err)?;
        conn.pragma_update(None, "foreign_keys", "ON").map_err(sqlite_err)?;

        if matches!(mode, OpenMode::ReadWrite) {
            Self::migrate(&conn)?;
        }

        Ok(Self { conn })
    }

    fn create_issue(&mut self, issue: &Issue) -> Result<(), BeadsError> {
        self.conn
            .execute(
                "INSERT INTO issues (id, title, description, design, status, priority, type, created_at, updated_at, content_hash, dirty)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1)",
                params![
                    issue.id.as_str(),
                    issue.title,
                    issue.description,
                    issue.design,
                    issue.status.to_string(),
                    issue.priority,
                    issue.issue_type,
                    issue.created_at,
                    issue.updated_at,
                    issue.content_hash.as_str(),
                ],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    fn update_issue(&mut self, id: &IssueId, patch: &IssuePatch, _actor: &Actor) -> Result<(), BeadsError> {
        let exists: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM issues WHERE id = ?1", params![id.as_str()], |row| row.get(0))
            .optional()
            .map_err(sqlite_err)?;
        if exists.is_none() {
            return Err(BeadsError::NotFound {
                what: format!("issue {id}"),
                log_dir: std::path::PathBuf::new(),
            });
        }

        let tx = self.conn.transaction().map_err(sqlite_err)?;
        if let Some(title) = &patch.title {
            tx.execute("UPDATE issues SET title = ?1 WHERE id = ?2", params![title, id.as_str()])
                .map_err(sqlite_err)?;
        }
        if let Some(description) = &patch.description {
            tx.execute(
                "UPDATE issues SET description = ?1 WHERE id = ?2",
                params![description, id.as_str()],
            )
            .map_err(sqlite_err)?;
        }
        if let Some(design) = &patch.design {
            tx.execute("UPDATE issues SET design = ?1 WHERE id = ?2", params![design, id.as_str()])
                .map_err(sqlite_err)?;
        }
        if let Some(status) = &patch.status {
            tx.execute(
                "UPDATE issues SET status = ?1 WHERE id = ?2",
                params![status.to_string(), id.as_str()],
            )
            .map_err(sqlite_err)?;
        }
        if let Some(priority) = &patch.priority {
            tx.execute(
                "UPDATE issues SET priority = ?1 WHERE id = ?2",
                params![priority, id.as_str()],
            )
            .map_err(sqlite_err)?;
        }
        tx.execute("UPDATE issues SET dirty = 1 WHERE id = ?1", params![id.as_str()])
            .map_err(sqlite_err)?;
        tx.commit().map_err(sqlite_err)?;
        Ok(())
    }

    fn get_issue(&self, id: &IssueId) -> Result<Issue, BeadsError> {
        self.conn
            .query_row(
                "SELECT id, title, description, design, status, priority, type, created_at, updated_at, content_hash
                 FROM issues WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    let status: String = row.get(4)?;
                    let hash: String = row.get(9)?;
                    Ok(Issue {
                        id: IssueId::new(&row.get::<_, String>(0)?).unwrap_or_else(|_| id.clone()),
                        title: row.get(1)?,
                        description: row.get(2)?,
                        design: row.get(3)?,
                        status: parse_status(&status),
                        priority: row.get(5)?,
                        issue_type: row.get(6)?,
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                        content_hash: beads_core::ContentHash::from_hex(hash),
                    })
                },
            )
            .optional()
            .map_err(sqlite_err)?
            .ok_or_else(|| BeadsError::NotFound {
                what: format!("issue {id}"),
                log_dir: std::path::PathBuf::new(),
            })
    }

    fn add_edge(&mut self, from: &IssueId, to: &IssueId, relation_type: RelationType) -> Result<(), BeadsError> {
        if relation_type.participates_in_cycle_check() {
            let existing = self.existing_cycle_edges(relation_type_str(relation_type))?;
            let existing_refs: Vec<(&str, &str)> = existing.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
            if beads_core::would_create_cycle(existing_refs.iter().copied(), from.as_str(), to.as_str()) {
                return Err(BeadsError::CycleWouldForm {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        }
        self.conn
            .execute(
                "INSERT OR IGNORE INTO edges (from_id, to_id, relation_type) VALUES (?1, ?2, ?3)",
                params![from.as_str(), to.as_str(), relation_type_str(relation_type)],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    fn apply(&mut self, batch: &[LogRecord]) -> Result<ApplyReport, BeadsError> {
        let mut report = ApplyReport::default();
        for record in batch {
            match self.apply_one(record) {
                Ok(true) => report.applied += 1,
                Ok(false) => report.skipped += 1,
                Err(detail) => {
                    report.rejected += 1;
                    report.warnings.push(detail);
                }
            }
        }
        Ok(report)
    }

    fn check_eligibility(&self, id: &IssueId, tier: CompactionTier) -> Result<Eligibility, BeadsError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT status, updated_at FROM issues WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(sqlite_err)?;

        let Some((status, _updated_at)) = row else {
            return Err(BeadsError::NotFound {
                what: format!("issue {id}"),
                log_dir: std::path::PathBuf::new(),
            });
        };

        if status != IssueStatus::Closed.to_string() && status != IssueStatus::Archived.to_string() {
            return Ok(Eligibility {
                eligible: false,
                reason: "issue is not closed or archived".to_owned(),
            });
        }

        let referenced: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM edges e
                 JOIN issues i ON i.id = e.from_id
                 WHERE e.to_id = ?1 AND i.status NOT IN ('closed', 'archived', 'tombstone')",
                params![id.as_str()],
                |row| row.get(0),
            )
            .map_err(sqlite_err)?;

        if referenced > 0 {
            return Ok(Eligibility {
                eligible: false,
                reason: "referenced from open work".to_owned(),
            });
        }

        let reason = match tier {
            CompactionTier::Summary => "closed long enough for summary compaction",
            CompactionTier::Archive => "closed long enough for archive compaction",
        };
        Ok(Eligibility {
            eligible: true,
            reason: reason.to_owned(),
        })
    }

    fn mark_dirty(&mut self, id: &IssueId) -> Result<(), BeadsError> {
        let changed = self
            .conn
            .execute("UPDATE issues SET dirty = 1 WHERE id = ?1", params![id.as_str()])
            .map_err(sqlite_err)?;
        if changed == 0 {
            return Err(BeadsError::NotFound {
                what: format!("issue {id}"),
                log_dir: std::path::PathBuf::new(),
            });
        }
        Ok(())
    }

    fn dirty_issues(&self) -> Result<Vec<IssueId>, BeadsError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM issues WHERE dirty = 1 ORDER BY updated_at, id")
            .map_err(sqlite_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sqlite_err)?;
        let mut out = Vec::new();
        for row in rows {
            let id = row.map_err(sqlite_err)?;
            if let Ok(id) = IssueId::new(&id) {
                out.push(id);
            }
        }
        Ok(out)
    }

    fn clear_dirty(&mut self, id: &IssueId) -> Result<(), BeadsError> {
        self.conn
            .execute("UPDATE issues SET dirty = 0 WHERE id = ?1", params![id.as_str()])
            .map_err(sqlite_err)?;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), BeadsError> {
        self.conn.execute_batch("DELETE FROM edges; DELETE FROM issues;").map_err(sqlite_err)?;
        Ok(())
    }
}

impl SqliteEngine {
    /// Apply one record under the dedup/tie-break rule from the export
    /// pipeline contract. Returns `Ok(true)` if it changed cache state,
    /// `Ok(false)` if it was a no-op duplicate, `Err` with a human-readable
    /// reason if the record was rejected.
    fn apply_one(&mut self, record: &LogRecord) -> Result<bool, String> {
        let existing: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT content_hash, updated_at FROM issues WHERE id = ?1",
                params![record.id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| e.to_string())?;

        let Some((existing_hash, existing_updated_at)) = existing else {
            self.insert_from_record(record).map_err(|e| e.to_string())?;
            return Ok(true);
        };

        if existing_hash == record.content_hash.as_str() {
            // Same (id, hash): only the first application counts; later
            // duplicates update the timestamp only.
            self.conn
                .execute(
                    "UPDATE issues SET updated_at = ?1 WHERE id = ?2 AND updated_at < ?1",
                    params![record.updated_at, record.id.as_str()],
                )
                .map_err(|e| e.to_string())?;
            return Ok(false);
        }

        let newer = record.updated_at > existing_updated_at
            || (record.updated_at == existing_updated_at && record.content_hash.as_str() > existing_hash.as_str());

        if newer {
            self.insert_from_record(record).map_err(|e| e.to_string())?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn insert_from_record(&mut self, record: &LogRecord) -> rusqlite::Result<()> {
        let title = field_str(record, "title");
        let description = field_str(record, "description");
        let design = field_str(record, "design");
        let priority = record.fields.get("priority").and_then(serde_json::Value::as_i64).unwrap_or(0);
        let issue_type = field_str(record, "type");
        let created_at = field_str(record, "created_at");

        self.conn.execute(
            "INSERT INTO issues (id, title, description, design, status, priority, type, created_at, updated_at, content_hash, dirty)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title, description = excluded.description, design = excluded.design,
                status = excluded.status, priority = excluded.priority, type = excluded.type,
                updated_at = excluded.updated_at, content_hash = excluded.content_hash, dirty = 0",
            params![
                record.id.as_str(),
                title,
                description,
                design,
                record.status.to_string(),
                priority,
                issue_type,
                created_at,
                record.updated_at,
                record.content_hash.as_str(),
            ],
        )?;
        Ok(())
    }
}

fn parse_status(s: &str) -> IssueStatus {
    match s {
        "in_progress" => IssueStatus::InProgress,
        "blocked" => IssueStatus::Blocked,
        "closed" => IssueStatus::Closed,
        "archived" => IssueStatus::Archived,
        "tombstone" => IssueStatus::Tombstone,
        _ => IssueStatus::Open,
    }
}

fn field_str(record: &LogRecord, key: &str) -> String {
    record
        .fields
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

const fn relation_type_str(relation_type: RelationType) -> &'static str {
    match relation_type {
        RelationType::Blocks => "blocks",
        RelationType::ParentChild => "parent-child",
        RelationType::Relates => "relates",
        RelationType::DiscoveredFrom => "discovered-from",
        RelationType::ProvidesSkill => "provides-skill",
        RelationType::RequiresSkill => "requires-skill",
    }
}
