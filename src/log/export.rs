//! Export: serialize dirty issues to canonical log lines and append them
//! to the primary log file.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::error::BeadsError;
use crate::model::types::{Issue, IssueId};
use crate::store::CacheEngine;

/// A single exported line plus the id it belongs to, kept for the export
/// summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedLine {
    pub id: IssueId,
    pub line: String,
}

#[derive(Serialize)]
struct ExportRecord<'a> {
    id: &'a str,
    content_hash: &'a str,
    updated_at: &'a str,
    status: String,
    title: &'a str,
    description: &'a str,
    design: &'a str,
    priority: i32,
    #[serde(rename = "type")]
    issue_type: &'a str,
    created_at: &'a str,
}

/// Serialize `issue` to its canonical log line (no trailing newline).
///
/// # Errors
/// Propagates [`beads_core::Error::NotCanonicalizable`], which cannot
/// actually occur for this shape.
pub fn canonical_line(issue: &Issue) -> Result<String, beads_core::Error> {
    let record = ExportRecord {
        id: issue.id.as_str(),
        content_hash: issue.content_hash.as_str(),
        updated_at: &issue.updated_at,
        status: issue.status.to_string(),
        title: &issue.title,
        description: &issue.description,
        design: &issue.design,
        priority: issue.priority,
        issue_type: &issue.issue_type,
        created_at: &issue.created_at,
    };
    let bytes = beads_core::canonical_json(&record)?;
    Ok(String::from_utf8(bytes).expect("canonical JSON is valid UTF-8"))
}

/// Export every issue currently marked dirty in `engine` to `log_path`,
/// ordered by the cache's own dirty-issue ordering (modification timestamp
/// then id), clearing each issue's dirty flag only after its line is
/// durably appended.
///
/// # Errors
/// Propagates cache and I/O errors. A failure partway through leaves
/// already-exported issues clean and already-appended lines in place;
/// callers re-run export to pick up the rest.
pub fn export_dirty(engine: &mut dyn CacheEngine, log_path: &Path) -> Result<Vec<ExportedLine>, BeadsError> {
    let dirty = engine.dirty_issues()?;
    let mut exported = Vec::with_capacity(dirty.len());

    let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;

    for id in dirty {
        let issue = engine.get_issue(&id)?;
        let line = canonical_line(&issue).map_err(|e| BeadsError::Usage {
            detail: e.to_string(),
        })?;
        writeln!(file, "{line}")?;
        file.flush()?;
        engine.clear_dirty(&id)?;
        exported.push(ExportedLine { id, line });
    }

    Ok(exported)
}
