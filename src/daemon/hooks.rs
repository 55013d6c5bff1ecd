//! Hook protocol: git hooks never write directly. They connect to the
//! daemon and submit a request; if no daemon is running and the hook can
//! take the exclusive log lock itself, it runs the operation directly in
//! "hook-mode" — shorter timeouts, no background work.

use std::io::{BufRead, BufReader, Write as _};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use crate::error::BeadsError;
use crate::lockfile::LockHandle;
use crate::log::import::{self, ImportMode};
use crate::store::{ApplyReport, CacheEngine};

use super::server::{Request, Response};

/// Hook-mode operations use a much shorter lock deadline than interactive
/// commands — a hook blocking for 30 seconds would make every `git commit`
/// feel broken.
const HOOK_MODE_DEADLINE: Duration = Duration::from_secs(3);

/// Submit an apply request to a running daemon at `socket_path`.
///
/// # Errors
/// Returns [`BeadsError::TransportError`] if the socket can't be reached
/// or the daemon returns a malformed response.
pub fn submit_apply(socket_path: &Path, records: &[crate::model::types::LogRecord]) -> Result<ApplyReport, BeadsError> {
    let mut stream = UnixStream::connect(socket_path).map_err(|e| BeadsError::TransportError {
        detail: e.to_string(),
        attempts: 1,
    })?;
    let request = Request::Apply { records: records.to_vec() };
    writeln!(stream, "{}", serde_json::to_string(&request).expect("Request serializes")).map_err(|e| {
        BeadsError::TransportError { detail: e.to_string(), attempts: 1 }
    })?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).map_err(|e| BeadsError::TransportError {
        detail: e.to_string(),
        attempts: 1,
    })?;

    match serde_json::from_str::<Response>(line.trim()) {
        Ok(Response::Applied { report }) => Ok(ApplyReport {
            applied: report.applied,
            skipped: report.skipped,
            rejected: report.rejected,
            warnings: report.warnings,
        }),
        Ok(Response::Error { message }) => Err(BeadsError::TransportError { detail: message, attempts: 1 }),
        Ok(other) => Err(BeadsError::TransportError {
            detail: format!("unexpected daemon response: {other:?}"),
            attempts: 1,
        }),
        Err(e) => Err(BeadsError::TransportError { detail: e.to_string(), attempts: 1 }),
    }
}

/// Run a sync on behalf of a git hook: try the daemon first; if it isn't
/// reachable, take the exclusive log lock and import directly with a
/// hook-mode deadline.
///
/// # Errors
/// Propagates lock and import errors. Never blocks longer than
/// [`HOOK_MODE_DEADLINE`] when falling back to direct execution.
pub fn run_hook_sync(
    socket_path: &Path,
    log_lock_path: &Path,
    log_path: &Path,
    cursor_path: &Path,
    engine: &mut dyn CacheEngine,
) -> Result<ApplyReport, BeadsError> {
    if socket_path.exists() {
        if let Ok(text) = std::fs::read_to_string(log_path) {
            if !text.trim().is_empty() {
                let records = parse_lines(&text);
                if let Ok(report) = submit_apply(socket_path, &records) {
                    return Ok(report);
                }
            }
        }
    }

    let _lock = LockHandle::acquire_blocking(log_lock_path, HOOK_MODE_DEADLINE)?;
    import::import(engine, log_path, cursor_path, ImportMode::Incremental, false)
}

fn parse_lines(text: &str) -> Vec<crate::model::types::LogRecord> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}
