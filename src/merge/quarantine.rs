//! Conflict-marker quarantine: when the working copy of the log still
//! contains unresolved `<<<<<<<`/`=======`/`>>>>>>>` markers, write the
//! three versions out to sidecar files, refuse to import the polluted log,
//! and ask the caller to run merge resolution. Markers are never silently
//! stripped.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BeadsError;

/// The three sidecar files written when quarantining a conflicted log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuarantinePaths {
    pub base: PathBuf,
    pub left: PathBuf,
    pub right: PathBuf,
    pub meta: PathBuf,
}

impl QuarantinePaths {
    #[must_use]
    pub fn for_log(log_path: &Path) -> Self {
        let stem = log_path.file_stem().and_then(|s| s.to_str()).unwrap_or("issues");
        let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
        Self {
            base: dir.join(format!("{stem}.base.jsonl")),
            left: dir.join(format!("{stem}.left.jsonl")),
            right: dir.join(format!("{stem}.right.jsonl")),
            meta: dir.join(format!("{stem}.meta.json")),
        }
    }
}

/// The sidecar metadata: when the quarantine was produced and why,
/// surfaced to the user alongside the three files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuarantineMeta {
    pub reason: String,
    pub created_at: String,
}

/// Write `base`/`left`/`right` to their sidecar files atomically
/// (write-to-temp, fsync, rename) so a crash mid-write never leaves a
/// half-written sidecar next to a deleted original.
///
/// # Errors
/// Propagates I/O errors.
pub fn quarantine(
    log_path: &Path,
    base: &str,
    left: &str,
    right: &str,
    reason: &str,
    now: &str,
) -> Result<QuarantinePaths, BeadsError> {
    let paths = QuarantinePaths::for_log(log_path);
    atomic_write(&paths.base, base)?;
    atomic_write(&paths.left, left)?;
    atomic_write(&paths.right, right)?;

    let meta = QuarantineMeta {
        reason: reason.to_owned(),
        created_at: now.to_owned(),
    };
    let meta_json = serde_json::to_string_pretty(&meta).expect("QuarantineMeta serializes");
    atomic_write(&paths.meta, &meta_json)?;

    Ok(paths)
}

fn atomic_write(path: &Path, content: &str) -> Result<(), BeadsError> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("jsonl")
    ));
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Whether a quarantine already exists for this log (a prior merge attempt
/// was interrupted before resolution completed).
#[must_use]
pub fn is_quarantined(log_path: &Path) -> bool {
    QuarantinePaths::for_log(log_path).base.exists()
}

/// Remove the quarantine sidecars after a successful `merge-resolve`.
///
/// # Errors
/// Propagates I/O errors other than "file already gone".
pub fn clear(log_path: &Path) -> Result<(), BeadsError> {
    let paths = QuarantinePaths::for_log(log_path);
    for path in [&paths.base, &paths.left, &paths.right, &paths.meta] {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(_) if !path.exists() => {}
            Err(e) => return Err(BeadsError::from(e)),
        }
    }
    Ok(())
}
