//! A persisted merge state machine so an interrupted merge resumes from
//! where it left off instead of re-detecting from scratch.
//!
//! Phases move forward only: `Detected` (markers found, not yet
//! quarantined) → `Quarantined` (sidecars written) → `Resolved` (caller
//! ran `merge-resolve`, log contains merged content with no markers) →
//! `Imported` (import-only completed against the merged log). Each
//! transition is written to disk with the same atomic
//! write-to-temp-then-rename discipline as the quarantine sidecars.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BeadsError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePhase {
    Detected,
    Quarantined,
    Resolved,
    Imported,
}

impl MergePhase {
    /// Whether `next` is a legal forward transition from `self`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Detected, Self::Quarantined)
                | (Self::Quarantined, Self::Resolved)
                | (Self::Resolved, Self::Imported)
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergeState {
    pub phase: MergePhase,
    pub log_path: PathBuf,
    pub updated_at: String,
}

impl MergeState {
    fn state_path(log_path: &Path) -> PathBuf {
        let stem = log_path.file_stem().and_then(|s| s.to_str()).unwrap_or("issues");
        let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
        dir.join(format!("{stem}.merge-state.meta.json"))
    }

    /// # Errors
    /// Propagates I/O errors. A missing state file is `Ok(None)`, not an
    /// error.
    pub fn load(log_path: &Path) -> Result<Option<Self>, BeadsError> {
        let path = Self::state_path(log_path);
        match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map(Some).map_err(|e| BeadsError::CorruptionDetected {
                pattern: "merge-state-unreadable",
                log_dir: log_path.parent().map_or_else(|| log_path.to_path_buf(), Path::to_path_buf),
                detail: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BeadsError::from(e)),
        }
    }

    /// Transition to `phase`, rejecting non-forward moves.
    ///
    /// # Errors
    /// Returns [`BeadsError::Usage`] if `phase` is not a legal forward
    /// transition from the current phase.
    pub fn advance(&mut self, phase: MergePhase, now: &str) -> Result<(), BeadsError> {
        if !self.phase.can_advance_to(phase) {
            return Err(BeadsError::Usage {
                detail: format!("illegal merge state transition {:?} -> {:?}", self.phase, phase),
            });
        }
        self.phase = phase;
        self.updated_at = now.to_owned();
        self.save()
    }

    #[must_use]
    pub fn start(log_path: &Path, now: &str) -> Self {
        Self {
            phase: MergePhase::Detected,
            log_path: log_path.to_path_buf(),
            updated_at: now.to_owned(),
        }
    }

    /// # Errors
    /// Propagates I/O errors.
    pub fn save(&self) -> Result<(), BeadsError> {
        let path = Self::state_path(&self.log_path);
        let json = serde_json::to_string_pretty(self).expect("MergeState serializes");
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// # Errors
    /// Propagates I/O errors.
    pub fn clear(log_path: &Path) -> Result<(), BeadsError> {
        let path = Self::state_path(log_path);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BeadsError::from(e)),
        }
    }
}
