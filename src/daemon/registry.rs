//! The process-wide daemon registry: which log directories currently have
//! a daemon serving them, and where to reach it.
//!
//! Every read-modify-write cycle against the registry file happens under
//! the registry's own exclusive lock, released before any user-visible
//! work begins — the registry is never held during long operations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::BeadsError;
use crate::lockfile::LockHandle;
use crate::model::types::DaemonRegistration;

/// Registry entries keyed by the canonical log directory they serve.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
struct RegistryFile {
    #[serde(default)]
    entries: HashMap<String, DaemonRegistration>,
}

/// A handle on the registry file plus its lock, scoped to one
/// read-modify-write operation.
pub struct Registry {
    path: PathBuf,
}

/// Returned when a daemon tries to register for a log directory another
/// live daemon already serves.
#[derive(Debug)]
pub struct AlreadyServed {
    pub existing_pid: u32,
}

impl Registry {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn read(&self) -> Result<RegistryFile, BeadsError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if !text.trim().is_empty() => {
                serde_json::from_str(&text).map_err(|e| BeadsError::CorruptionDetected {
                    pattern: "registry-unreadable",
                    log_dir: self.path.parent().map_or_else(|| self.path.to_path_buf(), Path::to_path_buf),
                    detail: e.to_string(),
                })
            }
            _ => Ok(RegistryFile::default()),
        }
    }

    fn write(&self, file: &RegistryFile) -> Result<(), BeadsError> {
        let json = serde_json::to_string_pretty(file).expect("RegistryFile serializes");
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Register a daemon for `log_dir`, canonicalized. Prunes any stale
    /// entry (pid no longer alive) before checking for a live conflict.
    ///
    /// # Errors
    /// Returns `Ok(Err(AlreadyServed))` (not a `BeadsError`) if a live
    /// daemon already serves this directory — the caller is expected to
    /// exit with the `AlreadyServed` condition rather than treat this as a
    /// failure. Propagates lock/I/O errors as `Err`.
    pub fn register(&self, registration: DaemonRegistration) -> Result<Result<(), AlreadyServed>, BeadsError> {
        let _lock = LockHandle::acquire_blocking(&self.lock_path(), Duration::from_secs(30))?;
        let mut file = self.read()?;

        let key = registration.log_dir.display().to_string();
        if let Some(existing) = file.entries.get(&key) {
            if is_alive(existing.pid) {
                return Ok(Err(AlreadyServed { existing_pid: existing.pid }));
            }
        }

        file.entries.insert(key, registration);
        self.write(&file)?;
        Ok(Ok(()))
    }

    /// Remove the entry for `log_dir` on clean shutdown.
    ///
    /// # Errors
    /// Propagates lock/I/O errors.
    pub fn unregister(&self, log_dir: &Path) -> Result<(), BeadsError> {
        let _lock = LockHandle::acquire_blocking(&self.lock_path(), Duration::from_secs(30))?;
        let mut file = self.read()?;
        file.entries.remove(&log_dir.display().to_string());
        self.write(&file)
    }

    /// Look up the live registration for `log_dir`, pruning it first if
    /// its pid is no longer alive.
    ///
    /// # Errors
    /// Propagates lock/I/O errors.
    pub fn lookup(&self, log_dir: &Path) -> Result<Option<DaemonRegistration>, BeadsError> {
        let _lock = LockHandle::acquire_blocking(&self.lock_path(), Duration::from_secs(30))?;
        let mut file = self.read()?;
        let key = log_dir.display().to_string();
        match file.entries.get(&key) {
            Some(entry) if is_alive(entry.pid) => Ok(Some(entry.clone())),
            Some(_) => {
                file.entries.remove(&key);
                self.write(&file)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Read the raw registration for `log_dir` without pruning a stale
    /// entry. Unlike `lookup`, this never mutates the registry file — used
    /// by read-only diagnosis, which must report a dead-pid entry rather
    /// than silently cleaning it up before it can be observed.
    ///
    /// # Errors
    /// Propagates lock/I/O errors.
    pub fn peek(&self, log_dir: &Path) -> Result<Option<DaemonRegistration>, BeadsError> {
        let _lock = LockHandle::acquire_blocking(&self.lock_path(), Duration::from_secs(30))?;
        let file = self.read()?;
        Ok(file.entries.get(&log_dir.display().to_string()).cloned())
    }
}

#[cfg(unix)]
pub(crate) fn is_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
pub(crate) fn is_alive(_pid: u32) -> bool {
    false
}
