//! Layout & Lockfile (L) — advisory OS-level file locks.
//!
//! Two modes, both exclusive: blocking (waits up to a deadline) and
//! non-blocking (returns [`BeadsError::Locked`] immediately when held).
//! Never holds a lock across a network call, and the registry → log →
//! cache acquisition order is enforced by callers, not by this module.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;

use crate::error::BeadsError;

/// The default deadline for blocking lock acquisition, per the
/// concurrency model's stated default.
pub const DEFAULT_LOCK_DEADLINE: Duration = Duration::from_secs(30);

/// How long to sleep between retries while polling a non-blocking lock in
/// [`LockHandle::acquire_blocking`].
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A held advisory lock on a lockfile. Releasing is automatic on drop.
#[derive(Debug)]
pub struct LockHandle {
    file: File,
    path: PathBuf,
}

impl LockHandle {
    /// Acquire an exclusive lock on `path`, waiting up to `deadline`.
    ///
    /// # Errors
    /// Returns [`BeadsError::Locked`] if the deadline elapses before the
    /// lock is acquired.
    pub fn acquire_blocking(path: &Path, deadline: Duration) -> Result<Self, BeadsError> {
        let file = open_lockfile(path)?;
        let start = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    })
                }
                Err(_) if start.elapsed() < deadline => {
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(_) => {
                    return Err(BeadsError::Locked {
                        resource: path.display().to_string(),
                        log_dir: path
                            .parent()
                            .map_or_else(|| path.to_path_buf(), Path::to_path_buf),
                    })
                }
            }
        }
    }

    /// Acquire an exclusive lock on `path`, returning immediately with
    /// [`BeadsError::Locked`] if another holder has it.
    ///
    /// # Errors
    /// Returns [`BeadsError::Locked`] if the lock is already held.
    pub fn acquire_nonblocking(path: &Path) -> Result<Self, BeadsError> {
        let file = open_lockfile(path)?;
        FileExt::try_lock_exclusive(&file).map_err(|_| BeadsError::Locked {
            resource: path.display().to_string(),
            log_dir: path
                .parent()
                .map_or_else(|| path.to_path_buf(), Path::to_path_buf),
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn open_lockfile(path: &Path) -> Result<File, BeadsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(BeadsError::from)
}
