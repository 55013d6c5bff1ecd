//! On-disk layout: legacy vs. `var/`, volatile-file classification.
//!
//! Two permitted shapes for a log directory:
//!
//! - *legacy*: every file lives at the log directory root.
//! - *var*: volatile files (cache, cache side-files, lockfiles, sockets,
//!   sync cursor, merge artefacts) live under `var/`; non-volatile files
//!   (logs, metadata, redirect, config) stay at root.
//!
//! The resolver prefers `var/` when it exists, falls back to root, and
//! always respects the `BEADS_LEGACY_LAYOUT` environment override.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const LOG_DIR_NAME: &str = ".beads";
pub const VAR_DIR: &str = "var";
pub const CONFIG_FILE: &str = "config.toml";
pub const METADATA_FILE: &str = "metadata.json";
pub const REDIRECT_FILE: &str = "redirect";
pub const CACHE_FILE: &str = "cache.db";

/// Environment variable that forces the legacy (root-only) layout even
/// when a `var/` directory already exists.
pub const LEGACY_LAYOUT_ENV: &str = "BEADS_LEGACY_LAYOUT";

/// Which permitted layout shape a log directory uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutKind {
    Legacy,
    Var,
}

/// Whether a logical file name belongs under `var/` (volatile) or at the
/// log directory root (non-volatile).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileClass {
    Volatile,
    NonVolatile,
}

/// Classify a logical file name by its basename.
#[must_use]
pub fn classify(basename: &str) -> FileClass {
    let volatile = basename == CACHE_FILE
        || basename.ends_with(".db-wal")
        || basename.ends_with(".db-shm")
        || basename.ends_with(".lock")
        || basename.ends_with(".sock")
        || basename == "sync-cursor"
        || basename.ends_with(".base.jsonl")
        || basename.ends_with(".left.jsonl")
        || basename.ends_with(".right.jsonl")
        || basename.ends_with(".meta.json");
    if volatile {
        FileClass::Volatile
    } else {
        FileClass::NonVolatile
    }
}

/// Resolves logical file names to concrete on-disk paths for a given log
/// directory, honoring the legacy/var split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    log_dir: PathBuf,
    kind: LayoutKind,
}

impl Layout {
    /// Determine the layout in effect for `log_dir`: `var/` if it already
    /// exists and the legacy override isn't set, legacy otherwise.
    #[must_use]
    pub fn discover(log_dir: &Path) -> Self {
        let forced_legacy = env::var_os(LEGACY_LAYOUT_ENV).is_some();
        let kind = if !forced_legacy && log_dir.join(VAR_DIR).is_dir() {
            LayoutKind::Var
        } else {
            LayoutKind::Legacy
        };
        Self {
            log_dir: log_dir.to_path_buf(),
            kind,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> LayoutKind {
        self.kind
    }

    /// Resolve a logical file name to its concrete path under this layout.
    #[must_use]
    pub fn path_for(&self, basename: &str) -> PathBuf {
        match (self.kind, classify(basename)) {
            (LayoutKind::Var, FileClass::Volatile) => self.log_dir.join(VAR_DIR).join(basename),
            _ => self.log_dir.join(basename),
        }
    }

    /// Create `var/` on demand (writes that target a volatile file under a
    /// not-yet-materialized `var/` layout call this first).
    pub fn ensure_var_dir(&self) -> io::Result<()> {
        if matches!(self.kind, LayoutKind::Var) {
            fs::create_dir_all(self.log_dir.join(VAR_DIR))?;
        }
        Ok(())
    }
}

/// Patterns this engine adds to `.gitignore` so volatile files are never
/// committed.
pub const GITIGNORE_PATTERNS: &[&str] = &[".beads/var/", ".beads/*.lock"];

/// Initialize a `.beads` log directory: create it if missing, write a
/// default `config.toml` if missing, and update `.gitignore`. Idempotent.
pub fn init_log_dir(repo_root: &Path) -> io::Result<PathBuf> {
    let log_dir = repo_root.join(LOG_DIR_NAME);
    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }

    let config_path = log_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        fs::write(&config_path, "[repo]\nbranch = \"main\"\n")?;
    }

    update_gitignore(repo_root)?;
    Ok(log_dir)
}

fn update_gitignore(repo_root: &Path) -> io::Result<()> {
    let gitignore_path = repo_root.join(".gitignore");
    let mut content = if gitignore_path.exists() {
        fs::read_to_string(&gitignore_path)?
    } else {
        String::new()
    };

    let existing: std::collections::HashSet<_> = content.lines().map(str::trim).collect();
    let missing: Vec<&str> = GITIGNORE_PATTERNS
        .iter()
        .filter(|p| !existing.contains(*p))
        .copied()
        .collect();

    if !missing.is_empty() {
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str("\n# beads\n");
        for pattern in missing {
            content.push_str(pattern);
            content.push('\n');
        }
        fs::write(gitignore_path, content)?;
    }

    Ok(())
}
