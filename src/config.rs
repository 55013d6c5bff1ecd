//! Repo-level configuration (`config.toml`) and the cache metadata
//! descriptor (`metadata.json`).
//!
//! Both are parsed with `serde`; unknown keys in `config.toml`'s strict
//! sections are rejected so a typo'd key doesn't silently no-op, while
//! optional sections default so older configs keep loading.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BeadsError;

/// Which cache engine a log directory's metadata names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Sqlite,
    Versioned,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Versioned => write!(f, "versioned"),
        }
    }
}

/// The on-disk layout version named in `metadata.json`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutVersion {
    V1,
    V2,
}

/// `.beads/metadata.json` — names the engine and layout version a log
/// directory was initialized with. Read by S before `Open` and by L before
/// resolving volatile-file paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub backend: Backend,
    pub layout_version: LayoutVersion,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Metadata {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            layout_version: LayoutVersion::V2,
            extra: serde_json::Map::new(),
        }
    }

    /// # Errors
    /// Propagates I/O errors and JSON parse failures.
    pub fn load(path: &Path) -> Result<Self, BeadsError> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| BeadsError::SchemaDrift {
            log_dir: path.parent().map_or_else(|| path.to_path_buf(), Path::to_path_buf),
            found: e.to_string(),
        })
    }

    /// # Errors
    /// Propagates I/O errors.
    pub fn save(&self, path: &Path) -> Result<(), BeadsError> {
        let text = serde_json::to_string_pretty(self).expect("Metadata serializes");
        fs::write(path, text)?;
        Ok(())
    }
}

/// Locking and retry timing. Mirrors §5's stated defaults; see the open
/// question in `DESIGN.md` about divergent defaults across operator docs —
/// this is the single set actually enforced by this implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TimingConfig {
    pub lock_deadline_secs: u64,
    pub transport_retries: u32,
    pub reader_pool_size: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            lock_deadline_secs: 30,
            transport_retries: 3,
            reader_pool_size: 4,
        }
    }
}

/// The `[repo]` section of `config.toml`: identifies the git branch this
/// log directory tracks and, optionally, an explicit cache path overriding
/// the resolver's lookup chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoSection {
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub cache_path: Option<std::path::PathBuf>,
}

fn default_branch() -> String {
    "main".to_owned()
}

impl Default for RepoSection {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            cache_path: None,
        }
    }
}

/// Top-level `config.toml` shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BeadsConfig {
    pub repo: RepoSection,
    pub timing: TimingConfig,
}

impl BeadsConfig {
    /// # Errors
    /// Propagates I/O errors and TOML parse failures (reported as
    /// [`BeadsError::Usage`] since a malformed config is caller error, not
    /// corruption).
    pub fn load(path: &Path) -> Result<Self, BeadsError> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| BeadsError::Usage {
            detail: format!("malformed config at {}: {e}", path.display()),
        })
    }

    /// # Errors
    /// Propagates I/O errors.
    pub fn save(&self, path: &Path) -> Result<(), BeadsError> {
        let text = toml::to_string_pretty(self).expect("BeadsConfig serializes");
        fs::write(path, text)?;
        Ok(())
    }
}
