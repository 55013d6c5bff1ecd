use std::path::Path;

use beads::config::{Backend, BeadsConfig, Metadata};
use beads::model::layout::{self, METADATA_FILE};
use beads::BeadsError;
use beads_git::{GitRepo, GixRepo};

/// Initialize a `.beads` log directory: create the layout, write the
/// default config and metadata, and make sure volatile files are
/// gitignored. Idempotent.
pub fn run(log_dir_override: Option<&Path>) -> Result<(), BeadsError> {
    let cwd = std::env::current_dir()?;
    let repo_root = GixRepo::discover(&cwd)
        .map(|repo| repo.location().work_dir.clone())
        .unwrap_or(cwd);

    let log_dir = match log_dir_override {
        Some(path) => {
            std::fs::create_dir_all(path)?;
            path.to_path_buf()
        }
        None => layout::init_log_dir(&repo_root)?,
    };

    let metadata_path = log_dir.join(METADATA_FILE);
    if !metadata_path.exists() {
        Metadata::new(Backend::Sqlite).save(&metadata_path)?;
    }

    let config_path = log_dir.join("config.toml");
    if BeadsConfig::load(&config_path).is_err() {
        BeadsConfig::default().save(&config_path)?;
    }

    println!("initialized beads log directory at {}", log_dir.display());
    Ok(())
}
