//! Pinned `git` subprocess invocation.
//!
//! Per the external-interface contract, every git invocation this crate
//! makes on behalf of the daemon or merge engine pins `GIT_DIR`/
//! `GIT_WORK_TREE` explicitly and disables hooks and templates, so that a
//! stray `core.hooksPath` or `init.templateDir` in the user's global config
//! can never run code beads didn't ask for.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::GitError;
use crate::repo::RepoLocation;

/// A `git` invocation pinned to a specific repository location, with hooks
/// and templates disabled.
pub struct PinnedCommand {
    command: Command,
    args: Vec<String>,
}

impl PinnedCommand {
    /// Start building an invocation of `git <args>` pinned to `location`.
    pub fn new(location: &RepoLocation, args: &[&str]) -> Self {
        let mut command = Command::new("git");
        command
            .env("GIT_DIR", &location.git_dir)
            .env("GIT_WORK_TREE", &location.work_dir)
            .arg("-c")
            .arg("core.hooksPath=/dev/null")
            .arg("-c")
            .arg("init.templateDir=")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        Self {
            command,
            args: args.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Set the working directory the subprocess is spawned in. Defaults to
    /// the repository's work tree if unset.
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.command.current_dir(dir);
        self
    }

    /// Run the command to completion, returning stdout as UTF-8 on success.
    pub fn run(mut self) -> Result<String, GitError> {
        let output = self.command.output().map_err(GitError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(GitError::Invocation {
                args: self.args,
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        String::from_utf8(output.stdout).map_err(GitError::NonUtf8)
    }
}
