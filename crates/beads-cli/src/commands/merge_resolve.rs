use std::fs;
use std::path::Path;

use beads::merge;
use beads::BeadsError;

use super::{log_path, resolve_context};

#[allow(clippy::too_many_arguments)]
pub fn run(
    log_dir: Option<&Path>,
    base: Option<&Path>,
    left: Option<&Path>,
    right: Option<&Path>,
    finish: bool,
) -> Result<(), BeadsError> {
    let ctx = resolve_context(log_dir)?;
    let log_file = log_path(&ctx);
    let now = now_stamp();

    if finish {
        merge::finish_merge(&log_file, &now)?;
        println!("merge state cleared; log is no longer quarantined");
        return Ok(());
    }

    let base = base.ok_or_else(|| missing_arg("base"))?;
    let left = left.ok_or_else(|| missing_arg("left"))?;
    let right = right.ok_or_else(|| missing_arg("right"))?;
    let base_text = fs::read_to_string(base)?;
    let left_text = fs::read_to_string(left)?;
    let right_text = fs::read_to_string(right)?;

    let outcome = merge::merge_resolve(&log_file, &base_text, &left_text, &right_text, &now)?;

    if outcome.has_conflicts {
        println!("unresolved conflicts remain; log left quarantined, resolve by hand and re-run");
    } else {
        println!("merged cleanly; run `bd sync import-only` to confirm the cache, then `bd merge-resolve --finish`");
    }
    Ok(())
}

fn missing_arg(name: &str) -> BeadsError {
    BeadsError::Usage {
        detail: format!("--{name} is required unless --finish is set"),
    }
}

/// A timestamp for merge state bookkeeping. The merge engine treats this
/// as an opaque string it never parses; the CLI is the one caller allowed
/// to read the wall clock.
fn now_stamp() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:020}", now.as_secs())
}
