use std::path::Path;

use beads::daemon::Registry;
use beads::doctor::{diagnose, diagnose_and_fix};
use beads::store::{CacheEngine, OpenMode};
use beads::BeadsError;

use super::{cache_path, cursor_path, log_path, resolve_context, Engine};

pub fn run(log_dir: Option<&Path>, fix: bool) -> Result<(), BeadsError> {
    let ctx = resolve_context(log_dir)?;
    let registry = Registry::new(ctx.log_dir.join("daemon-registry.json"));

    if !fix {
        let report = diagnose(&ctx, &cache_path(&ctx), &registry)?;
        if report.findings.is_empty() {
            println!("no issues found");
        }
        for finding in &report.findings {
            println!("{}: {}", finding.pattern.name(), finding.detail);
        }
        return Ok(());
    }

    eprintln!("warning: --fix can destroy legitimate relationships the log never recorded explicitly");
    eprintln!("(anything the cache tracked but the log doesn't is lost when it's rebuilt from the log)");

    let mut engine = Engine::open(&cache_path(&ctx), OpenMode::ReadWrite)?;
    let report = diagnose_and_fix(
        &ctx,
        &cache_path(&ctx),
        &log_path(&ctx),
        &cursor_path(&ctx),
        &registry,
        &mut engine,
    )?;

    for finding in &report.findings {
        println!("{}: {}", finding.pattern.name(), finding.detail);
    }
    for remediation in &report.remediations {
        println!("fixed: {remediation}");
    }
    Ok(())
}
