use std::path::PathBuf;
use std::process::ExitCode;

use beads::BeadsError;
use clap::{Parser, Subcommand};

mod commands;

/// Local-first, git-backed issue tracker.
///
/// Exposes the core sync/recovery engine's verbs directly. The concrete
/// issue schema, compaction, and the terminal UI live elsewhere; this
/// binary is the thin wrapper the core spec treats as an external
/// collaborator.
#[derive(Parser)]
#[command(name = "bd")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Explicit log directory, bypassing the resolver's lookup chain.
    #[arg(long, global = true, env = "LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a .beads log directory in the current repository.
    Init,

    /// Mark an issue in_progress.
    Open {
        id: String,
    },

    /// Mark an issue closed.
    Close {
        id: String,
    },

    /// Synchronize the log and cache.
    Sync {
        #[command(subcommand)]
        mode: commands::sync::SyncMode,
    },

    /// Read-only diagnostics over the catalogued corruption patterns.
    ///
    /// `--fix` is an explicit opt-in: automatic repair can destroy
    /// legitimate relationships (e.g. rebuilding the cache from the log
    /// drops anything only the cache ever knew about).
    Doctor {
        #[arg(long)]
        fix: bool,
    },

    /// Resolve conflict markers quarantined in the log via a line-level
    /// three-way merge.
    MergeResolve {
        #[arg(long, required_unless_present = "finish")]
        base: Option<PathBuf>,
        #[arg(long, required_unless_present = "finish")]
        left: Option<PathBuf>,
        #[arg(long, required_unless_present = "finish")]
        right: Option<PathBuf>,

        /// Confirm a clean merge by clearing quarantine and merge state,
        /// after `bd sync import-only` has verified the merged log imports.
        #[arg(long)]
        finish: bool,
    },
}

fn main() -> ExitCode {
    beads::telemetry::init();
    let cli = Cli::parse();

    let span = tracing::info_span!("bd", command = command_name(&cli.command));
    let _guard = span.enter();

    let result: Result<(), BeadsError> = match &cli.command {
        Commands::Init => commands::init::run(cli.log_dir.as_deref()),
        Commands::Open { id } => commands::open_close::open(cli.log_dir.as_deref(), id),
        Commands::Close { id } => commands::open_close::close(cli.log_dir.as_deref(), id),
        Commands::Sync { mode } => commands::sync::run(cli.log_dir.as_deref(), mode),
        Commands::Doctor { fix } => commands::doctor::run(cli.log_dir.as_deref(), *fix),
        Commands::MergeResolve { base, left, right, finish } => commands::merge_resolve::run(
            cli.log_dir.as_deref(),
            base.as_deref(),
            left.as_deref(),
            right.as_deref(),
            *finish,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "command failed");
            eprintln!("error: {err}");
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}

const fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Init => "init",
        Commands::Open { .. } => "open",
        Commands::Close { .. } => "close",
        Commands::Sync { .. } => "sync",
        Commands::Doctor { .. } => "doctor",
        Commands::MergeResolve { .. } => "merge-resolve",
    }
}
