//! Telemetry initialization.
//!
//! Controlled by `RUST_LOG` (standard `tracing-subscriber` env filter):
//! unset defaults to `info`. Logs are plain text on a terminal and JSON
//! when `BEADS_LOG_FORMAT=json` is set, so the daemon's stderr can be
//! fed to a log aggregator without a separate formatter flag.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Safe to call once per
/// process; a second call is a no-op (the underlying `set_global_default`
/// failure is swallowed, matching `tracing`'s own recommended pattern for
/// libraries that might be initialized more than once in tests).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("BEADS_LOG_FORMAT").as_deref() == Ok("json");

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("telemetry already initialized: {e}");
    }
}
