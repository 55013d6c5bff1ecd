//! The daemon's request loop: one listener thread accepting connections on
//! a local Unix-domain socket, one dedicated writer thread draining a
//! channel so the cache has exactly one logical writer, and one thread per
//! connection handling that connection's requests in submission order.
//!
//! Every blocking operation here is a real OS thread — no async runtime,
//! matching the rest of this engine.

use std::io::{BufRead, BufReader, Write as _};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::BeadsError;
use crate::model::types::LogRecord;
use crate::store::{ApplyReport, CacheEngine};

use super::cancel::CancellationToken;

/// A request a client connection sends over the socket. One JSON object
/// per line.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Request {
    /// Apply a batch of log records through the single writer.
    Apply { records: Vec<LogRecord> },
    /// A liveness check; answered without touching the cache.
    Ping,
    /// Ask the daemon to shut down after finishing in-flight work.
    Shutdown,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Response {
    Applied { report: ApplyReportWire },
    Pong,
    ShuttingDown,
    Error { message: String },
}

/// A wire-friendly mirror of [`ApplyReport`] (which itself doesn't derive
/// `Serialize` since it's an internal cache-store type).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApplyReportWire {
    pub applied: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub warnings: Vec<String>,
}

impl From<ApplyReport> for ApplyReportWire {
    fn from(report: ApplyReport) -> Self {
        Self {
            applied: report.applied,
            skipped: report.skipped,
            rejected: report.rejected,
            warnings: report.warnings,
        }
    }
}

type WriterJob = (Request, mpsc::Sender<Response>);

/// Run the daemon's accept loop on `socket_path` until `cancellation` is
/// raised. The single writer thread owns `engine` for the lifetime of the
/// daemon; no other thread touches it directly.
///
/// # Errors
/// Returns an error if the socket can't be bound (e.g. a stale socket file
/// from a crashed daemon still occupies the path — callers should remove
/// it via the registry's stale-pid check before calling this).
pub fn run(
    socket_path: &Path,
    engine: Box<dyn CacheEngine>,
    cancellation: CancellationToken,
) -> Result<(), BeadsError> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    let listener = UnixListener::bind(socket_path)?;
    listener.set_nonblocking(true)?;

    let (writer_tx, writer_rx) = mpsc::channel::<WriterJob>();
    let writer_cancellation = cancellation.clone();
    let writer_handle = thread::spawn(move || writer_loop(engine, writer_rx, writer_cancellation));

    let writer_tx = Arc::new(writer_tx);
    let mut connection_handles = Vec::new();

    while !cancellation.is_cancelled() {
        match listener.accept() {
            Ok((stream, _addr)) => {
                let tx = Arc::clone(&writer_tx);
                connection_handles.push(thread::spawn(move || handle_connection(stream, &tx)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                cancellation.wait_with_deadline(std::time::Duration::from_millis(50));
            }
            Err(e) => return Err(BeadsError::from(e)),
        }
    }

    drop(writer_tx);
    for handle in connection_handles {
        let _ = handle.join();
    }
    let _ = writer_handle.join();
    let _ = std::fs::remove_file(socket_path);
    Ok(())
}

/// Handle one client connection: read newline-delimited JSON requests,
/// forward writes to the central writer channel, reply in order. Reads
/// from the same connection are necessarily serialized by this loop,
/// which is the per-connection FIFO guarantee from the concurrency model.
fn handle_connection(stream: UnixStream, writer_tx: &mpsc::Sender<WriterJob>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone unix stream"));
    let mut writer = stream;
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let Ok(request) = serde_json::from_str::<Request>(line.trim()) else {
            let _ = writeln!(
                writer,
                "{}",
                serde_json::to_string(&Response::Error { message: "malformed request".to_owned() }).unwrap()
            );
            continue;
        };

        let is_shutdown = matches!(request, Request::Shutdown);
        let (reply_tx, reply_rx) = mpsc::channel();
        if writer_tx.send((request, reply_tx)).is_err() {
            return;
        }
        let Ok(response) = reply_rx.recv() else {
            return;
        };
        let _ = writeln!(writer, "{}", serde_json::to_string(&response).unwrap());
        if is_shutdown {
            return;
        }
    }
}

/// The sole thread that ever touches `engine`. Drains jobs in arrival
/// order across all connections — cross-connection order is unspecified
/// per the concurrency model, but each job is still fully transactional.
fn writer_loop(mut engine: Box<dyn CacheEngine>, jobs: mpsc::Receiver<WriterJob>, cancellation: CancellationToken) {
    for (request, reply_tx) in jobs {
        if cancellation.is_cancelled() {
            let _ = reply_tx.send(Response::Error { message: "daemon is shutting down".to_owned() });
            continue;
        }
        let response = match request {
            Request::Apply { records } => match engine.apply(&records) {
                Ok(report) => Response::Applied { report: report.into() },
                Err(e) => Response::Error { message: e.to_string() },
            },
            Request::Ping => Response::Pong,
            Request::Shutdown => {
                cancellation.cancel();
                Response::ShuttingDown
            }
        };
        let _ = reply_tx.send(response);
    }
}

#[must_use]
pub fn socket_path_for(log_dir: &Path) -> PathBuf {
    log_dir.join("daemon.sock")
}
