//! Daemon & Hook Coordinator (D): serializes concurrent writers (CLI, git
//! hooks, background agents) across processes through a single per-log-dir
//! daemon process.

pub mod cancel;
pub mod hooks;
pub mod registry;
pub mod server;

pub use cancel::CancellationToken;
pub use registry::{AlreadyServed, Registry};
pub use server::{socket_path_for, Request, Response};
