//! A lightweight cancellation signal: an `Arc<AtomicBool>` plus a condvar
//! for blocking waiters. No async runtime involved — every suspension
//! point in this engine blocks a real OS thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// A signal one thread can raise and any number of others can observe or
/// block on.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<(Mutex<()>, Condvar)>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new((Mutex::new(()), Condvar::new())),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let (_lock, condvar) = &*self.notify;
        condvar.notify_all();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Block until either cancellation or `deadline` elapses, whichever
    /// comes first. Returns `true` if cancellation occurred before the
    /// deadline.
    #[must_use]
    pub fn wait_with_deadline(&self, deadline: Duration) -> bool {
        let start = Instant::now();
        let (lock, condvar) = &*self.notify;
        let mut guard = lock.lock().expect("cancellation mutex poisoned");
        while !self.is_cancelled() {
            let elapsed = start.elapsed();
            if elapsed >= deadline {
                return false;
            }
            let (new_guard, timeout) = condvar
                .wait_timeout(guard, deadline - elapsed)
                .expect("cancellation mutex poisoned");
            guard = new_guard;
            if timeout.timed_out() && !self.is_cancelled() {
                return false;
            }
        }
        true
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
