//! A small bounded connection pool: one writer slot, N reader slots.
//!
//! The teacher reaches for a hand-rolled `Mutex`/`Condvar` queue rather than
//! a pooling crate wherever a fixed-size resource pool suffices; this
//! mirrors that instinct for the cache's two connection classes.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// A pool of pre-built connections, handed out FIFO and returned on drop.
pub struct Pool<T> {
    idle: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> Pool<T> {
    #[must_use]
    pub fn new(connections: Vec<T>) -> Self {
        Self {
            idle: Mutex::new(connections.into()),
            available: Condvar::new(),
        }
    }

    /// Block until a connection is available, then hand out ownership of
    /// it wrapped in a guard that returns it to the pool on drop.
    #[must_use]
    pub fn acquire(&self) -> PoolGuard<'_, T> {
        let mut idle = self.idle.lock().expect("pool mutex poisoned");
        while idle.is_empty() {
            idle = self.available.wait(idle).expect("pool mutex poisoned");
        }
        let conn = idle.pop_front().expect("checked non-empty");
        PoolGuard {
            pool: self,
            conn: Some(conn),
        }
    }

    fn release(&self, conn: T) {
        self.idle.lock().expect("pool mutex poisoned").push_back(conn);
        self.available.notify_one();
    }
}

/// An acquired connection. Returned to the pool automatically on drop.
pub struct PoolGuard<'a, T> {
    pool: &'a Pool<T>,
    conn: Option<T>,
}

impl<T> std::ops::Deref for PoolGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.conn.as_ref().expect("conn taken only on drop")
    }
}

impl<T> std::ops::DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.conn.as_mut().expect("conn taken only on drop")
    }
}

impl<T> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
