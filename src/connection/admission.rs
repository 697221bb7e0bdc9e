//! Admission Control
//!
//! Bounds the number of simultaneously served connections. Admission is a
//! lock-free compare-and-swap on the active-connection counter; a successful
//! admission yields a [`ConnectionPermit`] that gives the slot back when it is
//! dropped, on every exit path of the owning handler (including panics).

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Bounded active-connection counter plus admission diagnostics.
#[derive(Debug)]
pub struct Admission {
    /// Ceiling on `active`
    max_connections: usize,

    /// Connections currently holding a permit
    active: AtomicUsize,

    /// Connections admitted so far
    handled: AtomicU64,

    /// Connections rejected because the ceiling was reached
    discarded: AtomicU64,
}

impl Admission {
    pub fn new(max_connections: usize) -> Self {
        Self {
            max_connections,
            active: AtomicUsize::new(0),
            handled: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Tries to take a connection slot.
    ///
    /// Returns `None` (and counts a discard) when the ceiling is reached.
    pub fn try_admit(self: &Arc<Self>) -> Option<ConnectionPermit> {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.max_connections {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                return None;
            }

            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        self.handled.fetch_add(1, Ordering::Relaxed);
        Some(ConnectionPermit {
            admission: Arc::clone(self),
        })
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Number of connections currently admitted.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Total number of admitted connections.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Total number of rejected connections.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

/// An admitted connection's slot. Dropping it releases the slot exactly once.
#[derive(Debug)]
pub struct ConnectionPermit {
    admission: Arc<Admission>,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        self.admission.active.fetch_sub(1, Ordering::AcqRel);
    }
}
