//! Shared world-size counters for the health endpoint.
//!
//! The engine task is the only writer; the health server reads them from its
//! own thread. Relaxed ordering is enough for a diagnostic count.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Player/object counts published by the engine after every mutation.
#[derive(Debug, Default)]
pub struct WorldCounters {
    players: AtomicUsize,
    objects: AtomicUsize,
}

impl WorldCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the current counts.
    pub fn publish(&self, players: usize, objects: usize) {
        self.players.store(players, Ordering::Relaxed);
        self.objects.store(objects, Ordering::Relaxed);
    }

    /// Current player count.
    pub fn players(&self) -> usize {
        self.players.load(Ordering::Relaxed)
    }

    /// Current object count.
    pub fn objects(&self) -> usize {
        self.objects.load(Ordering::Relaxed)
    }
}
