//! Chunk store counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters, updated with relaxed atomics.
#[derive(Debug, Default)]
pub struct StoreStats {
    generated: AtomicU64,
    generation_time_us: AtomicU64,
    max_generation_time_us: AtomicU64,
    loaded: AtomicU64,
    conflicts: AtomicU64,
    coalesced_waits: AtomicU64,
}

/// Point-in-time copy of [`StoreStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Chunks generated and persisted by this store.
    pub generated: u64,
    /// Total generation time, microseconds.
    pub generation_time_us: u64,
    /// Slowest single generation, microseconds.
    pub max_generation_time_us: u64,
    /// Chunks served from the repository.
    pub loaded: u64,
    /// Inserts that lost to an existing record.
    pub conflicts: u64,
    /// Requests that waited on another caller's generation.
    pub coalesced_waits: u64,
}

impl StoreStats {
    pub(crate) fn record_generation(&self, duration: Duration) {
        let us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.generated.fetch_add(1, Ordering::Relaxed);
        self.generation_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_generation_time_us.fetch_max(us, Ordering::Relaxed);
    }

    pub(crate) fn record_load(&self) {
        self.loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_coalesced_wait(&self) {
        self.coalesced_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            generated: self.generated.load(Ordering::Relaxed),
            generation_time_us: self.generation_time_us.load(Ordering::Relaxed),
            max_generation_time_us: self.max_generation_time_us.load(Ordering::Relaxed),
            loaded: self.loaded.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            coalesced_waits: self.coalesced_waits.load(Ordering::Relaxed),
        }
    }
}
