//! Process-wide counters.
//!
//! Incremented silently where things happen; [`Metrics::flush`] emits all
//! values as one `info!` event at the end of a batch.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    games_processed: AtomicU64,
    games_skipped: AtomicU64,
    events_emitted: AtomicU64,
    rows_skipped: AtomicU64,
    identity_misses: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub games_processed: u64,
    pub games_skipped: u64,
    pub events_emitted: u64,
    pub rows_skipped: u64,
    pub identity_misses: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            games_processed: AtomicU64::new(0),
            games_skipped: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
            rows_skipped: AtomicU64::new(0),
            identity_misses: AtomicU64::new(0),
        }
    }

    pub fn inc_games_processed(&self) {
        self.games_processed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "games_processed", "counter incremented");
    }

    pub fn inc_games_skipped(&self) {
        self.games_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "games_skipped", "counter incremented");
    }

    pub fn add_events_emitted(&self, n: u64) {
        self.events_emitted.fetch_add(n, Ordering::Relaxed);
    }

    /// Event and shift rows dropped for any reason.
    pub fn add_rows_skipped(&self, n: u64) {
        self.rows_skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_identity_misses(&self, n: u64) {
        self.identity_misses.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            games_processed: self.games_processed.load(Ordering::Relaxed),
            games_skipped: self.games_skipped.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            identity_misses: self.identity_misses.load(Ordering::Relaxed),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            games_processed = s.games_processed,
            games_skipped = s.games_skipped,
            events_emitted = s.events_emitted,
            rows_skipped = s.rows_skipped,
            identity_misses = s.identity_misses,
        );
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.games_processed.store(0, Ordering::Relaxed);
        self.games_skipped.store(0, Ordering::Relaxed);
        self.events_emitted.store(0, Ordering::Relaxed);
        self.rows_skipped.store(0, Ordering::Relaxed);
        self.identity_misses.store(0, Ordering::Relaxed);
    }
}
