//! Sink contract for the merged dataset
//!
//! A sink receives rows one game at a time. Idempotency is the sink's
//! responsibility: rows whose natural key is already persisted are skipped,
//! so rerunning a batch over the same date range never duplicates data.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::row::PlayRow;
use crate::Result;

/// What an `append` call actually wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Rows newly persisted
    pub written: usize,
    /// Rows skipped because their natural key was already present
    pub skipped_existing: usize,
}

impl AppendOutcome {
    pub fn merge(&mut self, other: AppendOutcome) {
        self.written += other.written;
        self.skipped_existing += other.skipped_existing;
    }
}

/// Append-only destination for merged play rows.
///
/// Guarantees:
/// - `append(rows)` persists every row whose `natural_key` is not yet present.
/// - Duplicate natural keys inside one call are written once (first wins).
/// - Row order within a game is preserved.
#[async_trait]
pub trait PlaySink: Send + Sync {
    /// Append rows, skipping natural keys that are already persisted.
    async fn append(&self, rows: &[PlayRow]) -> Result<AppendOutcome>;

    /// Game ids that already have at least one persisted row.
    async fn persisted_games(&self) -> Result<BTreeSet<u64>>;

    /// Human-readable destination (file path, database URL, ...)
    fn destination(&self) -> String;
}
