//! In-memory sink (testing and dry runs)
//!
//! `MemorySink` satisfies the `PlaySink` contract without any external
//! dependencies and lets tests inspect exactly what was appended.

use std::collections::{BTreeSet, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::row::PlayRow;
use crate::sink::{AppendOutcome, PlaySink};
use crate::Result;

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<PlayRow>,
    keys: HashSet<String>,
    appends: usize,
}

/// In-memory sink backed by a `Vec<PlayRow>` plus a natural-key index.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the sink as if a previous run had persisted `rows`.
    pub fn with_rows(rows: Vec<PlayRow>) -> Self {
        let keys = rows.iter().map(|r| r.natural_key.clone()).collect();
        Self {
            state: Mutex::new(MemoryState {
                rows,
                keys,
                appends: 0,
            }),
        }
    }

    /// Snapshot of everything persisted so far, in append order.
    pub fn rows(&self) -> Vec<PlayRow> {
        self.state.lock().unwrap().rows.clone()
    }

    /// Number of `append` calls received.
    pub fn append_calls(&self) -> usize {
        self.state.lock().unwrap().appends
    }
}

#[async_trait]
impl PlaySink for MemorySink {
    async fn append(&self, rows: &[PlayRow]) -> Result<AppendOutcome> {
        let mut state = self.state.lock().unwrap();
        state.appends += 1;

        let mut outcome = AppendOutcome::default();
        for row in rows {
            if state.keys.insert(row.natural_key.clone()) {
                state.rows.push(row.clone());
                outcome.written += 1;
            } else {
                outcome.skipped_existing += 1;
            }
        }
        Ok(outcome)
    }

    async fn persisted_games(&self) -> Result<BTreeSet<u64>> {
        let state = self.state.lock().unwrap();
        Ok(state.rows.iter().map(|r| r.game_id).collect())
    }

    fn destination(&self) -> String {
        "memory".to_string()
    }
}
