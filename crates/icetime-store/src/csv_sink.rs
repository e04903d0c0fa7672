//! CSV-backed PlaySink implementation
//!
//! Layout: a single header row (`COLUMNS`) followed by one line per row.
//! Opening a sink over an existing file validates its header and loads the
//! `natural_key` and `game_id` columns once; appends then consult that cache
//! instead of re-reading the file. The header is only written when the file
//! is new or empty.

use std::collections::{BTreeSet, HashSet};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::row::{PlayRow, COLUMNS};
use crate::sink::{AppendOutcome, PlaySink};
use crate::Result;

/// Flat-file sink writing the dataset as CSV.
pub struct CsvPlaySink {
    path: PathBuf,
    // Also serializes appends from concurrent games.
    persisted: Mutex<Persisted>,
}

/// Keys and games already in the file, loaded at open and kept current.
#[derive(Default)]
struct Persisted {
    keys: HashSet<String>,
    games: BTreeSet<u64>,
}

impl CsvPlaySink {
    /// Create a sink writing to `path`. Parent directories are created on demand.
    ///
    /// Fails with [`StoreError::ColumnMismatch`] when `path` already holds
    /// a CSV with a different header.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let persisted = read_persisted(&path)?;
        debug!(
            path = %path.display(),
            keys = persisted.keys.len(),
            games = persisted.games.len(),
            "Opened CSV sink"
        );
        Ok(Self {
            path,
            persisted: Mutex::new(persisted),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn has_content(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

fn read_persisted(path: &Path) -> Result<Persisted> {
    let mut persisted = Persisted::default();
    if !has_content(path) {
        return Ok(persisted);
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    if headers.len() != COLUMNS.len() || headers.iter().zip(COLUMNS).any(|(a, b)| a != b) {
        return Err(StoreError::ColumnMismatch {
            destination: path.display().to_string(),
            detail: format!(
                "expected {} columns starting with '{}', found {}",
                COLUMNS.len(),
                COLUMNS[0],
                headers.len()
            ),
        });
    }

    let key_idx = COLUMNS.len() - 1;
    let game_idx = 1;
    for record in reader.records() {
        let record = record?;
        if let Some(key) = record.get(key_idx) {
            persisted.keys.insert(key.to_string());
        }
        if let Some(game_id) = record.get(game_idx).and_then(|g| g.parse::<u64>().ok()) {
            persisted.games.insert(game_id);
        }
    }
    Ok(persisted)
}

#[async_trait]
impl PlaySink for CsvPlaySink {
    async fn append(&self, rows: &[PlayRow]) -> Result<AppendOutcome> {
        let mut persisted = self
            .persisted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let write_header = !has_content(&self.path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);

        let mut outcome = AppendOutcome::default();
        let mut written_games = Vec::new();
        for row in rows {
            if persisted.keys.contains(&row.natural_key) {
                outcome.skipped_existing += 1;
                continue;
            }
            writer.serialize(row)?;
            persisted.keys.insert(row.natural_key.clone());
            written_games.push(row.game_id);
            outcome.written += 1;
        }

        // An append with nothing new still leaves a readable header behind.
        if write_header && outcome.written == 0 {
            writer.write_record(COLUMNS)?;
        }
        writer.flush()?;
        persisted.games.extend(written_games);

        debug!(
            path = %self.path.display(),
            written = outcome.written,
            skipped = outcome.skipped_existing,
            "CSV append complete"
        );
        Ok(outcome)
    }

    async fn persisted_games(&self) -> Result<BTreeSet<u64>> {
        let persisted = self
            .persisted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(persisted.games.clone())
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}
