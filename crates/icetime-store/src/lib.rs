//! Icetime-Store: Dataset Sinks for Merged Play Rows
//!
//! This crate is the persistence layer for icetime. It owns the fixed,
//! game-independent column schema of the merged dataset and the sinks
//! that rows are appended to.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: a stable natural key per row so reruns never duplicate data.
//!
//! ## Key Components
//!
//! - `PlayRow`: One merged output row (event + on-ice roster for both teams)
//! - `PlaySink`: Append-only sink contract with natural-key idempotency
//! - `SurrealPlaySink`: SurrealDB-backed sink (`mem://`, `surrealkv://`, `ws://`)
//! - `CsvPlaySink`: Flat-file sink with a single header row

pub mod csv_sink;
mod error;
pub mod fakes;
mod migrations;
mod row;
pub mod sink;
pub mod surreal_sink;

pub use csv_sink::CsvPlaySink;
pub use error::StoreError;
pub use row::{natural_key, PlayRow, COLUMNS};
pub use sink::{AppendOutcome, PlaySink};
pub use surreal_sink::{SurrealConfig, SurrealPlaySink};

/// Result type for icetime-store operations
pub type Result<T> = std::result::Result<T, StoreError>;
