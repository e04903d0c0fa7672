//! Error taxonomy for the correlation engine.
//!
//! Row- and field-level variants (`MalformedClock`, `UnresolvedIdentity`,
//! row-scoped `SchemaMismatch`) are recovered locally by the caller.
//! `RetrievalFailure` and document-scoped `SchemaMismatch` skip one game.
//! Nothing here is allowed to end a batch except configuration, schedule and
//! storage setup failures.

use icetime_feeds::{FeedError, FeedSource};
use icetime_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("malformed clock: {raw:?}")]
    MalformedClock { raw: String },

    #[error("unresolved identity: {name:?} ({team})")]
    UnresolvedIdentity { team: String, name: String },

    #[error("{provider} retrieval failed for game {game_id}: {source}")]
    RetrievalFailure {
        game_id: u64,
        provider: FeedSource,
        #[source]
        source: FeedError,
    },

    #[error("schedule lookup failed: {0}")]
    Schedule(#[source] FeedError),

    #[error("schema mismatch: {detail}")]
    SchemaMismatch { detail: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn schema(detail: impl Into<String>) -> Self {
        CoreError::SchemaMismatch {
            detail: detail.into(),
        }
    }
}

/// Result type for icetime-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
