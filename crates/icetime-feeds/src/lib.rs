//! icetime-feeds: external data sources for icetime
//!
//! Layer 1 of the pipeline. Retrieves the per-game documents (event feed,
//! shift chart or shift report, roster directory) and the schedule, without
//! interpreting them. Interpretation lives in `icetime-core`.
//!
//! # Architecture
//!
//! - `providers`: async trait contracts, one per source
//! - `http`: `reqwest` implementation driven by URL templates
//! - `fakes`: scripted in-memory implementation for tests
//! - `retry`: bounded retry with doubling backoff for transient failures

pub mod documents;
pub mod error;
pub mod fakes;
pub mod http;
pub mod markup;
pub mod providers;
pub mod retry;

pub use documents::{
    ChartShift, Coordinates, FeedPlayer, GameData, GameFeed, GameTeams, Goals, ParticipantRef,
    PlayAbout, PlayParticipant, PlayResult, PlayerPosition, RawPlay, RosterEntry, ShiftChart,
    ShiftDocument, TeamRef,
};
pub use error::FeedError;
pub use http::{season_and_suffix, FeedConfig, HttpFeeds};
pub use providers::{
    EventFeed, FeedSource, RosterDirectory, ScheduleSource, ShiftChartSource, ShiftDocumentSource,
};
pub use retry::{with_retry, RetryPolicy};

/// Result type for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;
