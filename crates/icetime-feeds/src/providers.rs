//! Provider contracts for the external data sources
//!
//! Each source is implemented once and injected into the pipeline:
//! - `EventFeed`: discrete in-game events for one game
//! - `ShiftChartSource`: timed shift entries for one game
//! - `ShiftDocumentSource`: raw shift report markup for one game
//! - `RosterDirectory`: (team, name, player id) entries for one game
//! - `ScheduleSource`: game ids within a date range
//!
//! All traits are async and transport-agnostic. In-memory fakes are
//! provided for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::documents::{GameFeed, RosterEntry, ShiftChart, ShiftDocument};
use crate::Result;

/// Which external source a request went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedSource {
    EventFeed,
    ShiftChart,
    ShiftDocument,
    Roster,
    Schedule,
}

impl std::fmt::Display for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeedSource::EventFeed => "event feed",
            FeedSource::ShiftChart => "shift chart",
            FeedSource::ShiftDocument => "shift document",
            FeedSource::Roster => "roster directory",
            FeedSource::Schedule => "schedule",
        };
        write!(f, "{}", name)
    }
}

/// Source of the discrete event feed.
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Fetch the full feed for a game. Fails with `NotFound` or a transient error.
    async fn fetch_events(&self, game_id: u64) -> Result<GameFeed>;
}

/// Source of the shift chart.
#[async_trait]
pub trait ShiftChartSource: Send + Sync {
    async fn fetch_shift_chart(&self, game_id: u64) -> Result<ShiftChart>;
}

/// Source of the raw shift report.
#[async_trait]
pub trait ShiftDocumentSource: Send + Sync {
    /// Fetch the shift report markup for a game.
    async fn fetch_shift_document(&self, game_id: u64) -> Result<ShiftDocument>;
}

/// Directory used for display-name to player-id resolution.
#[async_trait]
pub trait RosterDirectory: Send + Sync {
    /// Players known for a game (both teams).
    async fn fetch_roster(&self, game_id: u64) -> Result<Vec<RosterEntry>>;
}

/// Schedule lookup for date-range batches.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Game ids of `game_type` between `start` and `end` inclusive, in schedule order.
    async fn game_ids(&self, start: NaiveDate, end: NaiveDate, game_type: &str)
        -> Result<Vec<u64>>;
}
