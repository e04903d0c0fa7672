//! In-memory provider implementations for testing
//!
//! `ScriptedFeeds` serves pre-loaded documents and can be told to fail a
//! given (source, game) pair a fixed number of times, or forever, with any
//! `FeedError`. Call counts are recorded per pair so retry behaviour can be
//! asserted.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::documents::{GameFeed, RosterEntry, ShiftChart, ShiftDocument};
use crate::error::FeedError;
use crate::providers::{
    EventFeed, FeedSource, RosterDirectory, ScheduleSource, ShiftChartSource, ShiftDocumentSource,
};
use crate::Result;

#[derive(Debug, Clone)]
struct ScriptedFailure {
    /// `None` fails every call
    remaining: Option<u32>,
    error: FeedError,
}

#[derive(Debug, Default)]
struct State {
    events: HashMap<u64, GameFeed>,
    charts: HashMap<u64, ShiftChart>,
    shifts: HashMap<u64, String>,
    rosters: HashMap<u64, Vec<RosterEntry>>,
    schedule: BTreeMap<NaiveDate, Vec<(u64, String)>>,
    failures: HashMap<(FeedSource, u64), ScriptedFailure>,
    calls: HashMap<(FeedSource, u64), u32>,
}

/// Pre-loaded documents for every source, with scripted failures.
#[derive(Debug, Default)]
pub struct ScriptedFeeds {
    state: Mutex<State>,
}

impl ScriptedFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(self, game_id: u64, feed: GameFeed) -> Self {
        self.state.lock().unwrap().events.insert(game_id, feed);
        self
    }

    pub fn with_shift_chart(self, chart: ShiftChart) -> Self {
        self.state.lock().unwrap().charts.insert(chart.game_id, chart);
        self
    }

    pub fn with_shift_markup(self, game_id: u64, markup: impl Into<String>) -> Self {
        self.state
            .lock()
            .unwrap()
            .shifts
            .insert(game_id, markup.into());
        self
    }

    pub fn with_roster(self, game_id: u64, roster: Vec<RosterEntry>) -> Self {
        self.state.lock().unwrap().rosters.insert(game_id, roster);
        self
    }

    pub fn with_scheduled_game(self, date: NaiveDate, game_id: u64, game_type: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .schedule
            .entry(date)
            .or_default()
            .push((game_id, game_type.to_string()));
        self
    }

    /// Fail the next `times` calls for (`source`, `game_id`) with `error`.
    pub fn failing(self, source: FeedSource, game_id: u64, times: u32, error: FeedError) -> Self {
        self.state.lock().unwrap().failures.insert(
            (source, game_id),
            ScriptedFailure {
                remaining: Some(times),
                error,
            },
        );
        self
    }

    /// Fail every call for (`source`, `game_id`) with `error`.
    pub fn always_failing(self, source: FeedSource, game_id: u64, error: FeedError) -> Self {
        self.state.lock().unwrap().failures.insert(
            (source, game_id),
            ScriptedFailure {
                remaining: None,
                error,
            },
        );
        self
    }

    /// Number of calls made for (`source`, `game_id`), failed ones included.
    pub fn calls(&self, source: FeedSource, game_id: u64) -> u32 {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&(source, game_id))
            .copied()
            .unwrap_or(0)
    }

    /// Record the call and return the scripted error, if one is due.
    fn intercept(&self, source: FeedSource, game_id: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry((source, game_id)).or_insert(0) += 1;

        let Some(failure) = state.failures.get_mut(&(source, game_id)) else {
            return Ok(());
        };
        match failure.remaining {
            None => Err(failure.error.clone()),
            Some(0) => Ok(()),
            Some(n) => {
                failure.remaining = Some(n - 1);
                Err(failure.error.clone())
            }
        }
    }

    fn not_found(source: FeedSource, game_id: u64) -> FeedError {
        FeedError::NotFound {
            url: format!("fake://{}/{}", source.to_string().replace(' ', "-"), game_id),
        }
    }
}

#[async_trait]
impl EventFeed for ScriptedFeeds {
    async fn fetch_events(&self, game_id: u64) -> Result<GameFeed> {
        self.intercept(FeedSource::EventFeed, game_id)?;
        self.state
            .lock()
            .unwrap()
            .events
            .get(&game_id)
            .cloned()
            .ok_or_else(|| Self::not_found(FeedSource::EventFeed, game_id))
    }
}

#[async_trait]
impl ShiftChartSource for ScriptedFeeds {
    async fn fetch_shift_chart(&self, game_id: u64) -> Result<ShiftChart> {
        self.intercept(FeedSource::ShiftChart, game_id)?;
        self.state
            .lock()
            .unwrap()
            .charts
            .get(&game_id)
            .cloned()
            .ok_or_else(|| Self::not_found(FeedSource::ShiftChart, game_id))
    }
}

#[async_trait]
impl ShiftDocumentSource for ScriptedFeeds {
    async fn fetch_shift_document(&self, game_id: u64) -> Result<ShiftDocument> {
        self.intercept(FeedSource::ShiftDocument, game_id)?;
        self.state
            .lock()
            .unwrap()
            .shifts
            .get(&game_id)
            .map(|markup| ShiftDocument::new(game_id, markup.clone()))
            .ok_or_else(|| Self::not_found(FeedSource::ShiftDocument, game_id))
    }
}

#[async_trait]
impl RosterDirectory for ScriptedFeeds {
    async fn fetch_roster(&self, game_id: u64) -> Result<Vec<RosterEntry>> {
        self.intercept(FeedSource::Roster, game_id)?;
        // A game with no loaded roster resolves nothing rather than failing.
        Ok(self
            .state
            .lock()
            .unwrap()
            .rosters
            .get(&game_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ScheduleSource for ScriptedFeeds {
    async fn game_ids(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        game_type: &str,
    ) -> Result<Vec<u64>> {
        self.intercept(FeedSource::Schedule, 0)?;
        if end < start {
            return Err(FeedError::InvalidRequest(format!(
                "schedule range ends ({end}) before it starts ({start})"
            )));
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .schedule
            .range(start..=end)
            .flat_map(|(_, games)| games.iter())
            .filter(|(_, kind)| kind == game_type)
            .map(|(id, _)| *id)
            .collect())
    }
}
