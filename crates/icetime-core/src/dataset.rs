//! Dataset assembly
//!
//! Flattens merged records into the fixed-column [`PlayRow`] schema and hands
//! them to the sink one game at a time. A game is fully appended before the
//! next one starts, so a later failure never touches rows already persisted.

use std::sync::Arc;

use icetime_feeds::GameFeed;
use icetime_store::{natural_key, AppendOutcome, PlayRow, PlaySink};
use tracing::debug;

use crate::correlate::MergedRecord;
use crate::error::Result;

/// Per-game values copied onto every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameContext {
    pub game_id: u64,
    pub season: Option<String>,
    pub game_date: Option<String>,
    pub home_team: String,
    pub away_team: String,
}

impl GameContext {
    /// Read game metadata from the feed header. `None` when either team code
    /// is missing, since correlation cannot pick sides without it.
    pub fn from_feed(game_id: u64, feed: &GameFeed) -> Option<Self> {
        let teams = &feed.game_data.teams;
        Some(Self {
            game_id,
            season: feed.game_data.game.as_ref().and_then(|g| g.season.clone()),
            game_date: feed
                .game_data
                .datetime
                .as_ref()
                .and_then(|d| d.date_time.clone()),
            home_team: teams.home.code()?.to_uppercase(),
            away_team: teams.away.code()?.to_uppercase(),
        })
    }
}

/// Flatten one merged record.
pub fn to_row(ctx: &GameContext, record: &MergedRecord) -> PlayRow {
    let event = &record.event;
    let join_key = event.join_key();
    let player = |i: usize| event.player_refs.get(i).copied().flatten();

    let mut row = PlayRow {
        season: ctx.season.clone(),
        game_id: ctx.game_id,
        game_date: ctx.game_date.clone(),
        event_index: Some(event.source_index),
        period: event.period(),
        period_seconds: event.elapsed_seconds(),
        event_type: event.kind.display_name().to_string(),
        event_code: event.kind.code().to_string(),
        event_description: event.description.clone(),
        event_detail: event.detail.clone(),
        event_team: event.team.clone(),
        event_player_1: player(0),
        event_player_2: player(1),
        event_player_3: player(2),
        coords_x: event.coordinates.x,
        coords_y: event.coordinates.y,
        home_team: ctx.home_team.clone(),
        away_team: ctx.away_team.clone(),
        home_skater_1: None,
        home_skater_2: None,
        home_skater_3: None,
        home_skater_4: None,
        home_skater_5: None,
        home_skater_6: None,
        away_skater_1: None,
        away_skater_2: None,
        away_skater_3: None,
        away_skater_4: None,
        away_skater_5: None,
        away_skater_6: None,
        home_goalie: record.home.goaltender_id(),
        away_goalie: record.away.goaltender_id(),
        home_skaters: record.home.skater_count,
        away_skaters: record.away.skater_count,
        home_goals: event.running_score.home,
        away_goals: event.running_score.away,
        natural_key: natural_key(ctx.game_id, &join_key),
        join_key,
    };
    row.set_home_skaters(&record.home.skater_ids());
    row.set_away_skaters(&record.away.skater_ids());
    row
}

/// Rows accumulated in memory, in game order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<PlayRow>,
    games: Vec<u64>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every record of one game; returns the number of rows added.
    pub fn append_game(&mut self, ctx: &GameContext, records: &[MergedRecord]) -> usize {
        self.rows.extend(records.iter().map(|r| to_row(ctx, r)));
        self.games.push(ctx.game_id);
        records.len()
    }

    pub fn rows(&self) -> &[PlayRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PlayRow> {
        self.rows
    }

    pub fn games(&self) -> &[u64] {
        &self.games
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Streams each game's rows to a sink as soon as the game is complete.
pub struct DatasetAssembler {
    sink: Arc<dyn PlaySink>,
    totals: AppendOutcome,
    games: usize,
}

impl DatasetAssembler {
    pub fn new(sink: Arc<dyn PlaySink>) -> Self {
        Self {
            sink,
            totals: AppendOutcome::default(),
            games: 0,
        }
    }

    /// Flatten and append one game's records.
    pub async fn append_game(
        &mut self,
        ctx: &GameContext,
        records: &[MergedRecord],
    ) -> Result<AppendOutcome> {
        let rows: Vec<PlayRow> = records.iter().map(|r| to_row(ctx, r)).collect();
        let outcome = self.sink.append(&rows).await?;
        debug!(
            game_id = ctx.game_id,
            written = outcome.written,
            skipped_existing = outcome.skipped_existing,
            destination = %self.sink.destination(),
            "Game appended"
        );
        self.totals.merge(outcome);
        self.games += 1;
        Ok(outcome)
    }

    /// Rows written and skipped across every appended game.
    pub fn totals(&self) -> AppendOutcome {
        self.totals
    }

    pub fn games_appended(&self) -> usize {
        self.games
    }

    pub fn destination(&self) -> String {
        self.sink.destination()
    }
}
