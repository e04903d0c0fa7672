//! Fixed column schema of the merged play dataset
//!
//! Every game produces rows of exactly this shape. Absent values are
//! `None` (CSV: empty cell, SurrealDB: `NONE`), so the column count never
//! drifts between games.

use serde::{Deserialize, Serialize};

/// Column names in output order.
///
/// Matches the field order of [`PlayRow`]; CSV headers are derived from the
/// struct, and `tests` assert the two never diverge.
pub const COLUMNS: [&str; 38] = [
    "season",
    "game_id",
    "game_date",
    "event_index",
    "period",
    "period_seconds",
    "event_type",
    "event_code",
    "event_description",
    "event_detail",
    "event_team",
    "event_player_1",
    "event_player_2",
    "event_player_3",
    "coords_x",
    "coords_y",
    "home_team",
    "away_team",
    "home_skater_1",
    "home_skater_2",
    "home_skater_3",
    "home_skater_4",
    "home_skater_5",
    "home_skater_6",
    "away_skater_1",
    "away_skater_2",
    "away_skater_3",
    "away_skater_4",
    "away_skater_5",
    "away_skater_6",
    "home_goalie",
    "away_goalie",
    "home_skaters",
    "away_skaters",
    "home_goals",
    "away_goals",
    "join_key",
    "natural_key",
];

/// Build the natural key a sink uses to detect already-persisted rows.
pub fn natural_key(game_id: u64, join_key: &str) -> String {
    format!("{}-{}", game_id, join_key)
}

/// One merged row: an event plus the on-ice roster of both teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRow {
    pub season: Option<String>,
    pub game_id: u64,
    /// ISO-8601 start time of the game as reported by the feed
    pub game_date: Option<String>,
    /// Position of the play in the source feed
    pub event_index: Option<u32>,
    pub period: u32,
    pub period_seconds: u32,
    /// Display name of the event kind (e.g. "Blocked Shot")
    pub event_type: String,
    /// Short kind code used in the join key (e.g. "BLOCK")
    pub event_code: String,
    pub event_description: String,
    pub event_detail: Option<String>,
    pub event_team: Option<String>,
    pub event_player_1: Option<u64>,
    pub event_player_2: Option<u64>,
    pub event_player_3: Option<u64>,
    pub coords_x: Option<f64>,
    pub coords_y: Option<f64>,
    pub home_team: String,
    pub away_team: String,
    pub home_skater_1: Option<u64>,
    pub home_skater_2: Option<u64>,
    pub home_skater_3: Option<u64>,
    pub home_skater_4: Option<u64>,
    pub home_skater_5: Option<u64>,
    pub home_skater_6: Option<u64>,
    pub away_skater_1: Option<u64>,
    pub away_skater_2: Option<u64>,
    pub away_skater_3: Option<u64>,
    pub away_skater_4: Option<u64>,
    pub away_skater_5: Option<u64>,
    pub away_skater_6: Option<u64>,
    pub home_goalie: Option<u64>,
    pub away_goalie: Option<u64>,
    pub home_skaters: u32,
    pub away_skaters: u32,
    pub home_goals: u32,
    pub away_goals: u32,
    pub join_key: String,
    /// `{game_id}-{join_key}`; unique across the whole dataset
    pub natural_key: String,
}

impl PlayRow {
    /// Set the six home skater slots from an ordered list. Extra entries are ignored.
    pub fn set_home_skaters(&mut self, skaters: &[Option<u64>]) {
        let slot = |i: usize| skaters.get(i).copied().flatten();
        self.home_skater_1 = slot(0);
        self.home_skater_2 = slot(1);
        self.home_skater_3 = slot(2);
        self.home_skater_4 = slot(3);
        self.home_skater_5 = slot(4);
        self.home_skater_6 = slot(5);
    }

    /// Set the six away skater slots from an ordered list. Extra entries are ignored.
    pub fn set_away_skaters(&mut self, skaters: &[Option<u64>]) {
        let slot = |i: usize| skaters.get(i).copied().flatten();
        self.away_skater_1 = slot(0);
        self.away_skater_2 = slot(1);
        self.away_skater_3 = slot(2);
        self.away_skater_4 = slot(3);
        self.away_skater_5 = slot(4);
        self.away_skater_6 = slot(5);
    }

    /// Home skater slots in column order.
    pub fn home_skater_slots(&self) -> [Option<u64>; 6] {
        [
            self.home_skater_1,
            self.home_skater_2,
            self.home_skater_3,
            self.home_skater_4,
            self.home_skater_5,
            self.home_skater_6,
        ]
    }

    /// Away skater slots in column order.
    pub fn away_skater_slots(&self) -> [Option<u64>; 6] {
        [
            self.away_skater_1,
            self.away_skater_2,
            self.away_skater_3,
            self.away_skater_4,
            self.away_skater_5,
            self.away_skater_6,
        ]
    }
}
