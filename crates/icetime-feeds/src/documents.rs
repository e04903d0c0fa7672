//! Raw documents as delivered by the external sources
//!
//! Decoding is deliberately permissive: every field the feeds are known to
//! omit is optional here, and the domain layer decides what an absent field
//! means. Nothing in this module interprets clocks, names, or event kinds.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::markup;

// ---------------------------------------------------------------------------
// Event feed
// ---------------------------------------------------------------------------

/// Live game feed: game metadata plus every play in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFeed {
    pub game_pk: Option<u64>,
    #[serde(default)]
    pub game_data: GameData,
    #[serde(default)]
    pub live_data: LiveData,
}

impl GameFeed {
    /// Plays in source order.
    pub fn plays(&self) -> &[RawPlay] {
        &self.live_data.plays.all_plays
    }

    /// Ids of every dressed player whose primary position is goaltender.
    pub fn goaltender_ids(&self) -> BTreeSet<u64> {
        self.game_data
            .players
            .values()
            .filter(|p| p.is_goaltender())
            .filter_map(|p| p.id)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    pub game: Option<GameInfo>,
    pub datetime: Option<GameDateTime>,
    #[serde(default)]
    pub teams: GameTeams,
    /// Dressed players keyed `"ID<player id>"`
    #[serde(default)]
    pub players: BTreeMap<String, FeedPlayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPlayer {
    pub id: Option<u64>,
    pub full_name: Option<String>,
    pub primary_position: Option<PlayerPosition>,
}

impl FeedPlayer {
    pub fn is_goaltender(&self) -> bool {
        self.primary_position
            .as_ref()
            .and_then(|p| p.code.as_deref())
            .is_some_and(|code| code.trim().eq_ignore_ascii_case("G"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerPosition {
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub season: Option<String>,
    #[serde(rename = "type")]
    pub game_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDateTime {
    pub date_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameTeams {
    #[serde(default)]
    pub home: TeamRef,
    #[serde(default)]
    pub away: TeamRef,
}

/// Team reference; newer payloads carry `triCode`, older ones `abbreviation`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRef {
    pub tri_code: Option<String>,
    pub abbreviation: Option<String>,
}

impl TeamRef {
    pub fn code(&self) -> Option<&str> {
        self.tri_code
            .as_deref()
            .or(self.abbreviation.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveData {
    #[serde(default)]
    pub plays: Plays,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plays {
    #[serde(default)]
    pub all_plays: Vec<RawPlay>,
}

/// One play exactly as the feed reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlay {
    #[serde(default)]
    pub result: PlayResult,
    #[serde(default)]
    pub about: PlayAbout,
    #[serde(default)]
    pub coordinates: Coordinates,
    pub team: Option<TeamRef>,
    #[serde(default)]
    pub players: Vec<PlayParticipant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResult {
    /// Display name, e.g. "Blocked Shot"
    pub event: Option<String>,
    /// Type id, e.g. "BLOCKED_SHOT"
    pub event_type_id: Option<String>,
    pub description: Option<String>,
    pub secondary_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayAbout {
    pub event_idx: Option<u32>,
    pub period: Option<u32>,
    /// Elapsed time in the period, "mm:ss"
    pub period_time: Option<String>,
    #[serde(default)]
    pub goals: Goals,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    #[serde(default)]
    pub home: u32,
    #[serde(default)]
    pub away: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayParticipant {
    #[serde(default)]
    pub player: ParticipantRef,
    pub player_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRef {
    pub id: Option<u64>,
    pub full_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Shift document
// ---------------------------------------------------------------------------

/// Raw shift report markup for one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftDocument {
    pub game_id: u64,
    pub markup: String,
}

impl ShiftDocument {
    pub fn new(game_id: u64, markup: impl Into<String>) -> Self {
        Self {
            game_id,
            markup: markup.into(),
        }
    }

    /// Text of every cell carrying `cell_class`, in source order.
    pub fn cells(&self, cell_class: &str) -> Vec<String> {
        markup::extract_cells(&self.markup, cell_class)
    }
}

// ---------------------------------------------------------------------------
// Roster directory
// ---------------------------------------------------------------------------

/// One player known to the roster directory for a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RosterEntry {
    pub team: String,
    pub first_name: String,
    pub last_name: String,
    pub player_id: u64,
}

impl RosterEntry {
    pub fn new(team: &str, first_name: &str, last_name: &str, player_id: u64) -> Self {
        Self {
            team: team.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            player_id,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ---------------------------------------------------------------------------
// Shift chart
// ---------------------------------------------------------------------------

/// Shift chart for one game: every shift as a separate timed entry.
///
/// The same document doubles as the roster directory, since each entry
/// names the player together with the player id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftChart {
    pub game_id: u64,
    pub shifts: Vec<ChartShift>,
}

/// One entry of the shift chart, fields exactly as delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartShift {
    pub team_abbrev: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub player_id: Option<u64>,
    pub period: Option<u32>,
    /// Elapsed time in the period, "mm:ss"
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl ChartShift {
    pub fn full_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{} {}", first.trim(), last.trim())),
            _ => None,
        }
    }

    fn roster_entry(&self) -> Option<RosterEntry> {
        Some(RosterEntry {
            team: self.team_abbrev.clone()?,
            first_name: self.first_name.clone()?,
            last_name: self.last_name.clone()?,
            player_id: self.player_id?,
        })
    }
}

impl ShiftChart {
    pub fn new(game_id: u64, shifts: Vec<ChartShift>) -> Self {
        Self { game_id, shifts }
    }

    /// Distinct roster entries in first-seen order; incomplete entries are dropped.
    pub fn roster(&self) -> Vec<RosterEntry> {
        let mut seen = HashSet::new();
        self.shifts
            .iter()
            .filter_map(ChartShift::roster_entry)
            .filter(|e| seen.insert(e.clone()))
            .collect()
    }
}

/// Wire shape of the shift-chart endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ShiftChartResponse {
    #[serde(default)]
    pub data: Vec<ChartShift>,
}

impl ShiftChartResponse {
    pub fn into_chart(self, game_id: u64) -> ShiftChart {
        ShiftChart::new(game_id, self.data)
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ScheduleResponse {
    #[serde(default)]
    pub dates: Vec<ScheduleDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ScheduleDate {
    #[serde(default)]
    pub games: Vec<ScheduledGame>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScheduledGame {
    pub game_pk: u64,
    pub game_type: Option<String>,
}

impl ScheduleResponse {
    /// Game ids of the given type, in schedule order.
    pub fn game_ids(&self, game_type: &str) -> Vec<u64> {
        self.dates
            .iter()
            .flat_map(|d| d.games.iter())
            .filter(|g| g.game_type.as_deref() == Some(game_type))
            .map(|g| g.game_pk)
            .collect()
    }
}
