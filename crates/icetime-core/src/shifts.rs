//! Shift interval table
//!
//! Intervals come from one of two documents:
//!
//! - the shift chart, one timed entry per shift carrying the player id
//!   ([`ShiftTable::from_chart`])
//! - a shift report, a flat sequence of cells in which every logical row
//!   spans a fixed number of cells ([`ShiftTable::from_document`])
//!
//! For the report, [`ShiftRowSchema`] makes the fixed width explicit and
//! [`split_records`] validates it before any row is interpreted. With either
//! document a row that does not fit is dropped on its own, and a document
//! where too many rows are dropped is rejected as a whole.
//!
//! Intervals are half-open: a player is on ice at `second` iff
//! `start_seconds <= second < end_seconds`.

use std::collections::{BTreeMap, BTreeSet};

use icetime_feeds::{ChartShift, ShiftChart, ShiftDocument};
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::error::{CoreError, Result};
use crate::identity::{IdentityMap, PlayerId, PlayerLabel, PlayerRef};

/// Layout of one logical shift row (`[shift_schema]` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftRowSchema {
    /// CSS class carried by every data cell
    pub cell_class: String,
    /// Cells per logical row
    pub record_width: usize,
    pub shift_number_col: usize,
    pub team_col: usize,
    pub player_col: usize,
    pub period_col: usize,
    pub start_col: usize,
    pub end_col: usize,
    /// Label substring marking a goaltender
    pub goalie_marker: String,
    /// Share of dropped rows above which the whole document is rejected
    pub max_bad_row_ratio: f64,
}

impl Default for ShiftRowSchema {
    fn default() -> Self {
        Self {
            cell_class: "bborder".to_string(),
            record_width: 6,
            shift_number_col: 0,
            team_col: 1,
            player_col: 2,
            period_col: 3,
            start_col: 4,
            end_col: 5,
            goalie_marker: "Goalie".to_string(),
            max_bad_row_ratio: 0.5,
        }
    }
}

impl ShiftRowSchema {
    pub fn validate(&self) -> Result<()> {
        if self.record_width == 0 {
            return Err(CoreError::Config(
                "shift_schema.record_width must be at least 1".to_string(),
            ));
        }
        let columns = [
            ("shift_number_col", self.shift_number_col),
            ("team_col", self.team_col),
            ("player_col", self.player_col),
            ("period_col", self.period_col),
            ("start_col", self.start_col),
            ("end_col", self.end_col),
        ];
        for (name, col) in columns {
            if col >= self.record_width {
                return Err(CoreError::Config(format!(
                    "shift_schema.{name} = {col} is outside record_width {}",
                    self.record_width
                )));
            }
        }
        let distinct: BTreeSet<usize> = columns.iter().map(|(_, c)| *c).collect();
        if distinct.len() != columns.len() {
            return Err(CoreError::Config(
                "shift_schema column indices must be distinct".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_bad_row_ratio) {
            return Err(CoreError::Config(
                "shift_schema.max_bad_row_ratio must be within 0.0..=1.0".to_string(),
            ));
        }
        if self.cell_class.trim().is_empty() {
            return Err(CoreError::Config(
                "shift_schema.cell_class must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One logical row: `record_width` cells in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawShiftRow {
    /// Zero-based row position in the document
    pub index: usize,
    pub cells: Vec<String>,
}

impl RawShiftRow {
    fn cell(&self, col: usize) -> &str {
        self.cells.get(col).map(String::as_str).unwrap_or_default()
    }
}

/// Cells of a document grouped into rows.
#[derive(Debug, Default)]
pub struct ShiftRecords {
    pub rows: Vec<RawShiftRow>,
    /// Cells left over after the last complete row
    pub trailing_cells: usize,
}

/// Group extracted cells into fixed-width rows.
pub fn split_records(cells: Vec<String>, schema: &ShiftRowSchema) -> ShiftRecords {
    let width = schema.record_width.max(1);
    let trailing_cells = cells.len() % width;
    let mut rows = Vec::with_capacity(cells.len() / width);
    let mut iter = cells.into_iter();

    for index in 0.. {
        let cells: Vec<String> = iter.by_ref().take(width).collect();
        if cells.len() < width {
            break;
        }
        rows.push(RawShiftRow { index, cells });
    }

    ShiftRecords {
        rows,
        trailing_cells,
    }
}

/// One player's continuous presence on ice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftInterval {
    pub player: PlayerRef,
    pub team: String,
    pub period: u32,
    pub start_seconds: u32,
    /// Exclusive
    pub end_seconds: u32,
    pub is_goaltender: bool,
}

impl ShiftInterval {
    pub fn contains(&self, period: u32, second: u32) -> bool {
        self.period == period && self.start_seconds <= second && second < self.end_seconds
    }
}

/// A row that was dropped while building the table.
#[derive(Debug)]
pub struct DroppedRow {
    pub index: usize,
    pub reason: CoreError,
}

/// Two intervals of the same player that overlap within a period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftOverlap {
    pub team: String,
    pub player: PlayerRef,
    pub period: u32,
    pub first: (u32, u32),
    pub second: (u32, u32),
}

/// Result of [`ShiftTable::build`].
#[derive(Debug)]
pub struct ShiftBuild {
    pub table: ShiftTable,
    pub dropped: Vec<DroppedRow>,
    /// Distinct `(team, name)` pairs that did not resolve
    pub unresolved: BTreeSet<(String, String)>,
    pub overlaps: Vec<ShiftOverlap>,
}

/// On-ice roster of one team at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnIce {
    pub goaltender: Option<PlayerRef>,
    /// Ascending resolved id, then unresolved names
    pub skaters: Vec<PlayerRef>,
    pub skater_count: usize,
    /// Active goaltender intervals beyond the first
    pub extra_goaltenders: usize,
}

impl OnIce {
    pub fn is_empty(&self) -> bool {
        self.goaltender.is_none() && self.skaters.is_empty()
    }
}

/// Queryable intervals for every team of one game.
#[derive(Debug, Clone, Default)]
pub struct ShiftTable {
    by_team_period: BTreeMap<(String, u32), Vec<ShiftInterval>>,
}

impl ShiftTable {
    pub fn from_intervals(intervals: impl IntoIterator<Item = ShiftInterval>) -> Self {
        let mut by_team_period: BTreeMap<(String, u32), Vec<ShiftInterval>> = BTreeMap::new();
        for interval in intervals {
            by_team_period
                .entry((interval.team.clone(), interval.period))
                .or_default()
                .push(interval);
        }
        Self { by_team_period }
    }

    /// Parse a shift document into a table. Fails with `SchemaMismatch` only
    /// when the document as a whole does not fit the schema.
    pub fn from_document(
        document: &ShiftDocument,
        schema: &ShiftRowSchema,
        identities: &IdentityMap,
    ) -> Result<ShiftBuild> {
        let records = split_records(document.cells(&schema.cell_class), schema);
        Self::build(records, schema, identities)
    }

    /// Interpret raw rows. Rows that fail validation are dropped; if the
    /// dropped share exceeds `max_bad_row_ratio` the document is rejected.
    pub fn build(
        records: ShiftRecords,
        schema: &ShiftRowSchema,
        identities: &IdentityMap,
    ) -> Result<ShiftBuild> {
        let mut intervals = Vec::with_capacity(records.rows.len());
        let mut dropped = Vec::new();
        let mut unresolved = BTreeSet::new();

        for row in &records.rows {
            match parse_row(row, schema, identities) {
                Ok(interval) => {
                    if let PlayerRef::Unresolved(name) = &interval.player {
                        unresolved.insert((interval.team.clone(), name.clone()));
                    }
                    intervals.push(interval);
                }
                Err(reason) => dropped.push(DroppedRow {
                    index: row.index,
                    reason,
                }),
            }
        }

        let partial = usize::from(records.trailing_cells > 0);
        if partial > 0 {
            dropped.push(DroppedRow {
                index: records.rows.len(),
                reason: CoreError::schema(format!(
                    "{} trailing cells do not form a {}-cell row",
                    records.trailing_cells, schema.record_width
                )),
            });
        }

        let total = records.rows.len() + partial;
        if total == 0 {
            return Err(CoreError::schema(format!(
                "no cells with class {:?} found",
                schema.cell_class
            )));
        }
        let ratio = dropped.len() as f64 / total as f64;
        if intervals.is_empty() || ratio > schema.max_bad_row_ratio {
            return Err(CoreError::schema(format!(
                "{} of {} shift rows do not fit the {}-cell layout",
                dropped.len(),
                total,
                schema.record_width
            )));
        }

        Ok(Self::finish(intervals, dropped, unresolved))
    }

    /// Build the table from a shift chart. Entries carry the player id, so
    /// the name is consulted only for a manual override or when the id is
    /// missing. Goaltenders are the players listed in `goaltenders`.
    pub fn from_chart(
        chart: &ShiftChart,
        goaltenders: &BTreeSet<PlayerId>,
        identities: &IdentityMap,
        max_bad_row_ratio: f64,
    ) -> Result<ShiftBuild> {
        if chart.shifts.is_empty() {
            return Err(CoreError::schema(format!(
                "shift chart for game {} has no entries",
                chart.game_id
            )));
        }

        let mut intervals = Vec::with_capacity(chart.shifts.len());
        let mut dropped = Vec::new();
        let mut unresolved = BTreeSet::new();

        for (index, entry) in chart.shifts.iter().enumerate() {
            match parse_chart_shift(index, entry, goaltenders, identities) {
                Ok(Some(interval)) => {
                    if let PlayerRef::Unresolved(name) = &interval.player {
                        unresolved.insert((interval.team.clone(), name.clone()));
                    }
                    intervals.push(interval);
                }
                Ok(None) => {}
                Err(reason) => dropped.push(DroppedRow { index, reason }),
            }
        }

        let total = chart.shifts.len();
        let ratio = dropped.len() as f64 / total as f64;
        if intervals.is_empty() || ratio > max_bad_row_ratio {
            return Err(CoreError::schema(format!(
                "{} of {} shift chart entries are unusable",
                dropped.len(),
                total
            )));
        }

        Ok(Self::finish(intervals, dropped, unresolved))
    }

    fn finish(
        intervals: Vec<ShiftInterval>,
        dropped: Vec<DroppedRow>,
        unresolved: BTreeSet<(String, String)>,
    ) -> ShiftBuild {
        let table = Self::from_intervals(intervals);
        let overlaps = table.overlaps();
        ShiftBuild {
            table,
            dropped,
            unresolved,
            overlaps,
        }
    }

    pub fn len(&self) -> usize {
        self.by_team_period.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Teams present in the table.
    pub fn teams(&self) -> BTreeSet<&str> {
        self.by_team_period.keys().map(|(t, _)| t.as_str()).collect()
    }

    /// Who is on ice for `team` at `second` of `period`.
    pub fn players_on_ice(&self, team: &str, period: u32, second: u32) -> OnIce {
        let Some(intervals) = self.by_team_period.get(&(team.to_string(), period)) else {
            return OnIce::default();
        };

        let mut goaltenders = BTreeSet::new();
        let mut skaters = BTreeSet::new();
        for interval in intervals.iter().filter(|i| i.contains(period, second)) {
            if interval.is_goaltender {
                goaltenders.insert(interval.player.clone());
            } else {
                skaters.insert(interval.player.clone());
            }
        }

        let extra_goaltenders = goaltenders.len().saturating_sub(1);
        let skaters: Vec<PlayerRef> = skaters.into_iter().collect();
        OnIce {
            goaltender: goaltenders.into_iter().next(),
            skater_count: skaters.len(),
            skaters,
            extra_goaltenders,
        }
    }

    /// Same-player intervals that overlap within a period.
    pub fn overlaps(&self) -> Vec<ShiftOverlap> {
        let mut found = Vec::new();
        for ((team, period), intervals) in &self.by_team_period {
            let mut by_player: BTreeMap<&PlayerRef, Vec<(u32, u32)>> = BTreeMap::new();
            for i in intervals {
                by_player
                    .entry(&i.player)
                    .or_default()
                    .push((i.start_seconds, i.end_seconds));
            }
            for (player, mut spans) in by_player {
                spans.sort_unstable();
                for pair in spans.windows(2) {
                    if pair[1].0 < pair[0].1 {
                        found.push(ShiftOverlap {
                            team: team.clone(),
                            player: player.clone(),
                            period: *period,
                            first: pair[0],
                            second: pair[1],
                        });
                    }
                }
            }
        }
        found
    }
}

fn parse_row(
    row: &RawShiftRow,
    schema: &ShiftRowSchema,
    identities: &IdentityMap,
) -> Result<ShiftInterval> {
    let mismatch = |what: &str, value: &str| {
        CoreError::schema(format!("shift row {}: {what} {value:?}", row.index))
    };

    let shift_number = row.cell(schema.shift_number_col);
    if shift_number.is_empty() || !shift_number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(mismatch("shift number is not numeric:", shift_number));
    }

    let team = row.cell(schema.team_col).trim().to_uppercase();
    if team.is_empty() || team.chars().any(char::is_whitespace) {
        return Err(mismatch("team is not an abbreviation:", team.as_str()));
    }

    let raw_period = row.cell(schema.period_col);
    let period = raw_period
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| mismatch("period is not a positive integer:", raw_period))?;

    let start_seconds = clock::normalize(elapsed_part(row.cell(schema.start_col)))?;
    let end_seconds = clock::normalize(elapsed_part(row.cell(schema.end_col)))?;
    if start_seconds >= end_seconds {
        return Err(mismatch(
            "shift does not end after it starts:",
            format!("{start_seconds}..{end_seconds}").as_str(),
        ));
    }

    let label = PlayerLabel::parse(row.cell(schema.player_col), &schema.goalie_marker);
    if label.name.is_empty() {
        return Err(mismatch("player label has no name:", row.cell(schema.player_col)));
    }

    Ok(ShiftInterval {
        player: identities.player_ref(&team, &label.name),
        team,
        period,
        start_seconds,
        end_seconds,
        is_goaltender: label.is_goaltender,
    })
}

/// `Ok(None)` for zero-length entries: the chart also lists goals as
/// entries that start and end on the same second.
fn parse_chart_shift(
    index: usize,
    entry: &ChartShift,
    goaltenders: &BTreeSet<PlayerId>,
    identities: &IdentityMap,
) -> Result<Option<ShiftInterval>> {
    let mismatch = |what: &str| CoreError::schema(format!("shift chart entry {index}: {what}"));

    let team = entry
        .team_abbrev
        .as_deref()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| mismatch("no team"))?;
    let period = entry
        .period
        .filter(|p| *p > 0)
        .ok_or_else(|| mismatch("no period"))?;
    let start = entry.start_time.as_deref().ok_or_else(|| mismatch("no start time"))?;
    let end = entry.end_time.as_deref().ok_or_else(|| mismatch("no end time"))?;
    let start_seconds = clock::normalize(start)?;
    let end_seconds = clock::normalize(end)?;
    if end_seconds == start_seconds {
        return Ok(None);
    }
    if end_seconds < start_seconds {
        return Err(mismatch(&format!(
            "shift ends before it starts: {start_seconds}..{end_seconds}"
        )));
    }

    let name = entry.full_name();
    let corrected = name.as_deref().and_then(|n| identities.override_for(&team, n));
    let player = match (corrected.or(entry.player_id), name) {
        (Some(id), _) => PlayerRef::Resolved(id),
        (None, Some(name)) => identities.player_ref(&team, &name),
        (None, None) => return Err(mismatch("no player id or name")),
    };

    Ok(Some(ShiftInterval {
        is_goaltender: player.id().is_some_and(|id| goaltenders.contains(&id)),
        player,
        team,
        period,
        start_seconds,
        end_seconds,
    }))
}

/// Report clocks may read `"elapsed / remaining"`; only elapsed is used.
fn elapsed_part(cell: &str) -> &str {
    cell.split('/').next().unwrap_or(cell).trim()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::identity::IdentityOverride;
    use icetime_feeds::RosterEntry;

    pub(crate) fn skater(team: &str, id: u64, period: u32, start: u32, end: u32) -> ShiftInterval {
        ShiftInterval {
            player: PlayerRef::Resolved(id),
            team: team.to_string(),
            period,
            start_seconds: start,
            end_seconds: end,
            is_goaltender: false,
        }
    }

    pub(crate) fn goalie(team: &str, id: u64, period: u32, start: u32, end: u32) -> ShiftInterval {
        ShiftInterval {
            is_goaltender: true,
            ..skater(team, id, period, start, end)
        }
    }

    fn row(index: usize, cells: &[&str]) -> RawShiftRow {
        RawShiftRow {
            index,
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn identities() -> IdentityMap {
        IdentityMap::new(&[]).with_roster(&[
            RosterEntry::new("BOS", "Patrice", "Bergeron", 8470638),
            RosterEntry::new("BOS", "Linus", "Ullmark", 8476999),
        ])
    }

    fn chart_entry(team: &str, first: &str, last: &str, id: Option<u64>, start: &str, end: &str) -> ChartShift {
        ChartShift {
            team_abbrev: Some(team.to_string()),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            player_id: id,
            period: Some(1),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
        }
    }

    #[test]
    fn test_chart_uses_ids_and_feed_goaltenders() {
        let chart = ShiftChart::new(
            2022020511,
            vec![
                chart_entry("BOS", "Patrice", "Bergeron", Some(8470638), "00:00", "00:47"),
                chart_entry("BOS", "Linus", "Ullmark", Some(8476999), "00:00", "20:00"),
                // goal marker
                chart_entry("BOS", "Patrice", "Bergeron", Some(8470638), "00:30", "00:30"),
                chart_entry("bos", "Jake", "DeBrusk", None, "00:10", "00:50"),
            ],
        );
        let goaltenders = BTreeSet::from([8476999]);

        let built = ShiftTable::from_chart(&chart, &goaltenders, &identities(), 0.5).unwrap();
        assert!(built.dropped.is_empty());
        assert!(built.overlaps.is_empty());
        assert_eq!(built.table.len(), 3);
        assert_eq!(
            built.unresolved,
            BTreeSet::from([("BOS".to_string(), "Jake DeBrusk".to_string())])
        );

        let on_ice = built.table.players_on_ice("BOS", 1, 30);
        assert_eq!(on_ice.goaltender, Some(PlayerRef::Resolved(8476999)));
        assert_eq!(
            on_ice.skaters,
            vec![
                PlayerRef::Resolved(8470638),
                PlayerRef::Unresolved("Jake DeBrusk".to_string()),
            ]
        );
        assert_eq!(built.table.players_on_ice("BOS", 1, 47).skater_count, 1);
    }

    #[test]
    fn test_chart_override_beats_listed_id() {
        let chart = ShiftChart::new(
            1,
            vec![chart_entry("MIN", "Jacob", "Middleton", Some(1), "00:00", "00:40")],
        );
        let identities = IdentityMap::new(&[IdentityOverride::new("MIN", "Jacob Middleton", 8478136)]);

        let built = ShiftTable::from_chart(&chart, &BTreeSet::new(), &identities, 0.5).unwrap();
        assert_eq!(
            built.table.players_on_ice("MIN", 1, 10).skaters,
            vec![PlayerRef::Resolved(8478136)]
        );
    }

    #[test]
    fn test_chart_drops_bad_entries_and_rejects_unusable_chart() {
        let mut no_end = chart_entry("BOS", "Patrice", "Bergeron", Some(8470638), "01:00", "");
        no_end.end_time = None;
        let chart = ShiftChart::new(
            1,
            vec![
                chart_entry("BOS", "Patrice", "Bergeron", Some(8470638), "00:00", "00:47"),
                chart_entry("BOS", "Linus", "Ullmark", Some(8476999), "00:00", "20:00"),
                chart_entry("BOS", "Patrice", "Bergeron", Some(8470638), "02:00", "01:00"),
                no_end,
            ],
        );

        let built = ShiftTable::from_chart(&chart, &BTreeSet::new(), &identities(), 0.5).unwrap();
        assert_eq!(
            built.dropped.iter().map(|d| d.index).collect::<Vec<_>>(),
            vec![2, 3]
        );

        let err = ShiftTable::from_chart(&chart, &BTreeSet::new(), &identities(), 0.25).unwrap_err();
        assert!(err.to_string().contains("2 of 4 shift chart entries"));

        let empty = ShiftChart::new(7, Vec::new());
        let err = ShiftTable::from_chart(&empty, &BTreeSet::new(), &identities(), 0.5).unwrap_err();
        assert!(matches!(err, CoreError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_half_open_containment() {
        let table = ShiftTable::from_intervals(vec![skater("BOS", 1, 1, 100, 200)]);
        assert_eq!(table.players_on_ice("BOS", 1, 100).skater_count, 1);
        assert_eq!(table.players_on_ice("BOS", 1, 199).skater_count, 1);
        assert_eq!(table.players_on_ice("BOS", 1, 200).skater_count, 0);
        assert_eq!(table.players_on_ice("BOS", 1, 99).skater_count, 0);
        assert_eq!(table.players_on_ice("BOS", 2, 150).skater_count, 0);
        assert_eq!(table.players_on_ice("TOR", 1, 150).skater_count, 0);
    }

    #[test]
    fn test_skaters_sorted_independent_of_input_order() {
        let mut intervals = vec![
            skater("BOS", 30, 1, 0, 60),
            skater("BOS", 10, 1, 0, 60),
            skater("BOS", 20, 1, 0, 60),
            ShiftInterval {
                player: PlayerRef::Unresolved("Jake DeBrusk".to_string()),
                ..skater("BOS", 0, 1, 0, 60)
            },
        ];
        let forward = ShiftTable::from_intervals(intervals.clone()).players_on_ice("BOS", 1, 30);
        intervals.reverse();
        let reversed = ShiftTable::from_intervals(intervals).players_on_ice("BOS", 1, 30);

        assert_eq!(forward, reversed);
        assert_eq!(
            forward.skaters,
            vec![
                PlayerRef::Resolved(10),
                PlayerRef::Resolved(20),
                PlayerRef::Resolved(30),
                PlayerRef::Unresolved("Jake DeBrusk".to_string()),
            ]
        );
        assert_eq!(forward.skater_count, 4);
    }

    #[test]
    fn test_goaltender_separated_and_conflict_counted() {
        let table = ShiftTable::from_intervals(vec![
            goalie("BOS", 9, 1, 0, 1200),
            goalie("BOS", 5, 1, 600, 700),
            skater("BOS", 1, 1, 0, 1200),
        ]);
        let quiet = table.players_on_ice("BOS", 1, 100);
        assert_eq!(quiet.goaltender, Some(PlayerRef::Resolved(9)));
        assert_eq!(quiet.extra_goaltenders, 0);
        assert_eq!(quiet.skater_count, 1);

        let conflict = table.players_on_ice("BOS", 1, 650);
        assert_eq!(conflict.goaltender, Some(PlayerRef::Resolved(5)));
        assert_eq!(conflict.extra_goaltenders, 1);
    }

    #[test]
    fn test_split_records_reports_trailing_cells() {
        let cells: Vec<String> = (0..14).map(|i| i.to_string()).collect();
        let records = split_records(cells, &ShiftRowSchema::default());
        assert_eq!(records.rows.len(), 2);
        assert_eq!(records.rows[1].index, 1);
        assert_eq!(records.rows[1].cells[0], "6");
        assert_eq!(records.trailing_cells, 2);
    }

    #[test]
    fn test_build_resolves_classifies_and_drops_bad_rows() {
        let records = ShiftRecords {
            rows: vec![
                row(0, &["1", "BOS", "Center - Patrice Bergeron", "1", "0:00", "0:45"]),
                row(1, &["1", "BOS", "Goalie - Linus Ullmark", "1", "0:00 / 20:00", "20:00 / 0:00"]),
                row(2, &["1", "BOS", "Left Wing - Jake DeBrusk", "1", "0:10", "0:50"]),
                row(3, &["2", "BOS", "Center - Patrice Bergeron", "1", "1:30", "abc"]),
                row(4, &["x", "BOS", "Center - Patrice Bergeron", "1", "2:00", "2:30"]),
            ],
            trailing_cells: 0,
        };
        let build = ShiftTable::build(records, &ShiftRowSchema::default(), &identities()).unwrap();

        assert_eq!(build.table.len(), 3);
        assert_eq!(build.dropped.len(), 2);
        assert_eq!(build.dropped[0].index, 3);
        assert!(matches!(build.dropped[0].reason, CoreError::MalformedClock { .. }));
        assert!(matches!(build.dropped[1].reason, CoreError::SchemaMismatch { .. }));
        assert!(build
            .unresolved
            .contains(&("BOS".to_string(), "Jake DeBrusk".to_string())));

        let on_ice = build.table.players_on_ice("BOS", 1, 20);
        assert_eq!(on_ice.goaltender, Some(PlayerRef::Resolved(8476999)));
        assert_eq!(
            on_ice.skaters,
            vec![
                PlayerRef::Resolved(8470638),
                PlayerRef::Unresolved("Jake DeBrusk".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_rejects_pervasive_misalignment() {
        // A five-cell layout read as six-cell rows shifts every column.
        let cells: Vec<String> = (0..4)
            .flat_map(|n| {
                vec![
                    (n + 1).to_string(),
                    "BOS".to_string(),
                    "Center - Patrice Bergeron".to_string(),
                    "1".to_string(),
                    "0:00".to_string(),
                ]
            })
            .collect();
        let schema = ShiftRowSchema::default();
        let records = split_records(cells, &schema);
        let err = ShiftTable::build(records, &schema, &identities()).unwrap_err();
        assert!(matches!(err, CoreError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_build_rejects_empty_document() {
        let doc = ShiftDocument::new(1, "<html><body>No report</body></html>");
        let err = ShiftTable::from_document(&doc, &ShiftRowSchema::default(), &identities())
            .unwrap_err();
        assert!(matches!(err, CoreError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_overlapping_shifts_are_reported_not_rejected() {
        let table = ShiftTable::from_intervals(vec![
            skater("BOS", 1, 1, 0, 60),
            skater("BOS", 1, 1, 50, 90),
            skater("BOS", 1, 1, 90, 120),
            skater("BOS", 2, 1, 0, 60),
        ]);
        let overlaps = table.overlaps();
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].first, (0, 60));
        assert_eq!(overlaps[0].second, (50, 90));
    }

    #[test]
    fn test_schema_validation() {
        assert!(ShiftRowSchema::default().validate().is_ok());

        let narrow = ShiftRowSchema {
            record_width: 5,
            ..ShiftRowSchema::default()
        };
        assert!(matches!(narrow.validate(), Err(CoreError::Config(_))));

        let clashing = ShiftRowSchema {
            end_col: 4,
            ..ShiftRowSchema::default()
        };
        assert!(clashing.validate().is_err());
    }
}
