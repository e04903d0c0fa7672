//! Correlation engine
//!
//! Joins each normalized event to the on-ice roster of both teams at the
//! event's `(period, elapsed_seconds)` and emits one merged record per event.
//! Events that collapse onto the same join key are deduplicated keeping the
//! first occurrence in source order, before any roster is looked up, so a
//! dropped duplicate never raises a data-quality warning.
//!
//! Correlation is pure and synchronous. Data-quality findings are returned
//! to the caller rather than logged here.

use std::collections::HashMap;
use std::fmt;

use crate::events::Event;
use crate::identity::PlayerRef;
use crate::shifts::{OnIce, ShiftTable};

/// Skater slots per team in a merged record.
pub const SKATER_SLOTS: usize = 6;

/// One team's view of the shift data.
#[derive(Debug, Clone, Copy)]
pub struct Side<'a> {
    pub team: &'a str,
    pub table: &'a ShiftTable,
}

impl<'a> Side<'a> {
    pub fn new(team: &'a str, table: &'a ShiftTable) -> Self {
        Self { team, table }
    }
}

/// A team's on-ice roster as carried by a merged record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamOnIce {
    pub goaltender: Option<PlayerRef>,
    /// At most [`SKATER_SLOTS`], in slot order
    pub skaters: Vec<PlayerRef>,
    /// True number of skaters found, even beyond the slot count
    pub skater_count: u32,
}

impl TeamOnIce {
    fn from_on_ice(on_ice: OnIce) -> Self {
        let mut skaters = on_ice.skaters;
        skaters.truncate(SKATER_SLOTS);
        Self {
            goaltender: on_ice.goaltender,
            skaters,
            skater_count: on_ice.skater_count as u32,
        }
    }

    /// Skater ids in slot order; unresolved players leave their slot empty.
    pub fn skater_ids(&self) -> Vec<Option<u64>> {
        self.skaters.iter().map(PlayerRef::id).collect()
    }

    pub fn goaltender_id(&self) -> Option<u64> {
        self.goaltender.as_ref().and_then(PlayerRef::id)
    }
}

/// An event plus the on-ice roster of both teams.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub event: Event,
    pub home: TeamOnIce,
    pub away: TeamOnIce,
}

impl MergedRecord {
    pub fn join_key(&self) -> String {
        self.event.join_key()
    }
}

/// What made a record worth a data-quality warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityIssue {
    /// More than one goaltender interval active for `team`
    MultipleGoaltenders { team: String, active: usize },
    /// More skaters than slots for `team`
    TooManySkaters { team: String, count: usize },
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::MultipleGoaltenders { team, active } => {
                write!(f, "{active} goaltenders on ice for {team}, kept the first")
            }
            QualityIssue::TooManySkaters { team, count } => {
                write!(f, "{count} skaters on ice for {team}, kept the first 6")
            }
        }
    }
}

/// A finding attached to the event that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityWarning {
    pub source_index: u32,
    pub join_key: String,
    pub issue: QualityIssue,
}

/// A record removed because an earlier one had the same join key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateRecord {
    pub source_index: u32,
    pub join_key: String,
    /// Source index of the record that was kept
    pub kept_index: u32,
}

/// Output of [`correlate`].
#[derive(Debug, Default)]
pub struct Correlation {
    pub records: Vec<MergedRecord>,
    pub duplicates: Vec<DuplicateRecord>,
    pub warnings: Vec<QualityWarning>,
}

/// Deduplicate events by join key, then merge each survivor with both
/// teams' on-ice rosters.
///
/// An event with no active interval for a team gets an empty roster for
/// that team; it never stops correlation of the remaining events.
pub fn correlate(events: &[Event], home: Side<'_>, away: Side<'_>) -> Correlation {
    let mut first_seen = FirstSeen::default();
    let mut out = Correlation {
        records: Vec::with_capacity(events.len()),
        ..Correlation::default()
    };

    for event in events {
        let join_key = event.join_key();
        if let Some(duplicate) = first_seen.check(&join_key, event.source_index) {
            out.duplicates.push(duplicate);
            continue;
        }

        let (period, second) = (event.period(), event.elapsed_seconds());
        let home_on_ice = home.table.players_on_ice(home.team, period, second);
        let away_on_ice = away.table.players_on_ice(away.team, period, second);

        for (team, on_ice) in [(home.team, &home_on_ice), (away.team, &away_on_ice)] {
            for issue in inspect(team, on_ice) {
                out.warnings.push(QualityWarning {
                    source_index: event.source_index,
                    join_key: join_key.clone(),
                    issue,
                });
            }
        }

        out.records.push(MergedRecord {
            event: event.clone(),
            home: TeamOnIce::from_on_ice(home_on_ice),
            away: TeamOnIce::from_on_ice(away_on_ice),
        });
    }

    out
}

/// Source index of the first event seen per join key.
#[derive(Default)]
struct FirstSeen(HashMap<String, u32>);

impl FirstSeen {
    /// `Some` when `join_key` was already taken by an earlier index.
    fn check(&mut self, join_key: &str, source_index: u32) -> Option<DuplicateRecord> {
        match self.0.get(join_key) {
            Some(&kept_index) => Some(DuplicateRecord {
                source_index,
                join_key: join_key.to_string(),
                kept_index,
            }),
            None => {
                self.0.insert(join_key.to_string(), source_index);
                None
            }
        }
    }
}

fn inspect(team: &str, on_ice: &OnIce) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    if on_ice.extra_goaltenders > 0 {
        issues.push(QualityIssue::MultipleGoaltenders {
            team: team.to_string(),
            active: on_ice.extra_goaltenders + 1,
        });
    }
    if on_ice.skater_count > SKATER_SLOTS {
        issues.push(QualityIssue::TooManySkaters {
            team: team.to_string(),
            count: on_ice.skater_count,
        });
    }
    issues
}

/// Stable, order-preserving dedup: the first record per join key survives.
pub fn dedup_by_join_key(records: Vec<MergedRecord>) -> (Vec<MergedRecord>, Vec<DuplicateRecord>) {
    let mut first_seen = FirstSeen::default();
    let mut kept = Vec::with_capacity(records.len());
    let mut duplicates = Vec::new();

    for record in records {
        match first_seen.check(&record.join_key(), record.event.source_index) {
            Some(duplicate) => duplicates.push(duplicate),
            None => kept.push(record),
        }
    }

    (kept, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockPoint;
    use crate::events::{EventKind, Point, RunningScore};
    use crate::shifts::tests::{goalie, skater};

    fn event(kind: EventKind, idx: u32, period: u32, seconds: u32) -> Event {
        Event {
            kind,
            clock: ClockPoint::new(period, seconds),
            source_index: idx,
            description: format!("{} #{idx}", kind.display_name()),
            detail: None,
            team: Some("BOS".to_string()),
            player_refs: vec![],
            coordinates: Point::default(),
            running_score: RunningScore::default(),
        }
    }

    fn five_and_goalie() -> ShiftTable {
        let mut intervals: Vec<_> = (1..=5).map(|id| skater("BOS", id, 1, 0, 45)).collect();
        intervals.push(goalie("BOS", 99, 1, 0, 1200));
        intervals.extend((11..=15).map(|id| skater("OTT", id, 1, 20, 60)));
        intervals.push(goalie("OTT", 88, 1, 0, 1200));
        ShiftTable::from_intervals(intervals)
    }

    #[test]
    fn test_five_skaters_and_goalie() {
        let table = five_and_goalie();
        let out = correlate(
            &[event(EventKind::Faceoff, 1, 1, 30)],
            Side::new("BOS", &table),
            Side::new("OTT", &table),
        );

        let record = &out.records[0];
        assert_eq!(record.join_key(), "FAC010030");
        assert_eq!(record.home.skater_count, 5);
        assert_eq!(record.home.goaltender_id(), Some(99));
        assert_eq!(
            record.home.skater_ids(),
            vec![Some(1), Some(2), Some(3), Some(4), Some(5)]
        );
        assert_eq!(record.away.skater_count, 5);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_missing_shift_data_leaves_team_empty_and_continues() {
        let table = five_and_goalie();
        let events = [
            event(EventKind::Shot, 1, 1, 10),
            event(EventKind::Hit, 2, 2, 10),
            event(EventKind::Shot, 3, 1, 30),
        ];
        let out = correlate(&events, Side::new("BOS", &table), Side::new("OTT", &table));

        assert_eq!(out.records.len(), 3);
        // OTT skaters start at 20; only the goalie is on ice at 10
        assert_eq!(out.records[0].away.skater_count, 0);
        assert_eq!(out.records[0].away.goaltender_id(), Some(88));
        // no period 2 shifts at all
        assert_eq!(out.records[1].home, TeamOnIce::default());
        assert_eq!(out.records[1].away, TeamOnIce::default());
        assert_eq!(out.records[2].home.skater_count, 5);
    }

    #[test]
    fn test_dedup_keeps_first_in_source_order() {
        let table = ShiftTable::default();
        let mut first = event(EventKind::Shot, 4, 1, 50);
        first.description = "first report".to_string();
        let mut second = event(EventKind::Shot, 5, 1, 50);
        second.description = "re-reported".to_string();
        let other = event(EventKind::Hit, 6, 1, 50);

        let out = correlate(
            &[first, second, other],
            Side::new("BOS", &table),
            Side::new("OTT", &table),
        );
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].event.description, "first report");
        assert_eq!(out.records[1].event.kind, EventKind::Hit);
        assert_eq!(
            out.duplicates,
            vec![DuplicateRecord {
                source_index: 5,
                join_key: "SHOT010050".to_string(),
                kept_index: 4,
            }]
        );
    }

    #[test]
    fn test_correlation_is_idempotent() {
        let table = five_and_goalie();
        let events: Vec<Event> = [10, 30, 30, 40, 30]
            .iter()
            .enumerate()
            .map(|(i, s)| event(EventKind::Shot, i as u32, 1, *s))
            .collect();

        let first = correlate(&events, Side::new("BOS", &table), Side::new("OTT", &table));
        let second = correlate(&events, Side::new("BOS", &table), Side::new("OTT", &table));
        assert_eq!(first.records.len(), 3);
        assert_eq!(first.records, second.records);
        let keys: std::collections::HashSet<String> =
            first.records.iter().map(MergedRecord::join_key).collect();
        assert_eq!(keys.len(), first.records.len());

        let (again, dropped) = dedup_by_join_key(first.records.clone());
        assert_eq!(again, first.records);
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_extra_skaters_truncated_and_flagged() {
        let mut intervals: Vec<_> = (1..=7).map(|id| skater("BOS", id, 1, 0, 60)).collect();
        intervals.push(goalie("BOS", 90, 1, 0, 60));
        intervals.push(goalie("BOS", 91, 1, 0, 60));
        let table = ShiftTable::from_intervals(intervals);

        let out = correlate(
            &[event(EventKind::Goal, 1, 1, 5)],
            Side::new("BOS", &table),
            Side::new("OTT", &table),
        );
        let home = &out.records[0].home;
        assert_eq!(home.skaters.len(), SKATER_SLOTS);
        assert_eq!(home.skater_count, 7);
        assert_eq!(home.goaltender_id(), Some(90));
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings.iter().any(|w| matches!(
            w.issue,
            QualityIssue::MultipleGoaltenders { active: 2, .. }
        )));
    }

    #[test]
    fn test_dropped_duplicate_raises_no_warning() {
        let mut intervals: Vec<_> = (1..=7).map(|id| skater("BOS", id, 1, 0, 60)).collect();
        intervals.push(goalie("BOS", 90, 1, 0, 1200));
        let table = ShiftTable::from_intervals(intervals);

        let out = correlate(
            &[
                event(EventKind::Shot, 1, 1, 40),
                event(EventKind::Shot, 2, 1, 40),
                event(EventKind::Shot, 3, 1, 40),
            ],
            Side::new("BOS", &table),
            Side::new("OTT", &table),
        );
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.duplicates.len(), 2);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].source_index, 1);
        assert_eq!(
            out.warnings[0].issue,
            QualityIssue::TooManySkaters {
                team: "BOS".to_string(),
                count: 7,
            }
        );
    }

    #[test]
    fn test_separate_tables_per_team() {
        let home_table = ShiftTable::from_intervals(vec![skater("BOS", 1, 1, 0, 60)]);
        let away_table = ShiftTable::from_intervals(vec![skater("OTT", 2, 1, 0, 60)]);
        let out = correlate(
            &[event(EventKind::Takeaway, 1, 1, 5)],
            Side::new("BOS", &home_table),
            Side::new("OTT", &away_table),
        );
        assert_eq!(out.records[0].home.skater_ids(), vec![Some(1)]);
        assert_eq!(out.records[0].away.skater_ids(), vec![Some(2)]);
    }
}
