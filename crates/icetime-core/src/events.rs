//! Event normalization
//!
//! Reduces the raw play sequence of one game to the key events, with every
//! optional attribute explicitly `None` when the feed does not assert it.
//! Plays of other kinds are dropped silently. Key events whose period or
//! clock cannot be read are dropped and reported with their source index.

use icetime_feeds::RawPlay;
use serde::{Deserialize, Serialize};

use crate::clock::{self, ClockPoint};
use crate::error::CoreError;
use crate::identity::PlayerId;

/// Participant positions kept per event.
pub const MAX_PLAYER_REFS: usize = 3;

/// The fixed allow-list of key event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Faceoff,
    Shot,
    Goal,
    Hit,
    BlockedShot,
    MissedShot,
    Giveaway,
    Takeaway,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::Faceoff,
        EventKind::Shot,
        EventKind::Goal,
        EventKind::Hit,
        EventKind::BlockedShot,
        EventKind::MissedShot,
        EventKind::Giveaway,
        EventKind::Takeaway,
    ];

    /// Short code used as the join key prefix.
    pub fn code(&self) -> &'static str {
        match self {
            EventKind::Faceoff => "FAC",
            EventKind::Shot => "SHOT",
            EventKind::Goal => "GOAL",
            EventKind::Hit => "HIT",
            EventKind::BlockedShot => "BLOCK",
            EventKind::MissedShot => "MISS",
            EventKind::Giveaway => "GIVE",
            EventKind::Takeaway => "TAKE",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EventKind::Faceoff => "Faceoff",
            EventKind::Shot => "Shot",
            EventKind::Goal => "Goal",
            EventKind::Hit => "Hit",
            EventKind::BlockedShot => "Blocked Shot",
            EventKind::MissedShot => "Missed Shot",
            EventKind::Giveaway => "Giveaway",
            EventKind::Takeaway => "Takeaway",
        }
    }

    fn type_id(&self) -> &'static str {
        match self {
            EventKind::Faceoff => "FACEOFF",
            EventKind::Shot => "SHOT",
            EventKind::Goal => "GOAL",
            EventKind::Hit => "HIT",
            EventKind::BlockedShot => "BLOCKED_SHOT",
            EventKind::MissedShot => "MISSED_SHOT",
            EventKind::Giveaway => "GIVEAWAY",
            EventKind::Takeaway => "TAKEAWAY",
        }
    }

    /// Match a display name ("Blocked Shot"), a type id ("BLOCKED_SHOT") or
    /// a short code ("BLOCK"). Returns `None` for every other kind.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|kind| {
            raw.eq_ignore_ascii_case(kind.display_name())
                || raw.eq_ignore_ascii_case(kind.type_id())
                || raw.eq_ignore_ascii_case(kind.code())
        })
    }
}

/// Build a join key: kind code, period padded to 2 digits, seconds padded to 4.
pub fn join_key(kind: EventKind, period: u32, seconds: u32) -> String {
    format!("{}{:02}{:04}", kind.code(), period, seconds)
}

/// Rink coordinates; the feed may report either axis without the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningScore {
    pub home: u32,
    pub away: u32,
}

/// One key event, immutable once normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub clock: ClockPoint,
    /// Position in the source feed
    pub source_index: u32,
    pub description: String,
    /// Sub-type such as the shot type
    pub detail: Option<String>,
    /// Team as asserted by the feed, never inferred
    pub team: Option<String>,
    /// First participants in feed order; a participant without an id keeps
    /// its position as `None`
    pub player_refs: Vec<Option<PlayerId>>,
    pub coordinates: Point,
    pub running_score: RunningScore,
}

impl Event {
    pub fn period(&self) -> u32 {
        self.clock.period
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.clock.seconds
    }

    pub fn join_key(&self) -> String {
        join_key(self.kind, self.clock.period, self.clock.seconds)
    }
}

/// A key event that could not be normalized.
#[derive(Debug)]
pub struct DroppedEvent {
    pub source_index: u32,
    pub reason: CoreError,
}

/// Output of [`normalize_events`].
#[derive(Debug, Default)]
pub struct NormalizedEvents {
    pub events: Vec<Event>,
    pub dropped: Vec<DroppedEvent>,
}

/// Filter and normalize the raw play sequence of one game.
pub fn normalize_events(plays: &[RawPlay]) -> NormalizedEvents {
    let mut out = NormalizedEvents::default();

    for (position, play) in plays.iter().enumerate() {
        let Some(kind) = play_kind(play) else {
            continue;
        };
        let source_index = play.about.event_idx.unwrap_or(position as u32);

        match normalize_play(kind, source_index, play) {
            Ok(event) => out.events.push(event),
            Err(reason) => out.dropped.push(DroppedEvent {
                source_index,
                reason,
            }),
        }
    }

    out
}

fn play_kind(play: &RawPlay) -> Option<EventKind> {
    play.result
        .event
        .as_deref()
        .and_then(EventKind::parse)
        .or_else(|| play.result.event_type_id.as_deref().and_then(EventKind::parse))
}

fn normalize_play(
    kind: EventKind,
    source_index: u32,
    play: &RawPlay,
) -> std::result::Result<Event, CoreError> {
    let period = play
        .about
        .period
        .filter(|p| *p > 0)
        .ok_or_else(|| CoreError::schema(format!("event {source_index} has no period")))?;
    let raw_clock = play
        .about
        .period_time
        .as_deref()
        .ok_or_else(|| CoreError::schema(format!("event {source_index} has no clock")))?;
    let clock = ClockPoint::new(period, clock::normalize(raw_clock)?);

    Ok(Event {
        kind,
        clock,
        source_index,
        description: play.result.description.clone().unwrap_or_default(),
        detail: non_empty(play.result.secondary_type.as_deref()),
        team: play
            .team
            .as_ref()
            .and_then(|t| t.code())
            .map(str::to_string),
        player_refs: play
            .players
            .iter()
            .take(MAX_PLAYER_REFS)
            .map(|p| p.player.id)
            .collect(),
        coordinates: Point {
            x: play.coordinates.x,
            y: play.coordinates.y,
        },
        running_score: RunningScore {
            home: play.about.goals.home,
            away: play.about.goals.away,
        },
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use icetime_feeds::{
        Coordinates, Goals, ParticipantRef, PlayAbout, PlayParticipant, PlayResult, TeamRef,
    };

    fn play(event: &str, idx: u32, period: u32, time: &str) -> RawPlay {
        RawPlay {
            result: PlayResult {
                event: Some(event.to_string()),
                description: Some(format!("{event} description")),
                ..Default::default()
            },
            about: PlayAbout {
                event_idx: Some(idx),
                period: Some(period),
                period_time: Some(time.to_string()),
                goals: Goals::default(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_join_key_format() {
        assert_eq!(join_key(EventKind::Faceoff, 1, 30), "FAC010030");
        assert_eq!(join_key(EventKind::BlockedShot, 3, 1199), "BLOCK031199");
        assert_eq!(join_key(EventKind::Goal, 10, 5), "GOAL100005");
    }

    #[test]
    fn test_kind_parse_accepts_all_spellings() {
        assert_eq!(EventKind::parse("Blocked Shot"), Some(EventKind::BlockedShot));
        assert_eq!(EventKind::parse("BLOCKED_SHOT"), Some(EventKind::BlockedShot));
        assert_eq!(EventKind::parse("block"), Some(EventKind::BlockedShot));
        assert_eq!(EventKind::parse("Period End"), None);
        assert_eq!(EventKind::parse("Penalty"), None);
    }

    #[test]
    fn test_non_key_events_are_dropped_silently() {
        let plays = vec![
            play("Game Scheduled", 0, 1, "00:00"),
            play("Faceoff", 1, 1, "00:00"),
            play("Stoppage", 2, 1, "00:40"),
            play("Hit", 3, 1, "00:45"),
            play("Period End", 4, 1, "20:00"),
        ];
        let out = normalize_events(&plays);
        assert_eq!(out.events.len(), 2);
        assert!(out.dropped.is_empty());
        assert_eq!(out.events[0].kind, EventKind::Faceoff);
        assert_eq!(out.events[1].join_key(), "HIT010045");
    }

    #[test]
    fn test_event_type_id_is_used_when_display_name_missing() {
        let mut raw = play("ignored", 5, 2, "01:00");
        raw.result.event = None;
        raw.result.event_type_id = Some("MISSED_SHOT".to_string());
        let out = normalize_events(&[raw]);
        assert_eq!(out.events[0].kind, EventKind::MissedShot);
        assert_eq!(out.events[0].join_key(), "MISS020060");
    }

    #[test]
    fn test_malformed_clock_drops_event_with_index() {
        let plays = vec![play("Shot", 7, 1, "abc"), play("Shot", 8, 1, "00:10")];
        let out = normalize_events(&plays);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.dropped[0].source_index, 7);
        assert!(matches!(
            out.dropped[0].reason,
            CoreError::MalformedClock { .. }
        ));
    }

    #[test]
    fn test_missing_period_is_schema_mismatch() {
        let mut raw = play("Goal", 9, 1, "05:00");
        raw.about.period = None;
        let out = normalize_events(&[raw]);
        assert!(out.events.is_empty());
        assert!(matches!(
            out.dropped[0].reason,
            CoreError::SchemaMismatch { .. }
        ));
    }

    #[test]
    fn test_optional_fields_are_explicitly_absent() {
        let out = normalize_events(&[play("Hit", 1, 1, "00:10")]);
        let event = &out.events[0];
        assert_eq!(event.detail, None);
        assert_eq!(event.team, None);
        assert_eq!(event.coordinates, Point::default());
        assert!(event.player_refs.is_empty());
    }

    #[test]
    fn test_attributes_are_copied_through() {
        let mut raw = play("Shot", 12, 2, "03:21");
        raw.result.secondary_type = Some("Wrist Shot".to_string());
        raw.team = Some(TeamRef {
            tri_code: Some("OTT".to_string()),
            abbreviation: None,
        });
        raw.coordinates = Coordinates {
            x: Some(-71.0),
            y: Some(12.0),
        };
        raw.about.goals = Goals { home: 1, away: 2 };
        raw.players = (1..=4)
            .map(|id| PlayParticipant {
                player: ParticipantRef {
                    id: Some(id),
                    full_name: None,
                },
                player_type: None,
            })
            .collect();

        let event = normalize_events(&[raw]).events.remove(0);
        assert_eq!(event.detail.as_deref(), Some("Wrist Shot"));
        assert_eq!(event.team.as_deref(), Some("OTT"));
        assert_eq!(
            event.coordinates,
            Point {
                x: Some(-71.0),
                y: Some(12.0)
            }
        );
        assert_eq!(event.running_score, RunningScore { home: 1, away: 2 });
        assert_eq!(event.player_refs, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(event.elapsed_seconds(), 201);
        assert_eq!(event.source_index, 12);
    }

    #[test]
    fn test_participant_without_id_keeps_its_position() {
        let mut raw = play("Hit", 3, 1, "04:00");
        raw.players = [Some(8480801), None, Some(8479325)]
            .into_iter()
            .map(|id| PlayParticipant {
                player: ParticipantRef {
                    id,
                    full_name: Some("Listed".to_string()),
                },
                player_type: None,
            })
            .collect();
        raw.coordinates = Coordinates {
            x: Some(88.0),
            y: None,
        };

        let event = normalize_events(&[raw]).events.remove(0);
        assert_eq!(event.player_refs, vec![Some(8480801), None, Some(8479325)]);
        assert_eq!(event.coordinates.x, Some(88.0));
        assert_eq!(event.coordinates.y, None);
    }
}
