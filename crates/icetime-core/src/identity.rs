//! Identity resolution
//!
//! Maps a `(team, display name)` pair from the shift report to the canonical
//! numeric player id used by the event feed. Lookup order is:
//!
//! 1. manual overrides supplied by configuration
//! 2. the roster directory for the game
//!
//! Keys are `(TEAM, normalized name)` where the name is lowercased with
//! whitespace collapsed. A roster name that maps to two different ids for
//! the same team is ambiguous and never resolves.

use std::collections::{HashMap, HashSet};
use std::fmt;

use icetime_feeds::RosterEntry;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CoreError, Result};

/// Canonical numeric player identifier.
pub type PlayerId = u64;

/// A player as known to a shift interval.
///
/// Ordering puts every resolved id (ascending) before any unresolved name
/// (lexicographic), which keeps skater slot assignment reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayerRef {
    Resolved(PlayerId),
    Unresolved(String),
}

impl PlayerRef {
    pub fn id(&self) -> Option<PlayerId> {
        match self {
            PlayerRef::Resolved(id) => Some(*id),
            PlayerRef::Unresolved(_) => None,
        }
    }
}

impl fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerRef::Resolved(id) => write!(f, "{}", id),
            PlayerRef::Unresolved(name) => write!(f, "?{}", name),
        }
    }
}

/// One manual correction (`[[identity.overrides]]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityOverride {
    pub team: String,
    pub name: String,
    pub player_id: PlayerId,
}

impl IdentityOverride {
    pub fn new(team: &str, name: &str, player_id: PlayerId) -> Self {
        Self {
            team: team.to_string(),
            name: name.to_string(),
            player_id,
        }
    }
}

/// Lowercase and collapse internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_team(team: &str) -> String {
    team.trim().to_uppercase()
}

type IdentityKey = (String, String);

fn key(team: &str, name: &str) -> IdentityKey {
    (normalize_team(team), normalize_name(name))
}

/// Read-only `(team, name) -> id` lookup for one game.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    overrides: HashMap<IdentityKey, PlayerId>,
    roster: HashMap<IdentityKey, PlayerId>,
    ambiguous: HashSet<IdentityKey>,
}

impl IdentityMap {
    /// Map seeded with manual corrections only.
    pub fn new(overrides: &[IdentityOverride]) -> Self {
        let overrides = overrides
            .iter()
            .map(|o| (key(&o.team, &o.name), o.player_id))
            .collect();
        Self {
            overrides,
            ..Self::default()
        }
    }

    /// Add roster directory entries.
    pub fn with_roster(mut self, entries: &[RosterEntry]) -> Self {
        self.extend_roster(entries);
        self
    }

    pub fn extend_roster(&mut self, entries: &[RosterEntry]) {
        for entry in entries {
            let k = key(&entry.team, &entry.full_name());
            if self.ambiguous.contains(&k) {
                continue;
            }
            match self.roster.get(&k) {
                Some(&existing) if existing != entry.player_id => {
                    warn!(
                        team = %k.0,
                        name = %k.1,
                        first_id = existing,
                        second_id = entry.player_id,
                        "Roster name maps to two players, leaving it unresolved"
                    );
                    self.roster.remove(&k);
                    self.ambiguous.insert(k);
                }
                Some(_) => {}
                None => {
                    self.roster.insert(k, entry.player_id);
                }
            }
        }
    }

    /// Resolve a display name for a team.
    pub fn resolve(&self, team: &str, display_name: &str) -> Result<PlayerId> {
        let k = key(team, display_name);
        self.overrides
            .get(&k)
            .or_else(|| self.roster.get(&k))
            .copied()
            .ok_or_else(|| CoreError::UnresolvedIdentity {
                team: k.0,
                name: display_name.trim().to_string(),
            })
    }

    /// The manual correction for a name, if one is configured.
    pub fn override_for(&self, team: &str, display_name: &str) -> Option<PlayerId> {
        self.overrides.get(&key(team, display_name)).copied()
    }

    /// Resolve, keeping the raw name when the lookup misses.
    pub fn player_ref(&self, team: &str, display_name: &str) -> PlayerRef {
        match self.resolve(team, display_name) {
            Ok(id) => PlayerRef::Resolved(id),
            Err(_) => PlayerRef::Unresolved(display_name.trim().to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.overrides.len() + self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A shift report player label such as `"C - Patrice Bergeron"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLabel {
    /// Text after the last `"- "`
    pub name: String,
    pub is_goaltender: bool,
}

impl PlayerLabel {
    /// Classify and extract the display name. Goaltender classification is a
    /// case-insensitive search for `goalie_marker` anywhere in the label.
    pub fn parse(label: &str, goalie_marker: &str) -> Self {
        let name = label.rsplit("- ").next().unwrap_or(label).trim().to_string();
        let marker = goalie_marker.trim().to_lowercase();
        let is_goaltender = !marker.is_empty() && label.to_lowercase().contains(&marker);
        Self {
            name,
            is_goaltender,
        }
    }
}
