//! Shared fixtures: one Boston / Ottawa game with full-strength shifts.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use icetime_core::{BatchRunner, PipelineConfig, Providers, ShiftSource};
use icetime_feeds::fakes::ScriptedFeeds;
use icetime_feeds::{ChartShift, GameFeed, RetryPolicy, RosterEntry, ShiftChart};
use icetime_store::PlaySink;
use serde_json::{json, Value};

pub const GAME: u64 = 2022020511;
pub const GAME_2: u64 = 2022020512;
pub const GAME_3: u64 = 2022020513;

pub const BERGERON: u64 = 8470638;
pub const MARCHAND: u64 = 8473419;
pub const LINDHOLM: u64 = 8476854;
pub const PASTRNAK: u64 = 8477956;
pub const MCAVOY: u64 = 8479325;
pub const DEBRUSK: u64 = 8478498;
pub const ULLMARK: u64 = 8476999;

pub const CHABOT: u64 = 8478469;
pub const BATHERSON: u64 = 8480208;
pub const TKACHUK: u64 = 8480801;
pub const SANDERSON: u64 = 8482105;
pub const STUTZLE: u64 = 8482116;
pub const TALBOT: u64 = 8475660;

/// Sorted skater ids of the Boston unit on ice from 0:00 to 1:00.
pub const BOS_UNIT: [u64; 5] = [BERGERON, MARCHAND, LINDHOLM, PASTRNAK, MCAVOY];
pub const OTT_UNIT: [u64; 5] = [CHABOT, BATHERSON, TKACHUK, SANDERSON, STUTZLE];

pub fn roster() -> Vec<RosterEntry> {
    vec![
        RosterEntry::new("BOS", "Patrice", "Bergeron", BERGERON),
        RosterEntry::new("BOS", "Brad", "Marchand", MARCHAND),
        RosterEntry::new("BOS", "Hampus", "Lindholm", LINDHOLM),
        RosterEntry::new("BOS", "David", "Pastrnak", PASTRNAK),
        RosterEntry::new("BOS", "Charlie", "McAvoy", MCAVOY),
        RosterEntry::new("BOS", "Jake", "DeBrusk", DEBRUSK),
        RosterEntry::new("BOS", "Linus", "Ullmark", ULLMARK),
        RosterEntry::new("OTT", "Thomas", "Chabot", CHABOT),
        RosterEntry::new("OTT", "Drake", "Batherson", BATHERSON),
        RosterEntry::new("OTT", "Brady", "Tkachuk", TKACHUK),
        RosterEntry::new("OTT", "Jake", "Sanderson", SANDERSON),
        RosterEntry::new("OTT", "Tim", "Stutzle", STUTZLE),
        RosterEntry::new("OTT", "Cam", "Talbot", TALBOT),
    ]
}

/// One logical shift report row.
#[derive(Debug, Clone)]
pub struct ShiftRow {
    pub team: &'static str,
    pub label: String,
    pub period: u32,
    pub start: String,
    pub end: String,
}

pub fn shift(team: &'static str, label: &str, period: u32, start: u32, end: u32) -> ShiftRow {
    ShiftRow {
        team,
        label: label.to_string(),
        period,
        start: clock_cell(start),
        end: clock_cell(end),
    }
}

/// "elapsed / remaining", as printed on the report.
pub fn clock_cell(elapsed: u32) -> String {
    let remaining = 1200u32.saturating_sub(elapsed);
    format!(
        "{}:{:02} / {}:{:02}",
        elapsed / 60,
        elapsed % 60,
        remaining / 60,
        remaining % 60
    )
}

/// Both starting units on ice for the first minute, goaltenders all period.
pub fn full_strength_shifts() -> Vec<ShiftRow> {
    vec![
        shift("BOS", "C - Patrice Bergeron", 1, 0, 60),
        shift("BOS", "L - Brad Marchand", 1, 0, 60),
        shift("BOS", "R - David Pastrnak", 1, 0, 60),
        shift("BOS", "D - Charlie McAvoy", 1, 0, 60),
        shift("BOS", "D - Hampus Lindholm", 1, 0, 60),
        shift("BOS", "Goalie - Linus Ullmark", 1, 0, 1200),
        shift("OTT", "C - Tim Stutzle", 1, 0, 60),
        shift("OTT", "L - Brady Tkachuk", 1, 0, 60),
        shift("OTT", "R - Drake Batherson", 1, 0, 60),
        shift("OTT", "D - Thomas Chabot", 1, 0, 60),
        shift("OTT", "D - Jake Sanderson", 1, 0, 60),
        shift("OTT", "Goalie - Cam Talbot", 1, 0, 1200),
    ]
}

/// Render shift rows as report markup, six data cells per row.
pub fn shift_markup(rows: &[ShiftRow]) -> String {
    let mut out = String::from(
        "<html><body><table>\n<tr><td class=\"heading\">Shift #</td><td class=\"heading\">Team</td></tr>\n",
    );
    for (n, row) in rows.iter().enumerate() {
        out.push_str("<tr>");
        for cell in [
            (n + 1).to_string(),
            row.team.to_string(),
            row.label.clone(),
            row.period.to_string(),
            row.start.clone(),
            row.end.clone(),
        ] {
            out.push_str(&format!("<td align=\"center\" class=\"lborder + bborder\">{cell}</td>"));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table></body></html>");
    out
}

pub fn play(event_idx: u32, event: &str, period: u32, time: &str, players: &[u64]) -> Value {
    let players: Vec<Value> = players
        .iter()
        .map(|id| json!({"player": {"id": id}, "playerType": "Shooter"}))
        .collect();
    json!({
        "result": {"event": event, "description": format!("{event} at {time}")},
        "about": {
            "eventIdx": event_idx,
            "period": period,
            "periodTime": time,
            "goals": {"home": 0, "away": 0}
        },
        "coordinates": {"x": 12.0, "y": -3.0},
        "team": {"triCode": "BOS"},
        "players": players
    })
}

/// Faceoff at 0:00, shot at 0:30, hit at 2:00 when only the goaltenders
/// have shifts running.
pub fn standard_plays() -> Vec<Value> {
    vec![
        play(0, "Game Scheduled", 1, "00:00", &[]),
        play(1, "Faceoff", 1, "00:00", &[BERGERON, STUTZLE]),
        play(2, "Shot", 1, "00:30", &[PASTRNAK, TALBOT]),
        play(3, "Hit", 1, "02:00", &[TKACHUK, MCAVOY]),
        play(4, "Period End", 1, "20:00", &[]),
    ]
}

pub fn feed(game_id: u64, plays: Vec<Value>) -> GameFeed {
    serde_json::from_value(json!({
        "gamePk": game_id,
        "gameData": {
            "game": {"season": "20222023", "type": "R"},
            "datetime": {"dateTime": "2022-12-27T00:00:00Z"},
            "teams": {"home": {"triCode": "BOS"}, "away": {"triCode": "OTT"}},
            "players": {
                "ID8476999": {"id": ULLMARK, "fullName": "Linus Ullmark", "primaryPosition": {"code": "G"}},
                "ID8475660": {"id": TALBOT, "fullName": "Cam Talbot", "primaryPosition": {"code": "G"}},
                "ID8477956": {"id": PASTRNAK, "fullName": "David Pastrnak", "primaryPosition": {"code": "R"}}
            }
        },
        "liveData": {"plays": {"allPlays": plays}}
    }))
    .unwrap()
}

/// One shift chart entry as served by the shiftcharts endpoint.
pub fn chart_entry(team: &str, first: &str, last: &str, id: u64, period: u32, start: &str, end: &str) -> Value {
    json!({
        "id": 11_000_000 + id,
        "gameId": GAME,
        "teamAbbrev": team,
        "teamName": team,
        "firstName": first,
        "lastName": last,
        "playerId": id,
        "period": period,
        "shiftNumber": 1,
        "startTime": start,
        "endTime": end,
        "duration": null,
        "typeCode": 517,
        "eventDescription": null
    })
}

/// The same shifts as [`full_strength_shifts`], in shift chart form, plus a
/// zero-length goal marker.
pub fn full_strength_chart(game_id: u64) -> ShiftChart {
    let entries = vec![
        chart_entry("BOS", "Patrice", "Bergeron", BERGERON, 1, "00:00", "01:00"),
        chart_entry("BOS", "Brad", "Marchand", MARCHAND, 1, "00:00", "01:00"),
        chart_entry("BOS", "David", "Pastrnak", PASTRNAK, 1, "00:00", "01:00"),
        chart_entry("BOS", "Charlie", "McAvoy", MCAVOY, 1, "00:00", "01:00"),
        chart_entry("BOS", "Hampus", "Lindholm", LINDHOLM, 1, "00:00", "01:00"),
        chart_entry("BOS", "Linus", "Ullmark", ULLMARK, 1, "00:00", "20:00"),
        chart_entry("OTT", "Tim", "Stutzle", STUTZLE, 1, "00:00", "01:00"),
        chart_entry("OTT", "Brady", "Tkachuk", TKACHUK, 1, "00:00", "01:00"),
        chart_entry("OTT", "Drake", "Batherson", BATHERSON, 1, "00:00", "01:00"),
        chart_entry("OTT", "Thomas", "Chabot", CHABOT, 1, "00:00", "01:00"),
        chart_entry("OTT", "Jake", "Sanderson", SANDERSON, 1, "00:00", "01:00"),
        chart_entry("OTT", "Cam", "Talbot", TALBOT, 1, "00:00", "20:00"),
        chart_entry("BOS", "David", "Pastrnak", PASTRNAK, 1, "00:30", "00:30"),
    ];
    let shifts: Vec<ChartShift> = serde_json::from_value(Value::Array(entries)).unwrap();
    ShiftChart::new(game_id, shifts)
}

/// Load the standard event feed and shift chart for `game_id`.
pub fn with_chart_game(feeds: ScriptedFeeds, game_id: u64) -> ScriptedFeeds {
    feeds
        .with_events(game_id, feed(game_id, standard_plays()))
        .with_shift_chart(full_strength_chart(game_id))
}

/// Defaults, reading intervals from the shift report and roster.
pub fn report_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.batch.shift_source = ShiftSource::Report;
    config
}

/// Load the standard event feed, shift report and roster for `game_id`.
pub fn with_standard_game(feeds: ScriptedFeeds, game_id: u64) -> ScriptedFeeds {
    feeds
        .with_events(game_id, feed(game_id, standard_plays()))
        .with_shift_markup(game_id, shift_markup(&full_strength_shifts()))
        .with_roster(game_id, roster())
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

pub fn runner(feeds: Arc<ScriptedFeeds>, sink: Arc<dyn PlaySink>, config: &PipelineConfig) -> BatchRunner {
    BatchRunner::new(Providers::from_shared(feeds), sink, config)
        .unwrap()
        .with_retry_policy(fast_retry())
}
