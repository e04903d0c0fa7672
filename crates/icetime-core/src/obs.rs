//! Structured log hooks for the batch lifecycle.
//!
//! Every skip carries the key needed to target it on a rerun: the game id,
//! plus the event index or shift row index for row-level skips.

use tracing::{info, warn};

/// RAII guard that enters a game-scoped span for the duration of one game.
///
/// ```ignore
/// let _span = GameSpan::enter(2022020511);
/// // every event logged here carries game_id = 2022020511
/// ```
pub struct GameSpan {
    _span: tracing::span::EnteredSpan,
}

impl GameSpan {
    pub fn enter(game_id: u64) -> Self {
        let span = tracing::info_span!("icetime.game", game_id = game_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Which kind of source row a row-level skip refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Event,
    Shift,
}

impl RowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::Event => "event",
            RowKind::Shift => "shift_row",
        }
    }
}

pub fn emit_batch_started(run_id: &str, games: usize, workers: usize) {
    info!(event = "batch.started", run_id = %run_id, games = games, workers = workers);
}

pub fn emit_game_started(game_id: u64) {
    info!(event = "game.started", game_id = game_id);
}

/// Emit event: game correlated and appended.
pub fn emit_game_finished(game_id: u64, duration_ms: u64, records: usize, written: usize) {
    info!(
        event = "game.finished",
        game_id = game_id,
        duration_ms = duration_ms,
        records = records,
        written = written,
    );
}

/// Emit event: whole game skipped (warning level).
pub fn emit_game_skipped(game_id: u64, reason: &dyn std::fmt::Display) {
    warn!(event = "game.skipped", game_id = game_id, reason = %reason);
}

/// Emit event: game left out because the sink already holds it.
pub fn emit_game_already_persisted(game_id: u64) {
    info!(event = "game.already_persisted", game_id = game_id);
}

/// Emit event: one event or shift row dropped (warning level).
pub fn emit_row_skipped(game_id: u64, kind: RowKind, index: u64, reason: &dyn std::fmt::Display) {
    warn!(
        event = "row.skipped",
        game_id = game_id,
        row_kind = kind.as_str(),
        index = index,
        reason = %reason,
    );
}

pub fn emit_identity_miss(game_id: u64, team: &str, name: &str) {
    warn!(event = "identity.unresolved", game_id = game_id, team = %team, name = %name);
}

/// Emit event: suspicious but accepted source data.
pub fn emit_quality_warning(game_id: u64, key: &str, detail: &dyn std::fmt::Display) {
    warn!(event = "data.quality", game_id = game_id, key = %key, detail = %detail);
}

pub fn emit_batch_finished(
    run_id: &str,
    duration_ms: u64,
    games_processed: usize,
    games_skipped: usize,
    rows_written: usize,
) {
    info!(
        event = "batch.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        games_processed = games_processed,
        games_skipped = games_skipped,
        rows_written = rows_written,
    );
}
