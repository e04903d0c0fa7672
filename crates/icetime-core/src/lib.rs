//! icetime-core: play / shift correlation engine
//!
//! Joins the discrete events of a game to the on-ice roster of both teams at
//! the moment each event happened, and assembles one fixed-column row per
//! event.
//!
//! Leaf-first:
//! - `clock`: `mm:ss` to elapsed seconds
//! - `identity`: `(team, display name)` to player id, goaltender labels
//! - `events`: key-event filter, attributes, join key
//! - `shifts`: shift chart entries or fixed-width report rows to a queryable
//!   interval table
//! - `correlate`: merged records and stable dedup
//! - `dataset`: flat rows handed to the sink game by game
//! - `batch`: bounded worker pool with retry and skip-and-log

pub mod batch;
pub mod clock;
pub mod config;
pub mod correlate;
pub mod dataset;
pub mod error;
pub mod events;
pub mod identity;
pub mod metrics;
pub mod obs;
pub mod shifts;
pub mod telemetry;

pub use batch::{
    BatchRunner, BatchSummary, GameOutput, GameReport, GameSelection, Providers, ShiftInput,
    SkippedGame,
};
pub use clock::{normalize as normalize_clock, ClockPoint};
pub use config::{
    BatchSettings, IdentitySettings, PipelineConfig, ShiftSource, SinkKind, SinkSettings,
    CONFIG_ENV, DEFAULT_CONFIG_FILE,
};
pub use correlate::{
    correlate, dedup_by_join_key, Correlation, MergedRecord, QualityIssue, Side, TeamOnIce,
    SKATER_SLOTS,
};
pub use dataset::{to_row, Dataset, DatasetAssembler, GameContext};
pub use error::{CoreError, Result};
pub use events::{
    join_key, normalize_events, Event, EventKind, NormalizedEvents, Point, RunningScore,
};
pub use identity::{IdentityMap, IdentityOverride, PlayerId, PlayerLabel, PlayerRef};
pub use metrics::METRICS;
pub use obs::{
    emit_batch_finished, emit_game_finished, emit_game_skipped, emit_game_started,
    emit_quality_warning, emit_row_skipped, GameSpan, RowKind,
};
pub use shifts::{OnIce, ShiftInterval, ShiftRowSchema, ShiftTable};
pub use telemetry::init_tracing;
