//! Batch runner
//!
//! Drives the per-game pipeline over a date range or an explicit list of
//! game ids:
//!
//! 1. fetch the event feed and the shift input concurrently, each with
//!    bounded retry on transient failures. The shift input is the shift
//!    chart, or the shift report plus the roster directory.
//! 2. correlate synchronously (pure, no suspension points)
//! 3. append the game's rows to the sink before the next game's rows
//!
//! Games run on a fixed number of workers. A game that fails at any step is
//! logged with its id and skipped; the batch always runs to completion.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use icetime_feeds::{
    with_retry, EventFeed, FeedError, FeedSource, GameFeed, RetryPolicy, RosterDirectory,
    RosterEntry, ScheduleSource, ShiftChart, ShiftChartSource, ShiftDocument,
    ShiftDocumentSource,
};
use icetime_store::PlaySink;
use serde::Serialize;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::config::{BatchSettings, PipelineConfig, ShiftSource};
use crate::correlate::{correlate, MergedRecord, Side};
use crate::dataset::{Dataset, DatasetAssembler, GameContext};
use crate::error::{CoreError, Result};
use crate::events::normalize_events;
use crate::identity::{IdentityMap, IdentityOverride};
use crate::metrics::METRICS;
use crate::obs::{self, GameSpan, RowKind};
use crate::shifts::{ShiftRowSchema, ShiftTable};

/// One implementation per external source, injected into the runner.
#[derive(Clone)]
pub struct Providers {
    pub events: Arc<dyn EventFeed>,
    pub charts: Arc<dyn ShiftChartSource>,
    pub shifts: Arc<dyn ShiftDocumentSource>,
    pub rosters: Arc<dyn RosterDirectory>,
    pub schedule: Arc<dyn ScheduleSource>,
}

impl Providers {
    /// Use one value for every source.
    pub fn from_shared<T>(source: Arc<T>) -> Self
    where
        T: EventFeed
            + ShiftChartSource
            + ShiftDocumentSource
            + RosterDirectory
            + ScheduleSource
            + 'static,
    {
        Self {
            events: source.clone(),
            charts: source.clone(),
            shifts: source.clone(),
            rosters: source.clone(),
            schedule: source,
        }
    }
}

/// Which games a batch covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameSelection {
    /// Inclusive date range resolved through the schedule
    Range { start: NaiveDate, end: NaiveDate },
    Games(Vec<u64>),
}

/// Shift data fetched for one game.
#[derive(Debug, Clone)]
pub enum ShiftInput {
    Chart(ShiftChart),
    Report {
        document: ShiftDocument,
        roster: Vec<RosterEntry>,
    },
}

/// What happened to one processed game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameReport {
    pub game_id: u64,
    /// Merged records after deduplication
    pub records: usize,
    pub written: usize,
    /// Rows the sink already held
    pub skipped_existing: usize,
    pub events_dropped: usize,
    pub duplicates_dropped: usize,
    pub shift_rows_dropped: usize,
    /// Distinct players whose name did not resolve
    pub identity_misses: usize,
    pub quality_warnings: usize,
}

impl GameReport {
    /// Event and shift rows that did not make it into the output.
    pub fn rows_skipped(&self) -> usize {
        self.events_dropped + self.duplicates_dropped + self.shift_rows_dropped
    }
}

/// Correlated, not yet persisted, output of one game.
#[derive(Debug, Clone)]
pub struct GameOutput {
    pub context: GameContext,
    pub records: Vec<MergedRecord>,
    pub report: GameReport,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedGame {
    pub game_id: u64,
    pub reason: String,
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub games_requested: usize,
    pub games: Vec<GameReport>,
    pub skipped: Vec<SkippedGame>,
    /// Left out because the sink already held rows for them
    pub already_persisted: Vec<u64>,
    pub rows_written: usize,
    pub rows_skipped_existing: usize,
    /// Event and shift rows dropped across all processed games
    pub rows_skipped: usize,
    pub duration_ms: u64,
}

impl BatchSummary {
    pub fn games_processed(&self) -> usize {
        self.games.len()
    }

    /// Ids of processed games, in the order they were appended.
    pub fn processed_ids(&self) -> Vec<u64> {
        self.games.iter().map(|g| g.game_id).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub struct BatchRunner {
    providers: Providers,
    sink: Arc<dyn PlaySink>,
    settings: BatchSettings,
    schema: ShiftRowSchema,
    overrides: Vec<IdentityOverride>,
    retry: RetryPolicy,
}

impl BatchRunner {
    pub fn new(providers: Providers, sink: Arc<dyn PlaySink>, config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            providers,
            sink,
            settings: config.batch.clone(),
            schema: config.shift_schema.clone(),
            overrides: config.identity.overrides.clone(),
            retry: config.feeds.retry_policy(),
        })
    }

    /// Override the retry policy from the feed configuration.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn run(&self, selection: GameSelection) -> Result<BatchSummary> {
        let ids = self.resolve(selection).await?;
        self.run_games(&ids).await
    }

    /// Run a batch and also return every processed game's rows, in the order
    /// the games were appended to the sink.
    pub async fn collect(&self, selection: GameSelection) -> Result<(BatchSummary, Dataset)> {
        let ids = self.resolve(selection).await?;
        let mut dataset = Dataset::new();
        let summary = self.drive(&ids, Some(&mut dataset)).await?;
        Ok((summary, dataset))
    }

    /// Resolve the schedule for `start..=end` and run every game in it.
    pub async fn run_range(&self, start: NaiveDate, end: NaiveDate) -> Result<BatchSummary> {
        let ids = self.schedule(start, end).await?;
        self.run_games(&ids).await
    }

    /// Run an explicit list of games. Duplicate ids are processed once.
    pub async fn run_games(&self, game_ids: &[u64]) -> Result<BatchSummary> {
        self.drive(game_ids, None).await
    }

    async fn resolve(&self, selection: GameSelection) -> Result<Vec<u64>> {
        match selection {
            GameSelection::Range { start, end } => self.schedule(start, end).await,
            GameSelection::Games(ids) => Ok(ids),
        }
    }

    async fn schedule(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<u64>> {
        let game_type = self.settings.game_type.as_str();
        let what = format!("schedule {start}..{end}");
        let ids = with_retry(&self.retry, &what, || {
            self.providers.schedule.game_ids(start, end, game_type)
        })
        .await
        .map_err(CoreError::Schedule)?;

        info!(%start, %end, game_type, games = ids.len(), "Schedule resolved");
        Ok(ids)
    }

    async fn drive(&self, game_ids: &[u64], mut dataset: Option<&mut Dataset>) -> Result<BatchSummary> {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        let mut seen = HashSet::new();
        let requested: Vec<u64> = game_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let persisted = if self.settings.skip_persisted {
            self.sink.persisted_games().await?
        } else {
            BTreeSet::new()
        };
        let (already_persisted, pending): (Vec<u64>, Vec<u64>) =
            requested.iter().partition(|id| persisted.contains(*id));
        for game_id in &already_persisted {
            obs::emit_game_already_persisted(*game_id);
        }

        let workers = self.settings.workers.max(1);
        obs::emit_batch_started(&run_id, pending.len(), workers);

        let mut summary = BatchSummary {
            run_id,
            games_requested: requested.len(),
            already_persisted,
            ..BatchSummary::default()
        };
        let mut assembler = DatasetAssembler::new(Arc::clone(&self.sink));

        // Buffered keeps completion order equal to request order, so games
        // are appended one at a time in a stable order.
        let mut results = stream::iter(pending)
            .map(|game_id| async move { (game_id, self.process_game(game_id).await) })
            .buffered(workers);

        while let Some((game_id, outcome)) = results.next().await {
            let output = match outcome {
                Ok(output) => output,
                Err(err) => {
                    skip_game(&mut summary, game_id, &err);
                    continue;
                }
            };

            match assembler.append_game(&output.context, &output.records).await {
                Ok(appended) => {
                    if let Some(dataset) = dataset.as_deref_mut() {
                        dataset.append_game(&output.context, &output.records);
                    }
                    let mut report = output.report;
                    report.written = appended.written;
                    report.skipped_existing = appended.skipped_existing;

                    obs::emit_game_finished(
                        game_id,
                        output.elapsed.as_millis() as u64,
                        report.records,
                        report.written,
                    );
                    METRICS.inc_games_processed();
                    METRICS.add_events_emitted(report.records as u64);

                    summary.rows_written += report.written;
                    summary.rows_skipped_existing += report.skipped_existing;
                    summary.rows_skipped += report.rows_skipped();
                    summary.games.push(report);
                }
                Err(err) => skip_game(&mut summary, game_id, &err),
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        obs::emit_batch_finished(
            &summary.run_id,
            summary.duration_ms,
            summary.games.len(),
            summary.skipped.len(),
            summary.rows_written,
        );
        METRICS.flush();
        Ok(summary)
    }

    /// Reprocess one game and append it, regardless of what the sink holds.
    /// Failures are returned instead of skipped.
    pub async fn reprocess_game(&self, game_id: u64) -> Result<GameReport> {
        let output = self.process_game(game_id).await?;
        let appended = self.sink.append(&rows_of(&output)).await?;

        let mut report = output.report;
        report.written = appended.written;
        report.skipped_existing = appended.skipped_existing;
        obs::emit_game_finished(
            game_id,
            output.elapsed.as_millis() as u64,
            report.records,
            report.written,
        );
        Ok(report)
    }

    /// Fetch and correlate one game without persisting it.
    pub async fn process_game(&self, game_id: u64) -> Result<GameOutput> {
        let started = Instant::now();
        let span = tracing::info_span!("icetime.fetch", game_id = game_id);

        obs::emit_game_started(game_id);
        let (feed, input) = self.fetch(game_id).instrument(span).await?;

        let mut output = self.correlate_documents(game_id, &feed, &input)?;
        output.elapsed = started.elapsed();
        Ok(output)
    }

    async fn fetch(&self, game_id: u64) -> Result<(GameFeed, ShiftInput)> {
        let retry = &self.retry;
        let failure = |provider: FeedSource| {
            move |source: FeedError| CoreError::RetrievalFailure {
                game_id,
                provider,
                source,
            }
        };

        let events = async {
            with_retry(retry, &format!("event feed {game_id}"), || {
                self.providers.events.fetch_events(game_id)
            })
            .await
            .map_err(failure(FeedSource::EventFeed))
        };

        match self.settings.shift_source {
            ShiftSource::Chart => {
                let chart = async {
                    with_retry(retry, &format!("shift chart {game_id}"), || {
                        self.providers.charts.fetch_shift_chart(game_id)
                    })
                    .await
                    .map_err(failure(FeedSource::ShiftChart))
                };
                let (feed, chart) = tokio::try_join!(events, chart)?;
                Ok((feed, ShiftInput::Chart(chart)))
            }
            ShiftSource::Report => {
                let shifts = async {
                    with_retry(retry, &format!("shift document {game_id}"), || {
                        self.providers.shifts.fetch_shift_document(game_id)
                    })
                    .await
                    .map_err(failure(FeedSource::ShiftDocument))
                };
                let roster = async {
                    with_retry(retry, &format!("roster {game_id}"), || {
                        self.providers.rosters.fetch_roster(game_id)
                    })
                    .await
                    .map_err(failure(FeedSource::Roster))
                };
                let (feed, document, roster) = tokio::try_join!(events, shifts, roster)?;
                Ok((feed, ShiftInput::Report { document, roster }))
            }
        }
    }

    /// Correlate already-fetched documents for one game.
    ///
    /// Row-level problems are logged and counted; only a feed without team
    /// codes or unusable shift data fails the game.
    pub fn correlate_documents(
        &self,
        game_id: u64,
        feed: &GameFeed,
        input: &ShiftInput,
    ) -> Result<GameOutput> {
        let _span = GameSpan::enter(game_id);

        let context = GameContext::from_feed(game_id, feed).ok_or_else(|| {
            CoreError::schema(format!("event feed for game {game_id} has no home/away team codes"))
        })?;
        let shifts = match input {
            ShiftInput::Chart(chart) => {
                let identities = IdentityMap::new(&self.overrides).with_roster(&chart.roster());
                ShiftTable::from_chart(
                    chart,
                    &feed.goaltender_ids(),
                    &identities,
                    self.schema.max_bad_row_ratio,
                )?
            }
            ShiftInput::Report { document, roster } => {
                let identities = IdentityMap::new(&self.overrides).with_roster(roster);
                ShiftTable::from_document(document, &self.schema, &identities)?
            }
        };
        let normalized = normalize_events(feed.plays());

        let correlation = correlate(
            &normalized.events,
            Side::new(&context.home_team, &shifts.table),
            Side::new(&context.away_team, &shifts.table),
        );

        for dropped in &normalized.dropped {
            obs::emit_row_skipped(game_id, RowKind::Event, dropped.source_index.into(), &dropped.reason);
        }
        for dropped in &shifts.dropped {
            obs::emit_row_skipped(game_id, RowKind::Shift, dropped.index as u64, &dropped.reason);
        }
        for duplicate in &correlation.duplicates {
            let reason = format!(
                "join key {} already used by event {}",
                duplicate.join_key, duplicate.kept_index
            );
            obs::emit_row_skipped(game_id, RowKind::Event, duplicate.source_index.into(), &reason);
        }
        for (team, name) in &shifts.unresolved {
            obs::emit_identity_miss(game_id, team, name);
        }

        let mut quality_warnings = 0;
        let shift_teams = shifts.table.teams();
        for team in [&context.home_team, &context.away_team] {
            if !shift_teams.contains(team.as_str()) {
                obs::emit_quality_warning(game_id, team, &"no shift rows for team");
                quality_warnings += 1;
            }
        }
        for overlap in &shifts.overlaps {
            let key = format!("{}:{}:P{}", overlap.team, overlap.player, overlap.period);
            let detail = format!(
                "overlapping shifts {}..{} and {}..{}",
                overlap.first.0, overlap.first.1, overlap.second.0, overlap.second.1
            );
            obs::emit_quality_warning(game_id, &key, &detail);
            quality_warnings += 1;
        }
        for warning in &correlation.warnings {
            obs::emit_quality_warning(game_id, &warning.join_key, &warning.issue);
            quality_warnings += 1;
        }

        let report = GameReport {
            game_id,
            records: correlation.records.len(),
            written: 0,
            skipped_existing: 0,
            events_dropped: normalized.dropped.len(),
            duplicates_dropped: correlation.duplicates.len(),
            shift_rows_dropped: shifts.dropped.len(),
            identity_misses: shifts.unresolved.len(),
            quality_warnings,
        };
        METRICS.add_rows_skipped(report.rows_skipped() as u64);
        METRICS.add_identity_misses(report.identity_misses as u64);

        Ok(GameOutput {
            context,
            records: correlation.records,
            report,
            elapsed: Duration::ZERO,
        })
    }
}

fn rows_of(output: &GameOutput) -> Vec<icetime_store::PlayRow> {
    output
        .records
        .iter()
        .map(|r| crate::dataset::to_row(&output.context, r))
        .collect()
}

fn skip_game(summary: &mut BatchSummary, game_id: u64, err: &CoreError) {
    obs::emit_game_skipped(game_id, err);
    METRICS.inc_games_skipped();
    summary.skipped.push(SkippedGame {
        game_id,
        reason: err.to_string(),
    });
}
