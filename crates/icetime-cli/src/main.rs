//! icetime - play / shift correlation CLI
//!
//! Builds one denormalized row per key game event, carrying the skaters and
//! goaltender of both teams on ice at that moment.
//!
//! ## Commands
//!
//! - `batch`: Process a date range or a list of games
//! - `game`: Reprocess a single game, failing loudly instead of skipping
//! - `config`: Print the effective configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use icetime_core::{
    BatchRunner, BatchSummary, GameReport, GameSelection, PipelineConfig, Providers, SinkKind,
};
use icetime_feeds::HttpFeeds;

#[derive(Parser)]
#[command(name = "icetime")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Correlate hockey play-by-play events with on-ice shifts", long_about = None)]
struct Cli {
    /// Config file (falls back to $ICETIME_CONFIG, then ./icetime.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and a JSON summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every game in a date range, or an explicit list of games
    Batch {
        /// First schedule date (inclusive)
        #[arg(long, requires = "end", conflicts_with = "games")]
        start: Option<NaiveDate>,

        /// Last schedule date (inclusive)
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,

        /// Game ids, comma separated
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        games: Vec<u64>,

        /// Games processed concurrently
        #[arg(short, long)]
        workers: Option<usize>,

        /// Schedule game type filter ("R", "P", "PR")
        #[arg(long)]
        game_type: Option<String>,

        /// Process games even if the sink already holds rows for them
        #[arg(long)]
        force: bool,

        /// Print every assembled row to stdout as one JSON object per line
        /// (the summary then goes to stderr)
        #[arg(long)]
        rows: bool,

        #[command(flatten)]
        sink: SinkArgs,
    },

    /// Reprocess one game and append any rows the sink does not hold yet
    Game {
        /// Game id
        game_id: u64,

        #[command(flatten)]
        sink: SinkArgs,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Sink overrides shared by the processing commands.
#[derive(Args, Debug, Default, Clone)]
struct SinkArgs {
    /// Sink kind: csv, surreal or none
    #[arg(long, value_parser = parse_sink_kind)]
    sink: Option<SinkKind>,

    /// CSV path or SurrealDB URL
    #[arg(short, long)]
    output: Option<String>,
}

fn parse_sink_kind(raw: &str) -> std::result::Result<SinkKind, String> {
    match raw.to_ascii_lowercase().as_str() {
        "csv" => Ok(SinkKind::Csv),
        "surreal" => Ok(SinkKind::Surreal),
        "none" => Ok(SinkKind::None),
        other => Err(format!("unknown sink {other:?} (expected csv, surreal or none)")),
    }
}

impl SinkArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(kind) = self.sink {
            config.sink.kind = kind;
        }
        if let Some(output) = &self.output {
            config.sink.path = output.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    icetime_core::init_tracing(cli.json, level);

    let (mut config, source) =
        PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    match &source {
        Some(path) => info!(path = %path.display(), "Using config file"),
        None => info!("No config file found, using defaults"),
    }

    match cli.command {
        Commands::Batch {
            start,
            end,
            games,
            workers,
            game_type,
            force,
            rows,
            sink,
        } => {
            let selection = selection_from_args(start, end, games)?;
            sink.apply(&mut config);
            if let Some(workers) = workers {
                config.batch.workers = workers;
            }
            if let Some(game_type) = game_type {
                config.batch.game_type = game_type;
            }
            if force {
                config.batch.skip_persisted = false;
            }
            let runner = build_runner(&config).await?;
            cmd_batch(&runner, selection, cli.json, rows).await
        }
        Commands::Game { game_id, sink } => {
            sink.apply(&mut config);
            let runner = build_runner(&config).await?;
            cmd_game(&runner, game_id, cli.json).await
        }
        Commands::Config => cmd_config(&config),
    }
}

fn selection_from_args(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    games: Vec<u64>,
) -> Result<GameSelection> {
    match (start, end) {
        (Some(start), Some(end)) => {
            if end < start {
                bail!("--end ({end}) is before --start ({start})");
            }
            Ok(GameSelection::Range { start, end })
        }
        (None, None) if !games.is_empty() => Ok(GameSelection::Games(games)),
        _ => bail!("pass either --start and --end, or --games"),
    }
}

async fn build_runner(config: &PipelineConfig) -> Result<BatchRunner> {
    config.validate()?;
    let feeds = HttpFeeds::new(config.feeds.clone()).context("Failed to build HTTP client")?;
    let sink = config.sink.open().await.context("Failed to open sink")?;
    let runner = BatchRunner::new(Providers::from_shared(Arc::new(feeds)), sink, config)?;
    Ok(runner)
}

async fn cmd_batch(
    runner: &BatchRunner,
    selection: GameSelection,
    json: bool,
    rows: bool,
) -> Result<()> {
    if !rows {
        let summary = runner.run(selection).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print!("{}", render_summary(&summary));
        }
        return Ok(());
    }

    let (summary, dataset) = runner.collect(selection).await?;
    for row in dataset.rows() {
        println!("{}", serde_json::to_string(row)?);
    }
    if json {
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        eprint!("{}", render_summary(&summary));
    }
    Ok(())
}

async fn cmd_game(runner: &BatchRunner, game_id: u64, json: bool) -> Result<()> {
    let report = runner
        .reprocess_game(game_id)
        .await
        .with_context(|| format!("Failed to process game {game_id}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_report(&report));
    }
    Ok(())
}

fn cmd_config(config: &PipelineConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn render_report(report: &GameReport) -> String {
    format!(
        "  {}  {} records, {} written, {} already stored, {} rows dropped, {} unresolved players",
        report.game_id,
        report.records,
        report.written,
        report.skipped_existing,
        report.rows_skipped(),
        report.identity_misses,
    )
}

fn render_summary(summary: &BatchSummary) -> String {
    let mut out = format!(
        "Run {}: {} of {} games processed in {} ms\n",
        summary.run_id,
        summary.games_processed(),
        summary.games_requested,
        summary.duration_ms
    );
    for report in &summary.games {
        out.push_str(&render_report(report));
        out.push('\n');
    }
    if !summary.already_persisted.is_empty() {
        let ids: Vec<String> = summary.already_persisted.iter().map(u64::to_string).collect();
        out.push_str(&format!("Already stored: {}\n", ids.join(", ")));
    }
    for skipped in &summary.skipped {
        out.push_str(&format!("Skipped {}: {}\n", skipped.game_id, skipped.reason));
    }
    out.push_str(&format!(
        "Rows written: {}, already stored: {}, dropped: {}\n",
        summary.rows_written, summary.rows_skipped_existing, summary.rows_skipped
    ));
    out
}
