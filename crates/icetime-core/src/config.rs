//! Pipeline configuration
//!
//! One TOML document with a section per concern. The file is located in
//! this order:
//!
//! 1. an explicit path (the CLI `--config` flag)
//! 2. the `ICETIME_CONFIG` environment variable
//! 3. `./icetime.toml` if it exists
//! 4. compiled defaults
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use icetime_feeds::FeedConfig;
use icetime_store::fakes::MemorySink;
use icetime_store::{CsvPlaySink, PlaySink, SurrealConfig, SurrealPlaySink};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, Result};
use crate::identity::IdentityOverride;
use crate::shifts::ShiftRowSchema;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "ICETIME_CONFIG";

/// Config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "icetime.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub feeds: FeedConfig,
    pub batch: BatchSettings,
    pub shift_schema: ShiftRowSchema,
    pub identity: IdentitySettings,
    pub sink: SinkSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Games processed concurrently
    pub workers: usize,
    /// Schedule filter for date-range batches ("R" = regular season)
    pub game_type: String,
    /// Skip games the sink already holds rows for
    pub skip_persisted: bool,
    /// Document the shift intervals are built from
    pub shift_source: ShiftSource,
}

/// Where shift intervals come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftSource {
    /// Shift chart JSON (`feeds.shift_chart_url`)
    #[default]
    Chart,
    /// Fixed-width shift report markup (`feeds.shift_report_url`, `[shift_schema]`)
    Report,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            game_type: "R".to_string(),
            skip_persisted: true,
            shift_source: ShiftSource::Chart,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Manual corrections consulted before the roster directory
    pub overrides: Vec<IdentityOverride>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Csv,
    Surreal,
    /// Keep rows in memory only (dry run)
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    pub kind: SinkKind,
    /// CSV file path, or SurrealDB URL (`mem://`, `surrealkv://dir`, `ws://host:port`)
    pub path: String,
    pub namespace: String,
    pub database: String,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            kind: SinkKind::Csv,
            path: "icetime_plays.csv".to_string(),
            namespace: "icetime".to_string(),
            database: "pbp".to_string(),
        }
    }
}

impl SinkSettings {
    /// Open the configured sink.
    pub async fn open(&self) -> Result<Arc<dyn PlaySink>> {
        let sink: Arc<dyn PlaySink> = match self.kind {
            SinkKind::Csv => Arc::new(CsvPlaySink::new(&self.path)?),
            SinkKind::Surreal => {
                let config = SurrealConfig::new(self.path.clone())
                    .with_namespace(self.namespace.clone())
                    .with_database(self.database.clone())
                    .with_env_credentials();
                Arc::new(SurrealPlaySink::connect(config).await?)
            }
            SinkKind::None => Arc::new(MemorySink::new()),
        };
        info!(destination = %sink.destination(), "Sink opened");
        Ok(sink)
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| CoreError::Config(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("failed to serialize config: {e}")))
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Locate and load the configuration. Returns the file used, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let env = std::env::var(CONFIG_ENV).ok();
        match resolve_path(explicit, env.as_deref(), Path::new(".")) {
            Some(path) => {
                let config = Self::load_file(&path)?;
                info!(path = %path.display(), "Loaded configuration");
                Ok((config, Some(path)))
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok((config, None))
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.workers == 0 {
            return Err(CoreError::Config("batch.workers must be at least 1".to_string()));
        }
        if self.batch.game_type.trim().is_empty() {
            return Err(CoreError::Config("batch.game_type must not be empty".to_string()));
        }
        if self.feeds.max_attempts == 0 {
            return Err(CoreError::Config("feeds.max_attempts must be at least 1".to_string()));
        }
        if self.feeds.timeout_secs == 0 {
            return Err(CoreError::Config("feeds.timeout_secs must be at least 1".to_string()));
        }
        if self.sink.kind != SinkKind::None && self.sink.path.trim().is_empty() {
            return Err(CoreError::Config("sink.path must not be empty".to_string()));
        }
        for o in &self.identity.overrides {
            if o.team.trim().is_empty() || o.name.trim().is_empty() {
                return Err(CoreError::Config(format!(
                    "identity override for player {} needs a team and a name",
                    o.player_id
                )));
            }
        }
        self.shift_schema.validate()
    }
}

/// Pick the config file: explicit path, then `env_value`, then
/// `icetime.toml` inside `cwd` when present.
pub fn resolve_path(explicit: Option<&Path>, env_value: Option<&str>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(value));
    }
    let local = cwd.join(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}
