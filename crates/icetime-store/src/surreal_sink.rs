//! SurrealDB-backed PlaySink implementation
//!
//! Rows are stored one record per natural key in the `plays` table. The
//! record id is the natural key itself, and a unique index on
//! `natural_key` backs it up, so a rerun can never insert a second copy.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use serde::Deserialize;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::migrations::{self, PLAYS_TABLE};
use crate::row::PlayRow;
use crate::sink::{AppendOutcome, PlaySink};
use crate::Result;

/// Connection settings for the SurrealDB sink
#[derive(Debug, Clone)]
pub struct SurrealConfig {
    /// Endpoint URL (`mem://`, `surrealkv://path`, `ws://host:port`)
    pub url: String,
    /// Namespace (default: "icetime")
    pub namespace: String,
    /// Database name (default: "pbp")
    pub database: String,
    /// Root credentials for remote endpoints
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SurrealConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: "icetime".to_string(),
            database: "pbp".to_string(),
            username: None,
            password: None,
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Set root credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Fill credentials from `ICETIME_SURREAL_USERNAME` / `ICETIME_SURREAL_PASSWORD`
    /// when they are set.
    pub fn with_env_credentials(mut self) -> Self {
        if let (Ok(user), Ok(pass)) = (
            std::env::var("ICETIME_SURREAL_USERNAME"),
            std::env::var("ICETIME_SURREAL_PASSWORD"),
        ) {
            self.username = Some(user);
            self.password = Some(pass);
        }
        self
    }
}

/// SurrealDB-backed implementation of [`PlaySink`].
#[derive(Clone)]
pub struct SurrealPlaySink {
    db: Surreal<Any>,
    destination: String,
}

impl SurrealPlaySink {
    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(SurrealConfig::new("mem://")).await
    }

    /// Connect, authenticate when credentials are present, and initialize the schema.
    #[instrument(skip(config), fields(url = %config.url, namespace = %config.namespace, database = %config.database))]
    pub async fn connect(config: SurrealConfig) -> Result<Self> {
        if let Some(path) = config.url.strip_prefix("surrealkv://") {
            std::fs::create_dir_all(path).map_err(|e| {
                StoreError::Connection(format!(
                    "Failed to create database directory {}: {}",
                    path, e
                ))
            })?;
        }

        let db = surrealdb::engine::any::connect(config.url.as_str())
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to connect to {}: {}", config.url, e))
            })?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await
            .map_err(|e| StoreError::Connection(format!("Root authentication failed: {}", e)))?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to select namespace/database: {}", e))
            })?;

        migrations::init_schema(&db).await?;

        info!("SurrealPlaySink connected ({})", config.url);
        Ok(Self {
            db,
            destination: config.url,
        })
    }

    /// Natural keys already persisted for one game.
    async fn existing_keys(&self, game_id: u64) -> Result<HashSet<String>> {
        let mut result = self
            .db
            .query("SELECT VALUE natural_key FROM type::table($table) WHERE game_id = $game_id")
            .bind(("table", PLAYS_TABLE))
            .bind(("game_id", game_id))
            .await?;

        let keys: Vec<String> = result.take(0)?;
        Ok(keys.into_iter().collect())
    }

    /// All rows for one game, ordered by event index.
    pub async fn rows_for_game(&self, game_id: u64) -> Result<Vec<PlayRow>> {
        let mut result = self
            .db
            .query(
                "SELECT * OMIT id FROM type::table($table) WHERE game_id = $game_id \
                 ORDER BY period, period_seconds, event_index",
            )
            .bind(("table", PLAYS_TABLE))
            .bind(("game_id", game_id))
            .await?;

        let rows: Vec<PlayRow> = result.take(0)?;
        Ok(rows)
    }

    async fn insert(&self, row: &PlayRow) -> Result<()> {
        // Clone to owned values to satisfy SurrealDB lifetime requirements
        let key = row.natural_key.clone();
        let content = row.clone();

        self.db
            .query("CREATE type::thing($table, $key) CONTENT $row")
            .bind(("table", PLAYS_TABLE))
            .bind(("key", key))
            .bind(("row", content))
            .await?
            .check()?;
        Ok(())
    }
}

#[async_trait]
impl PlaySink for SurrealPlaySink {
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn append(&self, rows: &[PlayRow]) -> Result<AppendOutcome> {
        let mut by_game: BTreeMap<u64, Vec<&PlayRow>> = BTreeMap::new();
        for row in rows {
            by_game.entry(row.game_id).or_default().push(row);
        }

        let mut outcome = AppendOutcome::default();
        for (game_id, game_rows) in by_game {
            let mut seen = self.existing_keys(game_id).await?;
            for row in game_rows {
                if !seen.insert(row.natural_key.clone()) {
                    outcome.skipped_existing += 1;
                    continue;
                }
                self.insert(row).await?;
                outcome.written += 1;
            }
            debug!(game_id, written = outcome.written, "Appended game rows");
        }
        Ok(outcome)
    }

    async fn persisted_games(&self) -> Result<BTreeSet<u64>> {
        #[derive(Deserialize)]
        struct GameIdResult {
            game_id: u64,
        }

        let mut result = self
            .db
            .query("SELECT game_id FROM type::table($table) GROUP BY game_id")
            .bind(("table", PLAYS_TABLE))
            .await?;

        let games: Vec<GameIdResult> = result.take(0)?;
        Ok(games.into_iter().map(|g| g.game_id).collect())
    }

    fn destination(&self) -> String {
        self.destination.clone()
    }
}
