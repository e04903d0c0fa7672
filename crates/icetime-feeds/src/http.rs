//! HTTP implementation of the provider contracts
//!
//! Every endpoint is a URL template filled per request. The client makes a
//! single attempt per call with a per-request timeout; retries are layered
//! on top by the caller through [`crate::retry::with_retry`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::{
    GameFeed, RosterEntry, ScheduleResponse, ShiftChart, ShiftChartResponse, ShiftDocument,
};
use crate::error::FeedError;
use crate::providers::{
    EventFeed, RosterDirectory, ScheduleSource, ShiftChartSource, ShiftDocumentSource,
};
use crate::retry::RetryPolicy;
use crate::Result;

/// Endpoint templates and transport settings (`[feeds]` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Live event feed, `{game_id}` substituted
    pub event_feed_url: String,
    /// Shift chart JSON, `{game_id}` substituted
    pub shift_chart_url: String,
    /// Shift report markup, `{season}` and `{game_suffix}` substituted
    pub shift_report_url: String,
    /// Roster directory, `{game_id}` substituted
    pub roster_url: String,
    /// Schedule, `{start}` and `{end}` substituted as `YYYY-MM-DD`
    pub schedule_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub user_agent: String,
    /// Honour `HTTP(S)_PROXY` from the environment
    pub use_system_proxy: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            event_feed_url: "https://statsapi.web.nhl.com/api/v1/game/{game_id}/feed/live?site=en_nhl"
                .to_string(),
            shift_chart_url:
                "https://api.nhle.com/stats/rest/en/shiftcharts?cayenneExp=gameId={game_id}"
                    .to_string(),
            shift_report_url: "https://www.nhl.com/scores/htmlreports/{season}/PL{game_suffix}.HTM"
                .to_string(),
            roster_url: "https://api.nhle.com/stats/rest/en/shiftcharts?cayenneExp=gameId={game_id}"
                .to_string(),
            schedule_url:
                "https://statsapi.web.nhl.com/api/v1/schedule?startDate={start}&endDate={end}"
                    .to_string(),
            timeout_secs: 15,
            max_attempts: 3,
            retry_backoff_ms: 500,
            user_agent: concat!("icetime/", env!("CARGO_PKG_VERSION")).to_string(),
            use_system_proxy: true,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_backoff_ms))
    }

    /// Point every endpoint at `base` (used by tests and local mirrors).
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.event_feed_url = format!("{base}/game/{{game_id}}/feed/live");
        self.shift_chart_url = format!("{base}/shiftcharts?gameId={{game_id}}");
        self.shift_report_url = format!("{base}/htmlreports/{{season}}/PL{{game_suffix}}.HTM");
        self.roster_url = format!("{base}/shiftcharts?gameId={{game_id}}");
        self.schedule_url = format!("{base}/schedule?startDate={{start}}&endDate={{end}}");
        self
    }
}

/// Season and report suffix for a game id: `2022020511` gives
/// (`"20222023"`, `"020511"`).
pub fn season_and_suffix(game_id: u64) -> Result<(String, String)> {
    let digits = game_id.to_string();
    if digits.len() <= 4 {
        return Err(FeedError::InvalidRequest(format!(
            "game id {game_id} has no season prefix"
        )));
    }
    let (year, suffix) = digits.split_at(4);
    let year: u32 = year
        .parse()
        .map_err(|_| FeedError::InvalidRequest(format!("game id {game_id} has no season prefix")))?;
    Ok((format!("{}{}", year, year + 1), suffix.to_string()))
}

/// `reqwest`-backed client for all four sources.
#[derive(Debug, Clone)]
pub struct HttpFeeds {
    client: reqwest::Client,
    config: FeedConfig,
}

impl HttpFeeds {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| FeedError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::from_status(url, status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FeedError::from_reqwest(url, e))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| FeedError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

fn fill(template: &str, pairs: &[(&str, &str)]) -> String {
    pairs.iter().fold(template.to_string(), |url, (key, value)| {
        url.replace(&format!("{{{key}}}"), value)
    })
}

#[async_trait]
impl EventFeed for HttpFeeds {
    async fn fetch_events(&self, game_id: u64) -> Result<GameFeed> {
        let id = game_id.to_string();
        let url = fill(&self.config.event_feed_url, &[("game_id", id.as_str())]);
        self.get_json(&url).await
    }
}

#[async_trait]
impl ShiftChartSource for HttpFeeds {
    async fn fetch_shift_chart(&self, game_id: u64) -> Result<ShiftChart> {
        let id = game_id.to_string();
        let url = fill(&self.config.shift_chart_url, &[("game_id", id.as_str())]);
        let response: ShiftChartResponse = self.get_json(&url).await?;
        Ok(response.into_chart(game_id))
    }
}

#[async_trait]
impl ShiftDocumentSource for HttpFeeds {
    async fn fetch_shift_document(&self, game_id: u64) -> Result<ShiftDocument> {
        let (season, suffix) = season_and_suffix(game_id)?;
        let url = fill(
            &self.config.shift_report_url,
            &[("season", season.as_str()), ("game_suffix", suffix.as_str())],
        );
        let markup = self.get_text(&url).await?;
        Ok(ShiftDocument::new(game_id, markup))
    }
}

#[async_trait]
impl RosterDirectory for HttpFeeds {
    async fn fetch_roster(&self, game_id: u64) -> Result<Vec<RosterEntry>> {
        let id = game_id.to_string();
        let url = fill(&self.config.roster_url, &[("game_id", id.as_str())]);
        let response: ShiftChartResponse = self.get_json(&url).await?;
        Ok(response.into_chart(game_id).roster())
    }
}

#[async_trait]
impl ScheduleSource for HttpFeeds {
    async fn game_ids(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        game_type: &str,
    ) -> Result<Vec<u64>> {
        if end < start {
            return Err(FeedError::InvalidRequest(format!(
                "schedule range ends ({end}) before it starts ({start})"
            )));
        }
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let url = fill(&self.config.schedule_url, &[("start", start.as_str()), ("end", end.as_str())]);
        let response: ScheduleResponse = self.get_json(&url).await?;
        Ok(response.game_ids(game_type))
    }
}
