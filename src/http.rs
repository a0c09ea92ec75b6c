//! Client for the stats service.
//!
//! The main service reports one hit per public event view and reads the unique view
//! counts back for the events it returns. The `StatsClient` trait keeps that
//! dependency mockable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;

use crate::domain::DATE_TIME_FORMAT;
use crate::error::{Result, TurnoutError};
use crate::stats::{Hit, StatsFilter, ViewStats, aggregate};

/// Trait for talking to the stats service.
///
/// # Example
/// ```ignore
/// let client = ReqwestStatsClient::new("http://localhost:9090", Duration::from_secs(2))?;
/// client.hit(&hit).await?;
/// ```
#[async_trait]
pub trait StatsClient: Send + Sync + Clone {
    /// Record one hit.
    async fn hit(&self, hit: &Hit) -> Result<()>;

    /// Fetch aggregated counts for `[start, end]`, optionally restricted to `uris`.
    async fn stats(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        uris: &[String],
        unique: bool,
    ) -> Result<Vec<ViewStats>>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Stats client that talks to a running stats service over HTTP.
#[derive(Clone)]
pub struct ReqwestStatsClient {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestStatsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl StatsClient for ReqwestStatsClient {
    #[tracing::instrument(skip(self, hit), fields(uri = %hit.uri, base_url = %self.base_url))]
    async fn hit(&self, hit: &Hit) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/hit", self.base_url))
            .json(hit)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Stats service rejected hit");
            return Err(TurnoutError::Other(anyhow::anyhow!(
                "Stats service returned {} for hit: {}",
                status,
                body
            )));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, uris), fields(base_url = %self.base_url))]
    async fn stats(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        uris: &[String],
        unique: bool,
    ) -> Result<Vec<ViewStats>> {
        let mut params = vec![
            ("start", start.format(DATE_TIME_FORMAT).to_string()),
            ("end", end.format(DATE_TIME_FORMAT).to_string()),
            ("unique", unique.to_string()),
        ];
        params.extend(uris.iter().map(|uri| ("uris", uri.clone())));

        let response = self
            .client
            .get(format!("{}/stats", self.base_url))
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// In-process stats client that records hits instead of sending them.
#[derive(Clone, Default)]
pub struct MockStatsClient {
    hits: Arc<Mutex<Vec<Hit>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockStatsClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail, simulating an unreachable stats service.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// All hits recorded so far.
    pub fn recorded_hits(&self) -> Vec<Hit> {
        self.hits.lock().clone()
    }

    fn check_available(&self) -> Result<()> {
        if *self.fail.lock() {
            return Err(TurnoutError::Other(anyhow::anyhow!(
                "stats service unavailable"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StatsClient for MockStatsClient {
    async fn hit(&self, hit: &Hit) -> Result<()> {
        self.check_available()?;
        self.hits.lock().push(hit.clone());
        Ok(())
    }

    async fn stats(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        uris: &[String],
        unique: bool,
    ) -> Result<Vec<ViewStats>> {
        self.check_available()?;
        let filter = StatsFilter {
            start,
            end,
            uris: (!uris.is_empty()).then(|| uris.to_vec()),
            unique,
        };
        Ok(aggregate(self.hits.lock().iter(), &filter))
    }
}
