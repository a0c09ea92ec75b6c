//! Endpoint hit statistics.
//!
//! The stats service records one [`Hit`] per access to a tracked endpoint and
//! reports aggregated counts per (app, uri) over a time range.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::domain::DATE_TIME_FORMAT;
use crate::error::{Result, TurnoutError};

/// A recorded access to a named endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    /// Name of the service that served the request
    pub app: String,
    pub uri: String,
    /// Client address
    pub ip: String,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
}

impl Hit {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("app", &self.app), ("uri", &self.uri), ("ip", &self.ip)] {
            if value.trim().is_empty() {
                return Err(TurnoutError::ValidationError(format!(
                    "Field: {field}. Error: must not be blank."
                )));
            }
        }
        Ok(())
    }
}

/// Hit count for one (app, uri) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStats {
    pub app: String,
    pub uri: String,
    pub hits: i64,
}

/// Parameters for a stats query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsFilter {
    /// Inclusive lower bound
    pub start: NaiveDateTime,
    /// Inclusive upper bound
    pub end: NaiveDateTime,
    /// Restrict to these URIs; `None` means all
    pub uris: Option<Vec<String>>,
    /// Count each IP at most once per (app, uri)
    pub unique: bool,
}

impl StatsFilter {
    /// Whether a hit falls inside this filter.
    pub fn matches(&self, hit: &Hit) -> bool {
        hit.timestamp >= self.start
            && hit.timestamp <= self.end
            && self
                .uris
                .as_ref()
                .is_none_or(|uris| uris.iter().any(|u| *u == hit.uri))
    }
}

/// Count the hits matching `filter` per (app, uri), most-hit first.
pub fn aggregate<'a>(
    hits: impl IntoIterator<Item = &'a Hit>,
    filter: &StatsFilter,
) -> Vec<ViewStats> {
    let mut grouped: BTreeMap<(&str, &str), Vec<&str>> = BTreeMap::new();
    for hit in hits.into_iter().filter(|h| filter.matches(h)) {
        grouped
            .entry((hit.app.as_str(), hit.uri.as_str()))
            .or_default()
            .push(hit.ip.as_str());
    }

    let mut stats: Vec<ViewStats> = grouped
        .into_iter()
        .map(|((app, uri), mut ips)| {
            if filter.unique {
                ips.sort_unstable();
                ips.dedup();
            }
            ViewStats {
                app: app.to_string(),
                uri: uri.to_string(),
                hits: ips.len() as i64,
            }
        })
        .collect();
    stats.sort_by(|a, b| b.hits.cmp(&a.hits));
    stats
}

/// Parse a `yyyy-MM-dd HH:mm:ss` timestamp.
///
/// Out-of-range fields (month 13, hour 25) are rejected, not rolled over.
pub fn parse_timestamp(field: &str, raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT).map_err(|e| {
        TurnoutError::ValidationError(format!(
            "Parameter '{field}' = '{raw}' is not a valid date, expected yyyy-MM-dd HH:mm:ss: {e}"
        ))
    })
}

/// Persistence for hits.
#[async_trait]
pub trait StatsStorage: Send + Sync {
    /// Store one hit.
    async fn record_hit(&self, hit: &Hit) -> Result<()>;

    /// Aggregate hits matching the filter, most-hit first.
    async fn query_stats(&self, filter: &StatsFilter) -> Result<Vec<ViewStats>>;
}

/// Validate and store a hit.
#[tracing::instrument(skip(storage, hit), fields(app = %hit.app, uri = %hit.uri))]
pub async fn record<S: StatsStorage + ?Sized>(storage: &S, hit: &Hit) -> Result<()> {
    hit.validate()?;
    storage.record_hit(hit).await?;
    counter!("turnout_hits_total", "app" => hit.app.clone()).increment(1);
    tracing::debug!(ip = %hit.ip, timestamp = %hit.timestamp, "Recorded hit");
    Ok(())
}

/// Parse the raw query bounds and aggregate hits.
///
/// Unparseable bounds fail with a validation error before storage is touched.
#[tracing::instrument(skip(storage, uris))]
pub async fn query<S: StatsStorage + ?Sized>(
    storage: &S,
    start: &str,
    end: &str,
    uris: Option<Vec<String>>,
    unique: bool,
) -> Result<Vec<ViewStats>> {
    let filter = StatsFilter {
        start: parse_timestamp("start", start)?,
        end: parse_timestamp("end", end)?,
        uris,
        unique,
    };
    storage.query_stats(&filter).await
}

/// Serde adapter for `NaiveDateTime` rendered as `yyyy-MM-dd HH:mm:ss`.
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::DATE_TIME_FORMAT;

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(DATE_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}
