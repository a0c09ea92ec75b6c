//! Stats service endpoints.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::api::ApiError;
use crate::stats::{self, Hit, StatsStorage, ViewStats};

/// Parsed `/stats` query string.
///
/// `uris` may be repeated (`uris=/a&uris=/b`) or comma-separated (`uris=/a,/b`).
#[derive(Debug, Default, PartialEq, Eq)]
struct StatsParams {
    start: String,
    end: String,
    uris: Option<Vec<String>>,
    unique: bool,
}

impl StatsParams {
    fn parse(pairs: Vec<(String, String)>) -> Result<Self, ApiError> {
        let mut start = None;
        let mut end = None;
        let mut uris: Vec<String> = Vec::new();
        let mut unique = false;

        for (key, value) in pairs {
            match key.as_str() {
                "start" => start = Some(value),
                "end" => end = Some(value),
                "uris" => uris.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|u| !u.is_empty())
                        .map(String::from),
                ),
                "unique" => {
                    unique = value.parse().map_err(|_| {
                        ApiError::BadRequest(format!(
                            "Parameter 'unique' must be true or false, got '{value}'"
                        ))
                    })?
                }
                _ => {}
            }
        }

        let missing = |name: &str| ApiError::BadRequest(format!("Parameter '{name}' is required"));
        Ok(Self {
            start: start.ok_or_else(|| missing("start"))?,
            end: end.ok_or_else(|| missing("end"))?,
            uris: (!uris.is_empty()).then_some(uris),
            unique,
        })
    }
}

/// POST /hit - record an endpoint access
async fn record_hit<T: StatsStorage>(
    State(storage): State<Arc<T>>,
    body: Result<Json<Hit>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(hit) = body?;
    stats::record(storage.as_ref(), &hit).await?;
    Ok(StatusCode::CREATED)
}

/// GET /stats?start=&end=&uris=&unique= - aggregated hit counts
async fn get_stats<T: StatsStorage>(
    State(storage): State<Arc<T>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<ViewStats>>, ApiError> {
    let Query(pairs) = query?;
    let params = StatsParams::parse(pairs)?;
    let stats = stats::query(
        storage.as_ref(),
        &params.start,
        &params.end,
        params.uris,
        params.unique,
    )
    .await?;
    Ok(Json(stats))
}

/// Stats routes
pub fn router<T: StatsStorage + 'static>() -> Router<Arc<T>> {
    Router::new()
        .route("/hit", post(record_hit::<T>))
        .route("/stats", get(get_stats::<T>))
}
