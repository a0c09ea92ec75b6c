//! Event endpoints: organizer management of their own events and the public event view.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    Json, Router,
    extract::{ConnectInfo, OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;

use crate::api::dto::{EventDto, PageParams};
use crate::api::{ApiError, AppState};
use crate::domain::{EventId, EventUpdate, NewEvent, UserId};
use crate::http::StatsClient;
use crate::manager::Storage;
use crate::stats::Hit;

/// POST /users/{userId}/events - create an event awaiting moderation
async fn create_event<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(user_id): Path<UserId>,
    body: Result<Json<NewEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<EventDto>), ApiError> {
    let Json(input) = body?;
    let event = state.catalog.create_event(user_id, input).await?;
    Ok((StatusCode::CREATED, Json(state.event_view(event).await?)))
}

/// GET /users/{userId}/events?from=&size= - the user's own events
async fn list_user_events<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(user_id): Path<UserId>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<EventDto>>, ApiError> {
    let Query(params) = params?;
    let events = state
        .catalog
        .list_user_events(user_id, params.page()?)
        .await?;
    Ok(Json(state.event_views(events).await?))
}

/// GET /users/{userId}/events/{eventId} - one of the user's own events
async fn get_user_event<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path((user_id, event_id)): Path<(UserId, EventId)>,
) -> Result<Json<EventDto>, ApiError> {
    let event = state.catalog.get_user_event(user_id, event_id).await?;
    Ok(Json(state.event_view(event).await?))
}

/// PATCH /users/{userId}/events/{eventId} - change an unpublished event
async fn update_user_event<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path((user_id, event_id)): Path<(UserId, EventId)>,
    body: Result<Json<EventUpdate>, JsonRejection>,
) -> Result<Json<EventDto>, ApiError> {
    let Json(update) = body?;
    let event = state
        .catalog
        .update_user_event(user_id, event_id, update)
        .await?;
    Ok(Json(state.event_view(event).await?))
}

/// GET /events/{id} - view a published event and record the hit
async fn get_event<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    OriginalUri(uri): OriginalUri,
    Path(event_id): Path<EventId>,
) -> Result<Json<EventDto>, ApiError> {
    let event = state.catalog.get_published_event(event_id).await?;

    let hit = Hit {
        app: state.app_name.clone(),
        uri: uri.path().to_string(),
        ip: client.ip().to_string(),
        timestamp: Utc::now().naive_utc(),
    };
    if let Err(e) = state.stats_client.hit(&hit).await {
        tracing::warn!(error = %e, uri = %hit.uri, "Failed to record hit");
    }

    Ok(Json(state.event_view(event).await?))
}

/// Event routes
pub fn router<S: Storage + 'static, C: StatsClient + 'static>() -> Router<Arc<AppState<S, C>>> {
    Router::new()
        .route(
            "/users/{user_id}/events",
            get(list_user_events::<S, C>).post(create_event::<S, C>),
        )
        .route(
            "/users/{user_id}/events/{event_id}",
            get(get_user_event::<S, C>).patch(update_user_event::<S, C>),
        )
        .route("/events/{event_id}", get(get_event::<S, C>))
}
