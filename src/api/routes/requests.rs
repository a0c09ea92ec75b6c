//! Participation request endpoints for requesters and organizers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};

use crate::api::dto::{ParticipationRequestDto, StatusUpdateResultDto, SubmitParams};
use crate::api::{ApiError, AppState};
use crate::domain::{EventId, RequestId, UserId};
use crate::http::StatsClient;
use crate::manager::Storage;
use crate::participation::StatusUpdate;

/// POST /users/{userId}/requests?eventId= - request to join an event
async fn submit<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(user_id): Path<UserId>,
    params: Result<Query<SubmitParams>, QueryRejection>,
) -> Result<(StatusCode, Json<ParticipationRequestDto>), ApiError> {
    let Query(params) = params?;
    let request = state.participation.submit(user_id, params.event_id).await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

/// GET /users/{userId}/requests - the user's own requests
async fn list_own<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<ParticipationRequestDto>>, ApiError> {
    let requests = state.participation.list_by_requester(user_id).await?;
    Ok(Json(requests.iter().map(Into::into).collect()))
}

/// PATCH /users/{userId}/requests/{requestId}/cancel - withdraw a request
async fn cancel<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path((user_id, request_id)): Path<(UserId, RequestId)>,
) -> Result<Json<ParticipationRequestDto>, ApiError> {
    let canceled = state.participation.cancel(user_id, request_id).await?;
    Ok(Json((&canceled).into()))
}

/// GET /users/{userId}/events/{eventId}/requests - requests against an owned event
async fn list_for_event<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path((user_id, event_id)): Path<(UserId, EventId)>,
) -> Result<Json<Vec<ParticipationRequestDto>>, ApiError> {
    let requests = state
        .participation
        .list_for_organizer_event(user_id, event_id)
        .await?;
    Ok(Json(requests.iter().map(Into::into).collect()))
}

/// PATCH /users/{userId}/events/{eventId}/requests - confirm or reject a batch
async fn bulk_update<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path((user_id, event_id)): Path<(UserId, EventId)>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<StatusUpdateResultDto>, ApiError> {
    let Json(update) = body?;
    let result = state
        .participation
        .bulk_update_status(user_id, event_id, update)
        .await?;
    Ok(Json(result.into()))
}

/// Participation request routes
pub fn router<S: Storage + 'static, C: StatsClient + 'static>() -> Router<Arc<AppState<S, C>>> {
    Router::new()
        .route(
            "/users/{user_id}/requests",
            get(list_own::<S, C>).post(submit::<S, C>),
        )
        .route(
            "/users/{user_id}/requests/{request_id}/cancel",
            patch(cancel::<S, C>),
        )
        .route(
            "/users/{user_id}/events/{event_id}/requests",
            get(list_for_event::<S, C>).patch(bulk_update::<S, C>),
        )
}
