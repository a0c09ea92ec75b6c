//! Admin endpoints: users, categories and event moderation.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, post},
};

use crate::api::dto::{AdminEventUpdate, EventDto};
use crate::api::{ApiError, AppState};
use crate::domain::{Category, EventId, NewCategory, NewUser, User};
use crate::http::StatsClient;
use crate::manager::Storage;

/// POST /admin/users - register a user
async fn create_user<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(input) = body?;
    let user = state.catalog.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /admin/categories - create a category
async fn create_category<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    body: Result<Json<NewCategory>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let Json(input) = body?;
    let category = state.catalog.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /admin/events/{eventId} - publish or reject an event
async fn moderate_event<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(event_id): Path<EventId>,
    body: Result<Json<AdminEventUpdate>, JsonRejection>,
) -> Result<Json<EventDto>, ApiError> {
    let Json(update) = body?;
    let event = state
        .catalog
        .moderate_event(event_id, update.state_action)
        .await?;
    Ok(Json(state.event_view(event).await?))
}

/// Admin routes
pub fn router<S: Storage + 'static, C: StatsClient + 'static>() -> Router<Arc<AppState<S, C>>> {
    Router::new()
        .route("/admin/users", post(create_user::<S, C>))
        .route("/admin/categories", post(create_category::<S, C>))
        .route("/admin/events/{event_id}", patch(moderate_event::<S, C>))
}
