//! Public category endpoints.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::api::dto::PageParams;
use crate::api::{ApiError, AppState};
use crate::domain::{Category, CategoryId};
use crate::http::StatsClient;
use crate::manager::Storage;

/// GET /categories?from=&size= - list categories by offset
async fn list_categories<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let Query(params) = params?;
    Ok(Json(state.catalog.list_categories(params.page()?).await?))
}

/// GET /categories/{catId} - get a single category
async fn get_category<S: Storage, C: StatsClient>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog.get_category(category_id).await?))
}

/// Category routes
pub fn router<S: Storage + 'static, C: StatsClient + 'static>() -> Router<Arc<AppState<S, C>>> {
    Router::new()
        .route("/categories", get(list_categories::<S, C>))
        .route("/categories/{category_id}", get(get_category::<S, C>))
}
