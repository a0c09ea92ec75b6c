//! HTTP layer for the main and stats services.
//!
//! Axum routers with:
//! - Request tracing
//! - Graceful shutdown
//! - JSON error responses
//! - Prometheus metrics

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::api::dto::EventDto;
use crate::catalog::CatalogService;
use crate::domain::{Event, EventId};
use crate::error::Result;
use crate::http::StatsClient;
use crate::manager::Storage;
use crate::participation::ParticipationService;
use crate::stats::StatsStorage;

pub mod dto;
pub mod error;
pub mod routes;

pub use error::ApiError;

/// Shared state of the main service.
pub struct AppState<S: Storage, C: StatsClient> {
    pub participation: ParticipationService<S>,
    pub catalog: CatalogService<S>,
    pub stats_client: C,
    /// Reported as `app` on hits sent to the stats service
    pub app_name: String,
}

impl<S: Storage, C: StatsClient> AppState<S, C> {
    pub fn new(storage: Arc<S>, stats_client: C, app_name: impl Into<String>) -> Self {
        Self {
            participation: ParticipationService::new(storage.clone()),
            catalog: CatalogService::new(storage),
            stats_client,
            app_name: app_name.into(),
        }
    }

    /// Render one event with its confirmed participants and unique views.
    pub async fn event_view(&self, event: Event) -> Result<EventDto> {
        let views = self.unique_views(std::slice::from_ref(&event)).await;
        self.render_event(event, &views).await
    }

    /// Render several events, fetching their view counts in one stats call.
    pub async fn event_views(&self, events: Vec<Event>) -> Result<Vec<EventDto>> {
        let views = self.unique_views(&events).await;
        let mut rendered = Vec::with_capacity(events.len());
        for event in events {
            rendered.push(self.render_event(event, &views).await?);
        }
        Ok(rendered)
    }

    async fn render_event(&self, event: Event, views: &HashMap<String, i64>) -> Result<EventDto> {
        let confirmed = self.catalog.confirmed_requests(event.id).await?;
        let views = views.get(&event_uri(event.id)).copied().unwrap_or(0);
        Ok(EventDto::new(event, confirmed, views))
    }

    /// Unique views per public event URI since the earliest publication among `events`.
    ///
    /// Unpublished events have no public page and are skipped. A failing stats service
    /// is logged and reported as no views.
    async fn unique_views(&self, events: &[Event]) -> HashMap<String, i64> {
        let published: Vec<&Event> = events.iter().filter(|e| e.published_on.is_some()).collect();
        let Some(start) = published.iter().filter_map(|e| e.published_on).min() else {
            return HashMap::new();
        };
        let uris: Vec<String> = published.iter().map(|e| event_uri(e.id)).collect();

        match self
            .stats_client
            .stats(start.naive_utc(), Utc::now().naive_utc(), &uris, true)
            .await
        {
            Ok(stats) => stats
                .into_iter()
                .filter(|s| s.app == self.app_name)
                .map(|s| (s.uri, s.hits))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch event views");
                HashMap::new()
            }
        }
    }
}

/// Path of an event's public page, as recorded in hits.
pub fn event_uri(event_id: EventId) -> String {
    format!("/events/{event_id}")
}

/// Router for the main service.
pub fn main_router<S, C>(state: Arc<AppState<S, C>>) -> Router
where
    S: Storage + 'static,
    C: StatsClient + 'static,
{
    Router::new()
        .merge(routes::admin::router())
        .merge(routes::categories::router())
        .merge(routes::events::router())
        .merge(routes::requests::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router for the stats service.
pub fn stats_router<T: StatsStorage + 'static>(storage: Arc<T>) -> Router {
    routes::stats::router()
        .layer(TraceLayer::new_for_http())
        .with_state(storage)
}

/// Router exposing the Prometheus scrape endpoint at `/metrics`.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
}

/// Serve `app` on `bind_addr` until Ctrl+C or SIGTERM.
///
/// Client addresses are made available to handlers through `ConnectInfo`.
pub async fn serve(app: Router, bind_addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}
