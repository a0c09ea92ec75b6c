//! Main service: users, categories, events and participation requests.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/turnout TURNOUT_STATS_URL=http://localhost:9090 \
//!     cargo run --bin main-service
//! ```

use std::sync::Arc;

use turnout::api::{self, AppState};
use turnout::{PostgresStorage, ReqwestStatsClient, ServiceConfig, create_pool, migrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env();
    turnout::telemetry::init_tracing()?;
    let metrics = turnout::telemetry::init_metrics()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        stats_url = %config.stats_url,
        app_name = %config.app_name,
        "Configuration loaded"
    );

    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    migrator().run(&pool).await?;
    tracing::info!("Migrations applied");

    let stats_client = ReqwestStatsClient::new(&config.stats_url, config.stats_timeout())?;
    let state = Arc::new(AppState::new(
        Arc::new(PostgresStorage::new(pool)),
        stats_client,
        config.app_name.clone(),
    ));

    let app = api::main_router(state).merge(api::metrics_router(metrics));
    api::serve(app, config.bind_addr).await
}
