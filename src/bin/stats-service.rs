//! Stats service: records endpoint hits and reports view counts.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/turnout_stats TURNOUT_BIND_ADDR=0.0.0.0:9090 \
//!     cargo run --bin stats-service
//! ```

use std::sync::Arc;

use turnout::api;
use turnout::{PostgresStorage, ServiceConfig, create_pool, migrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env();
    turnout::telemetry::init_tracing()?;
    let metrics = turnout::telemetry::init_metrics()?;

    tracing::info!(bind_addr = %config.bind_addr, "Starting stats service");

    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    migrator().run(&pool).await?;

    let storage = Arc::new(PostgresStorage::new(pool));
    let app = api::stats_router(storage).merge(api::metrics_router(metrics));
    api::serve(app, config.bind_addr).await
}
