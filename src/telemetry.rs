//! Tracing and metrics setup for the service binaries.

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

/// Install a compact fmt subscriber filtered by `RUST_LOG`.
///
/// Defaults to `info` with sqlx statement logging at `warn`. Returns an error if a
/// global subscriber is already set.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,turnout=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// The returned handle renders the scrape body served on `/metrics`.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(
        "turnout_requests_total",
        "Participation requests submitted or moved to a new status, by status"
    );
    describe_counter!("turnout_hits_total", "Endpoint hits recorded, by app");
}
