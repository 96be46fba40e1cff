//! Root endpoint handler for the landing page.

use axum::{extract::State, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;

    let snapshot_path = state.config.snapshot_path();

    (
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "neuron-monitor-exporter {version}\n\n\
             Uptime: {hours}h {minutes}m {seconds}s\n\
             Snapshot: {}\n\
             Poll interval: {}s\n\n\
             Endpoints:\n  \
             /metrics  Prometheus metrics\n  \
             /health   Poll loop status\n",
            snapshot_path.display(),
            state.config.poll_interval().as_secs(),
        ),
    )
}
