//! Health check endpoint handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the /health endpoint.
///
/// Healthy while the last poll managed to read a snapshot.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let (status, message) = if state.telemetry.last_poll_success.get() >= 1.0 {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Snapshot unavailable")
    };

    let uptime_secs = state.start_time.elapsed().as_secs();
    let polls = state.telemetry.polls_total.get();
    let snapshot_errors = state.telemetry.snapshot_errors_total.get();

    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\nUptime: {uptime_secs}s\nPolls: {polls}\nSnapshot errors: {snapshot_errors}\n"
        ),
    )
}
