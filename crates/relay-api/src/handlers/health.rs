//! Health check handler.

use axum::{extract::State, Json};
use tracing::warn;

use crate::state::AppState;
use crate::types::HealthResponse;

/// GET /api/health - Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, sessions) = match state.dispatcher.session_count().await {
        Ok(count) => ("ok", count),
        Err(e) => {
            warn!(error = %e, "Session store unavailable");
            ("degraded", 0)
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.config.uptime_seconds(),
        sessions,
    })
}
