//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to accept connections)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Returns 503 once the hub has reached its connection limit.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if has_capacity(&state).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with hub details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = if has_capacity(&state).await {
        "healthy"
    } else {
        "saturated"
    };

    Json(HealthResponse {
        status: status.to_string(),
        connections: state.hub.connection_count().await,
        sources: state.hub.source_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn has_capacity(state: &AppState) -> bool {
    state.hub.connection_count().await < state.hub.config().max_connections
}
