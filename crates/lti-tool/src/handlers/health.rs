//! Liveness and readiness probes.

use crate::routes::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub database: String,
}

/// GET /health
///
/// Liveness only; never touches the database.
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /ready
///
/// Pings the database. Returns 503 with the same JSON shape when the ping
/// fails so probes can see which dependency is down.
#[instrument(skip_all, name = "lti.health.ready")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();

    if db_healthy {
        (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                database: "healthy".to_string(),
            }),
        )
    } else {
        tracing::warn!(target: "lti.health", "Readiness check failed: database unreachable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                database: "unhealthy".to_string(),
            }),
        )
    }
}
