//! Liveness and readiness probes.
//!
//! - `/health`: process is up, no dependency checks
//! - `/ready`: database answers a trivial query

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

/// Liveness probe. Always "OK".
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe. 503 when the database is unreachable; the cause is
/// logged, not returned.
#[tracing::instrument(skip_all, name = "vs.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Err(e) = sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        tracing::warn!(target: "vs.health", error = %e, "Readiness check failed: database error");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                database: Some("unhealthy"),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            database: Some("healthy"),
            error: None,
        }),
    )
}
