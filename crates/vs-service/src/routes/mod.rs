//! HTTP routes for the voice session service.

use crate::config::Config;
use crate::crypto::IdentitySigner;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Per-process state handed to every `/api` and probe handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// Identity signer built from `config.uid_signing_secret`.
    pub signer: IdentitySigner,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let signer = IdentitySigner::from_config(&config);
        Self {
            pool,
            config,
            signer,
        }
    }
}

/// Assemble the router.
///
/// - `/health`, `/ready`, `/metrics` - operational, unauthenticated
/// - `/api/connection-details`, `/api/sessions` - connection issuance
/// - `/api/room-metadata` - agent lookup, `x-api-key` protected
/// - `/api/auth/{login,logout,me}` - browser identity
///
/// Every route runs under the trace layer, a 30 second timeout and the HTTP
/// metrics middleware (outermost).
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let app_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route(
            "/api/connection-details",
            post(handlers::connection_details),
        )
        .route("/api/sessions", post(handlers::connection_details))
        .route("/api/room-metadata", get(handlers::room_metadata))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/me", get(handlers::me))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // The last layer added runs first: metrics wrap the timeout, which wraps tracing.
    app_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
