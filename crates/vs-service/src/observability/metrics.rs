//! Metrics definitions for the voice session service.
//!
//! Naming:
//! - `vs_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: success, error
//! - `result`: valid/invalid, found/not_found/error
//! - `tier`: 5 resolution tiers plus `none`
//! - `error_category`: 4 values
//! - `path`: known routes, everything else is `/other`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its handle.
///
/// # Errors
///
/// Returns error if a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("vs_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("vs_grant_issuance".to_string()),
            &[0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000],
        )
        .map_err(|e| format!("Failed to set grant issuance buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// issuance metrics

/// Record a connection request outcome.
///
/// Metric: `vs_grant_issuance_duration_seconds`, `vs_grant_issuance_total`
/// Labels: `status`
pub fn record_grant_issuance(status: &str, duration: Duration) {
    histogram!("vs_grant_issuance_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("vs_grant_issuance_total", "status" => status.to_string()).increment(1);
}

/// Metric: `vs_identity_verifications_total`
/// Labels: `result` (valid, invalid)
pub fn record_identity_verification(result: &str) {
    counter!("vs_identity_verifications_total", "result" => result.to_string()).increment(1);
}

/// Metric: `vs_credential_resolutions_total`
/// Labels: `tier`
pub fn record_credential_resolution(tier: &str) {
    counter!("vs_credential_resolutions_total", "tier" => tier.to_string()).increment(1);
}

// session store metrics

/// Metric: `vs_session_writes_total`
/// Labels: `status`
pub fn record_session_write(status: &str) {
    counter!("vs_session_writes_total", "status" => status.to_string()).increment(1);
}

/// Metric: `vs_session_lookups_total`
/// Labels: `result` (found, not_found, error)
pub fn record_session_lookup(result: &str) {
    counter!("vs_session_lookups_total", "result" => result.to_string()).increment(1);
}

// login metrics

/// Metric: `vs_logins_total`
/// Labels: `status`
pub fn record_login(status: &str) {
    counter!("vs_logins_total", "status" => status.to_string()).increment(1);
}

// error metrics

/// Count a request that ended in a `VsError`.
///
/// Metric: `vs_errors_total`
/// Labels: `operation`, `error_category`, `status_code`
pub fn record_error(operation: &str, error_category: &str, status_code: u16) {
    counter!("vs_errors_total",
        "operation" => operation.to_string(),
        "error_category" => error_category.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

// http request metrics

/// Record HTTP request completion, including framework-level rejections.
///
/// Metric: `vs_http_requests_total`, `vs_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("vs_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("vs_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Map a request path onto a bounded label set.
fn normalize_path(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/connection-details" => "/api/connection-details",
        "/api/sessions" => "/api/sessions",
        "/api/room-metadata" => "/api/room-metadata",
        "/api/auth/login" => "/api/auth/login",
        "/api/auth/logout" => "/api/auth/logout",
        "/api/auth/me" => "/api/auth/me",
        _ => "/other",
    }
}
