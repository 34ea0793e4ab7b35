//! HTTP request handlers for the voice session service.

pub mod auth;
pub mod connection;
pub mod cookies;
pub mod health;
pub mod metrics;
pub mod room_metadata;

pub use auth::{login, logout, me};
pub use connection::connection_details;
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use room_metadata::room_metadata;

use crate::errors::VsError;
use crate::observability::metrics::record_error;
use crate::observability::ErrorCategory;

/// Count a failed request under `operation`.
fn observe_error(operation: &str, err: &VsError) {
    record_error(
        operation,
        ErrorCategory::from(err).as_str(),
        err.status_code(),
    );
}
