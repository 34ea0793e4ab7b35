//! Middleware for the voice session service.
//!
//! - `http_metrics` - HTTP request metrics for every response

pub mod http_metrics;

pub use http_metrics::http_metrics_middleware;
