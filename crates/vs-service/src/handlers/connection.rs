//! Connection issuance endpoints.
//!
//! - `POST /api/connection-details`
//! - `POST /api/sessions` (legacy alias, same behavior)
//!
//! The body is a loose JSON object. Anything that is not a JSON object
//! (including an empty body) is treated as `{}` so identity can still come
//! from cookies.

use crate::errors::VsError;
use crate::handlers::cookies::read_cookie;
use crate::handlers::observe_error;
use crate::routes::AppState;
use crate::services::connection_service::{
    self, ConnectionRequest, UID_COOKIE, UID_SIG_COOKIE,
};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;

fn parse_body(body: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Handler for POST /api/connection-details and POST /api/sessions
///
/// # Response
///
/// - 200 OK: `ConnectionBundle`, `Cache-Control: no-store`
/// - 400 Bad Request: no uid in body or cookies
/// - 401 Unauthorized: missing or wrong signature
/// - 500 Internal Server Error: missing configuration or store failure
#[instrument(skip_all, name = "vs.api.connection_details")]
pub async fn connection_details(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, VsError> {
    let request = ConnectionRequest {
        body: parse_body(&body),
        cookie_uid: read_cookie(&headers, UID_COOKIE),
        cookie_signature: read_cookie(&headers, UID_SIG_COOKIE),
    };

    let bundle = connection_service::issue_connection(
        &state.pool,
        &state.config,
        &state.signer,
        &request,
    )
    .await
    .inspect_err(|e| observe_error("connection_details", e))?;

    Ok((
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(bundle),
    ))
}
