//! Browser login endpoints.
//!
//! - `POST /api/auth/login` - identifier + password, sets identity cookies
//! - `POST /api/auth/logout` - clears identity cookies
//! - `GET /api/auth/me` - resolves the caller from identity cookies

use crate::errors::VsError;
use crate::handlers::cookies::{cleared_cookie, identity_cookie, read_cookie};
use crate::handlers::observe_error;
use crate::models::{LoginRequest, LogoutResponse, UserInfoResponse};
use crate::routes::AppState;
use crate::services::connection_service::{UID_COOKIE, UID_SIG_COOKIE};
use crate::services::user_service;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Body is read as JSON whatever the content type; anything that does not
/// decode into a `LoginRequest` is a validation error.
fn parse_login(body: &[u8]) -> Result<LoginRequest, VsError> {
    serde_json::from_slice(body)
        .map_err(|_| VsError::ValidationError("Invalid login request body".to_string()))
}

/// Handler for POST /api/auth/login
///
/// # Response
///
/// - 200 OK: `{ok, uuid, name}` plus `dt_uid` / `dt_uid_sig` cookies
/// - 400 Bad Request: malformed body, blank identifier or password
/// - 401 Unauthorized: unknown identifier or wrong password
#[instrument(skip_all, name = "vs.api.login")]
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, VsError> {
    let payload = parse_login(&body).inspect_err(|e| observe_error("login", e))?;

    let outcome = user_service::login(
        &state.pool,
        &state.signer,
        &payload.username,
        payload
            .password
            .as_ref()
            .map(|p| p.expose_secret())
            .unwrap_or_default(),
    )
    .await
    .inspect_err(|e| observe_error("login", e))?;

    let cookies = AppendHeaders([
        (
            header::SET_COOKIE,
            identity_cookie(UID_COOKIE, &outcome.token.uid, &state.config),
        ),
        (
            header::SET_COOKIE,
            identity_cookie(UID_SIG_COOKIE, &outcome.token.signature, &state.config),
        ),
    ]);

    Ok((
        cookies,
        Json(UserInfoResponse {
            ok: true,
            uuid: outcome.uid,
            name: outcome.name,
        }),
    ))
}

/// Handler for POST /api/auth/logout
#[instrument(skip_all, name = "vs.api.logout")]
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        AppendHeaders([
            (header::SET_COOKIE, cleared_cookie(UID_COOKIE, &state.config)),
            (
                header::SET_COOKIE,
                cleared_cookie(UID_SIG_COOKIE, &state.config),
            ),
        ]),
        Json(LogoutResponse { ok: true }),
    )
}

/// Handler for GET /api/auth/me
///
/// 401 unless both identity cookies are present and the signature verifies.
#[instrument(skip_all, name = "vs.api.me")]
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserInfoResponse>, VsError> {
    let uid = read_cookie(&headers, UID_COOKIE);
    let signature = read_cookie(&headers, UID_SIG_COOKIE);

    let user = user_service::current_user(
        &state.pool,
        &state.signer,
        uid.as_deref(),
        signature.as_deref(),
    )
    .await
    .inspect_err(|e| observe_error("me", e))?;

    Ok(Json(user))
}
