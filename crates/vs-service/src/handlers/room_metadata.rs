//! Session metadata lookup for media agents.
//!
//! `GET /api/room-metadata?room=<name>` with `x-api-key` equal to the
//! configured metadata key. Without a configured key every call is 401.

use crate::crypto::keys_match;
use crate::errors::VsError;
use crate::handlers::observe_error;
use crate::models::{RoomMetadataQuery, RoomMetadataResponse};
use crate::repositories::sessions;
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Header carrying the agent's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

fn authorize(headers: &HeaderMap, state: &AppState) -> Result<(), VsError> {
    let expected = state
        .config
        .metadata_api_key
        .as_ref()
        .ok_or(VsError::Unauthorized)?;

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(VsError::Unauthorized)?;

    if keys_match(provided, expected.expose_secret()) {
        Ok(())
    } else {
        Err(VsError::Unauthorized)
    }
}

/// Handler for GET /api/room-metadata
///
/// # Response
///
/// - 200 OK: `{found:false}` or `{found:true, metadata, sessionId, uid}`
/// - 400 Bad Request: `room` missing or blank
/// - 401 Unauthorized: API key missing, wrong, or not configured
#[instrument(skip_all, name = "vs.api.room_metadata")]
pub async fn room_metadata(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RoomMetadataQuery>,
) -> Result<Json<RoomMetadataResponse>, VsError> {
    lookup(&state, &headers, &query)
        .await
        .map(Json)
        .inspect_err(|e| observe_error("room_metadata", e))
}

async fn lookup(
    state: &AppState,
    headers: &HeaderMap,
    query: &RoomMetadataQuery,
) -> Result<RoomMetadataResponse, VsError> {
    authorize(headers, state)?;

    let room = query
        .room
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| VsError::ValidationError("Missing room".to_string()))?;

    let session = sessions::get_session_by_room(&state.pool, room).await?;
    debug!(target: "vs.sessions", found = session.is_some(), "Room metadata lookup");

    Ok(session.map_or_else(RoomMetadataResponse::not_found, RoomMetadataResponse::from))
}
