//! Connection issuance.
//!
//! Single flow behind `/api/connection-details` and `/api/sessions`:
//! verify identity, derive room, resolve credentials, mint grant, record
//! session. Everything before the session write is side-effect free, so a
//! rejected request never touches the store.

use crate::config::Config;
use crate::crypto::IdentitySigner;
use crate::errors::VsError;
use crate::models::{whitelist_metadata, ConnectionBundle, IdentityToken};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_grant_issuance;
use crate::repositories::sessions;
use crate::room::derive_room_name;
use crate::services::credential_resolver;
use crate::services::grant_service::{self, GrantRequest};
use common::types::SessionId;
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Cookie carrying the signed user id.
pub const UID_COOKIE: &str = "dt_uid";

/// Cookie carrying the uid signature.
pub const UID_SIG_COOKIE: &str = "dt_uid_sig";

/// Display name used when the request does not supply one.
pub const DEFAULT_PARTICIPANT_NAME: &str = "user";

/// A connection request: the loosely typed JSON body plus identity cookies.
#[derive(Debug, Default, Clone)]
pub struct ConnectionRequest {
    pub body: Map<String, Value>,
    pub cookie_uid: Option<String>,
    pub cookie_signature: Option<String>,
}

/// Trimmed, non-empty string value of `key`.
fn string_field<'a>(body: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pull the identity token out of the body, falling back to cookies
/// field by field.
pub fn extract_identity(request: &ConnectionRequest) -> Result<IdentityToken, VsError> {
    let uid = string_field(&request.body, "uid")
        .map(str::to_string)
        .or_else(|| non_blank(request.cookie_uid.as_deref()))
        .ok_or_else(|| VsError::InvalidIdentity("Missing uid".to_string()))?;

    let signature = string_field(&request.body, "uidSig")
        .map(str::to_string)
        .or_else(|| non_blank(request.cookie_signature.as_deref()))
        .ok_or(VsError::SignatureInvalid)?;

    Ok(IdentityToken { uid, signature })
}

/// Agent to dispatch: `agentName`, else the legacy
/// `room_config.agents[0].agent_name`.
fn agent_name(body: &Map<String, Value>) -> Option<&str> {
    string_field(body, "agentName").or_else(|| {
        body.get("room_config")
            .and_then(|v| v.pointer("/agents/0/agent_name"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })
}

/// Issue a connection bundle for `request`.
#[instrument(skip_all, name = "vs.connection.issue")]
pub async fn issue_connection(
    pool: &PgPool,
    config: &Config,
    signer: &IdentitySigner,
    request: &ConnectionRequest,
) -> Result<ConnectionBundle, VsError> {
    let start = Instant::now();
    let result = issue_connection_inner(pool, config, signer, request).await;
    record_grant_issuance(
        if result.is_ok() { "success" } else { "error" },
        start.elapsed(),
    );
    result
}

async fn issue_connection_inner(
    pool: &PgPool,
    config: &Config,
    signer: &IdentitySigner,
    request: &ConnectionRequest,
) -> Result<ConnectionBundle, VsError> {
    let body = &request.body;

    let identity_token = extract_identity(request)?;
    if !signer.verify(&identity_token.uid, &identity_token.signature)? {
        return Err(VsError::SignatureInvalid);
    }
    let uid = identity_token.uid.as_str();

    let room_name = derive_room_name(uid, &config.room_prefix);

    let participant_name =
        string_field(body, "participantName").unwrap_or(DEFAULT_PARTICIPANT_NAME);
    let identity = string_field(body, "participantId").unwrap_or(uid);

    let (credentials, tier) = credential_resolver::resolve_with_tier(
        config,
        string_field(body, "voice"),
        string_field(body, "language"),
        string_field(body, "credentialKey"),
    )?;

    let grant = GrantRequest {
        identity,
        display_name: participant_name,
        room_name: &room_name,
        ttl: Duration::from_secs(config.session_ttl_seconds),
        metadata: body.get("metadata"),
        attributes: body.get("attributes"),
        agent_name: agent_name(body),
    };
    let participant_token = grant_service::mint(&grant, &credentials)?;

    let session = sessions::create_session(
        pool,
        SessionId::new(),
        &room_name,
        uid,
        whitelist_metadata(body),
        config.session_ttl_seconds,
    )
    .await?;

    info!(
        target: "vs.connection",
        uid_hash = %hash_for_correlation(uid),
        room = %room_name,
        tier = tier.as_str(),
        session_id = %session.session_id,
        "Connection issued"
    );

    Ok(ConnectionBundle {
        server_url: credentials.url,
        room_name,
        participant_token,
        participant_name: participant_name.to_string(),
        session_id: Some(session.session_id),
    })
}
