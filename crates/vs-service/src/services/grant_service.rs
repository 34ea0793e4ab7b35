//! Media grant minting.
//!
//! Produces the signed access token a client presents to the media backend.
//! Tokens are HS256 JWTs signed with the resolved API secret, issued by the
//! API key, and always carry the same four room capabilities.

use crate::errors::VsError;
use crate::models::CredentialSet;
use crate::room::is_valid_room_name;
use chrono::{DateTime, Utc};
use common::secret::ExposeSecret;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// Room capabilities granted to every participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_publish_data: bool,
    pub can_subscribe: bool,
}

impl VideoGrant {
    fn for_room(room: &str) -> Self {
        Self {
            room: room.to_string(),
            room_join: true,
            can_publish: true,
            can_publish_data: true,
            can_subscribe: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDispatch {
    pub agent_name: String,
}

/// Room configuration asking the backend to dispatch an agent on join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub agents: Vec<AgentDispatch>,
}

/// Grant token claims.
///
/// `sub` and `jti` carry the participant identity (a user id by default);
/// Debug redacts them.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantClaims {
    pub iss: String,
    pub sub: String,
    pub jti: String,
    pub nbf: i64,
    pub exp: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
    pub video: VideoGrant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_config: Option<RoomConfig>,
}

impl fmt::Debug for GrantClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("jti", &"[REDACTED]")
            .field("nbf", &self.nbf)
            .field("exp", &self.exp)
            .field("name", &self.name)
            .field("metadata", &self.metadata.as_ref().map(|_| "[PRESENT]"))
            .field("attributes", &self.attributes.as_ref().map(BTreeMap::len))
            .field("video", &self.video)
            .field("room_config", &self.room_config)
            .finish()
    }
}

/// Inputs for one grant.
#[derive(Debug, Clone)]
pub struct GrantRequest<'a> {
    pub identity: &'a str,
    pub display_name: &'a str,
    pub room_name: &'a str,
    pub ttl: Duration,
    /// Passed through if a string, JSON-encoded if an object or array.
    pub metadata: Option<&'a Value>,
    /// Only string values of an object survive.
    pub attributes: Option<&'a Value>,
    pub agent_name: Option<&'a str>,
}

/// Opaque participant metadata: strings pass through, objects and arrays
/// are serialized, anything else (or an empty string) is dropped.
pub fn project_metadata(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        structured @ (Value::Object(_) | Value::Array(_)) => Some(structured.to_string()),
        _ => None,
    }
}

/// Flat string-to-string attributes. Non-string values are dropped; an
/// empty result is `None`.
pub fn project_attributes(value: Option<&Value>) -> Option<BTreeMap<String, String>> {
    let Value::Object(map) = value? else {
        return None;
    };

    let attributes: BTreeMap<String, String> = map
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect();

    (!attributes.is_empty()).then_some(attributes)
}

/// Build the claims for `request` as of `now`.
pub fn build_claims(
    request: &GrantRequest<'_>,
    credentials: &CredentialSet,
    now: DateTime<Utc>,
) -> Result<GrantClaims, VsError> {
    if request.identity.is_empty() {
        return Err(VsError::ValidationError(
            "Participant identity must not be empty".to_string(),
        ));
    }

    if !is_valid_room_name(request.room_name) {
        return Err(VsError::ValidationError("Invalid room name".to_string()));
    }

    let ttl_secs = i64::try_from(request.ttl.as_secs()).unwrap_or(i64::MAX);
    if ttl_secs == 0 {
        return Err(VsError::ValidationError(
            "Grant lifetime must be positive".to_string(),
        ));
    }

    let nbf = now.timestamp();
    let agent_name = request
        .agent_name
        .map(str::trim)
        .filter(|name| !name.is_empty());

    Ok(GrantClaims {
        iss: credentials.api_key.clone(),
        sub: request.identity.to_string(),
        jti: request.identity.to_string(),
        nbf,
        exp: nbf.saturating_add(ttl_secs),
        name: request.display_name.to_string(),
        metadata: project_metadata(request.metadata),
        attributes: project_attributes(request.attributes),
        video: VideoGrant::for_room(request.room_name),
        room_config: agent_name.map(|name| RoomConfig {
            agents: vec![AgentDispatch {
                agent_name: name.to_string(),
            }],
        }),
    })
}

/// Mint a grant token valid from `now` for `request.ttl`.
#[instrument(skip_all)]
pub fn mint_at(
    request: &GrantRequest<'_>,
    credentials: &CredentialSet,
    now: DateTime<Utc>,
) -> Result<String, VsError> {
    let claims = build_claims(request, credentials, now)?;

    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(credentials.api_secret.expose_secret().as_bytes());

    encode(&header, &claims, &key)
        .map_err(|e| VsError::Crypto(format!("Grant signing operation failed: {}", e)))
}

/// Mint a grant token valid from now.
pub fn mint(request: &GrantRequest<'_>, credentials: &CredentialSet) -> Result<String, VsError> {
    mint_at(request, credentials, Utc::now())
}
