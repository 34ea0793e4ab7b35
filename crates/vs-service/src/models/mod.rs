use chrono::{DateTime, Utc};
use common::secret::SecretString;
use common::types::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Metadata keys that may be persisted with a session.
pub const METADATA_WHITELIST: [&str; 7] = [
    "participantName",
    "language",
    "voice",
    "gender",
    "llmChoice",
    "system_prompt",
    "prompt_text",
];

/// Media backend endpoint plus the key pair used to sign grants for it.
#[derive(Clone)]
pub struct CredentialSet {
    pub url: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// uid plus its keyed signature, carried in cookies or the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityToken {
    pub uid: String,
    pub signature: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SessionStatus::Active),
            _ => None,
        }
    }
}

/// Persisted record of one connection attempt.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub room_name: String,
    pub uid: String,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub version: i32,
}

impl SessionRecord {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expire_at
    }
}

/// Project a request body onto the metadata whitelist.
///
/// Unknown keys are dropped. Whitelisted keys keep string, number and bool
/// values; null, arrays and objects are dropped.
pub fn whitelist_metadata(body: &Map<String, Value>) -> Map<String, Value> {
    METADATA_WHITELIST
        .iter()
        .filter_map(|key| match body.get(*key) {
            Some(value @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
                Some((key.to_string(), value.clone()))
            }
            _ => None,
        })
        .collect()
}

/// Response body for a successful connection request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionBundle {
    pub server_url: String,
    pub room_name: String,
    pub participant_token: String,
    pub participant_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// Login body. Absent fields deserialize as blank so the service can
/// answer 400 rather than the extractor's 422.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<SecretString>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body returned by login and "who am I".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub ok: bool,
    pub uuid: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoomMetadataQuery {
    pub room: Option<String>,
}

/// Body returned to agents asking for a room's session metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMetadataResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl RoomMetadataResponse {
    pub fn not_found() -> Self {
        Self {
            found: false,
            metadata: None,
            session_id: None,
            uid: None,
        }
    }
}

impl From<SessionRecord> for RoomMetadataResponse {
    fn from(record: SessionRecord) -> Self {
        Self {
            found: true,
            metadata: Some(record.metadata),
            session_id: Some(record.session_id),
            uid: Some(record.uid),
        }
    }
}

/// Readiness probe response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
