//! Voice session service configuration.
//!
//! Configuration is loaded once from environment variables and is immutable
//! for the lifetime of the process. Secret values are held in `SecretString`
//! and redacted in Debug output.

use crate::models::CredentialSet;
use crate::room;
use common::secret::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default database pool bound.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Default session and grant lifetime (15 minutes).
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 900;

/// Upper bound on the session and grant lifetime (one year).
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Default room name prefix.
pub const DEFAULT_ROOM_PREFIX: &str = "voice_assistant_";

/// Prefix shared by every media backend variable.
const LIVEKIT_PREFIX: &str = "LIVEKIT_";

/// Name of the variable holding the JSON credential map.
const CREDENTIALS_JSON_VAR: &str = "LIVEKIT_CREDENTIALS_JSON";

/// Voice session service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Upper bound on pooled database connections.
    pub db_max_connections: u32,

    /// HMAC key for identity tokens. `None` when unset or empty; signing
    /// then fails with `ConfigMissing` at call time.
    pub uid_signing_secret: Option<SecretString>,

    /// Lifetime of session records and minted grants.
    pub session_ttl_seconds: u64,

    /// Prefix for derived room names.
    pub room_prefix: String,

    /// Triple from `LIVEKIT_URL` / `LIVEKIT_API_KEY` / `LIVEKIT_API_SECRET`.
    pub global_credentials: Option<CredentialSet>,

    /// Entries parsed from `LIVEKIT_CREDENTIALS_JSON`, keyed as written.
    pub credential_map: HashMap<String, CredentialSet>,

    /// Triples from `LIVEKIT_<KEY>_URL` / `_API_KEY` / `_API_SECRET`, keyed by `<KEY>`.
    pub named_credentials: HashMap<String, CredentialSet>,

    /// Shared key required by `/api/room-metadata`.
    pub metadata_api_key: Option<SecretString>,

    /// Domain attribute for cleared cookies on logout.
    pub auth_cookie_domain: Option<String>,

    /// Whether identity cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
}

/// Secrets, the database URL and the metadata key print as `[REDACTED]`;
/// credential maps print their keys only.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map_keys: Vec<&String> = self.credential_map.keys().collect();
        map_keys.sort();
        let mut named_keys: Vec<&String> = self.named_credentials.keys().collect();
        named_keys.sort();

        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("db_max_connections", &self.db_max_connections)
            .field(
                "uid_signing_secret",
                &self.uid_signing_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("room_prefix", &self.room_prefix)
            .field("global_credentials", &self.global_credentials)
            .field("credential_map_keys", &map_keys)
            .field("named_credential_keys", &named_keys)
            .field(
                "metadata_api_key",
                &self.metadata_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("auth_cookie_domain", &self.auth_cookie_domain)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid database pool configuration: {0}")]
    InvalidDbMaxConnections(String),

    #[error("Invalid session TTL configuration: {0}")]
    InvalidSessionTtl(String),

    #[error("Invalid room prefix: {0}")]
    InvalidRoomPrefix(String),

    #[error("Invalid credential map: {0}")]
    InvalidCredentialsJson(String),
}

/// Entry of the JSON credential map before empty-field filtering.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredentialEntry {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, alias = "api_key")]
    api_key: Option<String>,
    #[serde(default, alias = "api_secret")]
    api_secret: Option<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let db_max_connections = if let Some(value_str) = vars.get("DB_MAX_CONNECTIONS") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidDbMaxConnections(format!(
                    "DB_MAX_CONNECTIONS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidDbMaxConnections(
                    "DB_MAX_CONNECTIONS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_DB_MAX_CONNECTIONS
        };

        let uid_signing_secret = non_empty(vars, "UID_SIGNING_SECRET").map(SecretString::from);

        let session_ttl_seconds = if let Some(value_str) = vars.get("SESSION_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidSessionTtl(format!(
                    "SESSION_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidSessionTtl(
                    "SESSION_TTL_SECONDS must be greater than 0".to_string(),
                ));
            }

            if value > MAX_SESSION_TTL_SECONDS {
                return Err(ConfigError::InvalidSessionTtl(format!(
                    "SESSION_TTL_SECONDS must be at most {}, got {}",
                    MAX_SESSION_TTL_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_SESSION_TTL_SECONDS
        };

        let room_prefix = vars
            .get("ROOM_PREFIX")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ROOM_PREFIX.to_string());

        if room_prefix.chars().count() >= room::MAX_ROOM_NAME_LEN
            || !room::is_valid_room_name(&room_prefix)
        {
            return Err(ConfigError::InvalidRoomPrefix(format!(
                "ROOM_PREFIX must be 1-{} characters of [A-Za-z0-9_-], got '{}'",
                room::MAX_ROOM_NAME_LEN - 1,
                room_prefix
            )));
        }

        let global_credentials = credential_triple(
            vars,
            "LIVEKIT_URL",
            "LIVEKIT_API_KEY",
            "LIVEKIT_API_SECRET",
        );

        let credential_map = match non_empty(vars, CREDENTIALS_JSON_VAR) {
            Some(raw) => parse_credential_map(&raw)?,
            None => HashMap::new(),
        };

        let named_credentials = collect_named_credentials(vars);

        let metadata_api_key = non_empty(vars, "METADATA_API_KEY").map(SecretString::from);

        let auth_cookie_domain = non_empty(vars, "AUTH_COOKIE_DOMAIN");

        let cookie_secure = vars
            .get("COOKIE_SECURE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Config {
            database_url,
            bind_address,
            db_max_connections,
            uid_signing_secret,
            session_ttl_seconds,
            room_prefix,
            global_credentials,
            credential_map,
            named_credentials,
            metadata_api_key,
            auth_cookie_domain,
            cookie_secure,
        })
    }
}

/// Trimmed value of `name`, or `None` when absent or blank.
fn non_empty(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn credential_triple(
    vars: &HashMap<String, String>,
    url_var: &str,
    key_var: &str,
    secret_var: &str,
) -> Option<CredentialSet> {
    Some(CredentialSet {
        url: non_empty(vars, url_var)?,
        api_key: non_empty(vars, key_var)?,
        api_secret: SecretString::from(non_empty(vars, secret_var)?),
    })
}

/// Parse the JSON credential map. Entries missing a field are skipped;
/// a payload that is not a JSON object is a startup error.
fn parse_credential_map(raw: &str) -> Result<HashMap<String, CredentialSet>, ConfigError> {
    let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)
        .map_err(|e| {
            ConfigError::InvalidCredentialsJson(format!(
                "{} must be a JSON object: {}",
                CREDENTIALS_JSON_VAR, e
            ))
        })?;

    let mut map = HashMap::new();
    for (key, value) in entries {
        let parsed = serde_json::from_value::<RawCredentialEntry>(value)
            .ok()
            .and_then(|entry| {
                let url = entry.url.filter(|v| !v.trim().is_empty())?;
                let api_key = entry.api_key.filter(|v| !v.trim().is_empty())?;
                let api_secret = entry.api_secret.filter(|v| !v.trim().is_empty())?;
                Some(CredentialSet {
                    url,
                    api_key,
                    api_secret: SecretString::from(api_secret),
                })
            });

        match parsed {
            Some(set) => {
                map.insert(key, set);
            }
            None => {
                tracing::warn!(
                    target: "vs.config",
                    key = %key,
                    "Ignoring incomplete credential map entry"
                );
            }
        }
    }

    Ok(map)
}

/// Collect `LIVEKIT_<KEY>_URL` / `_API_KEY` / `_API_SECRET` triples.
///
/// Keys are discovered from the `_API_SECRET` variable; the global triple
/// (empty `<KEY>`) is excluded.
fn collect_named_credentials(vars: &HashMap<String, String>) -> HashMap<String, CredentialSet> {
    let mut named = HashMap::new();

    for name in vars.keys() {
        let Some(key) = name
            .strip_prefix(LIVEKIT_PREFIX)
            .and_then(|rest| rest.strip_suffix("_API_SECRET"))
        else {
            continue;
        };

        if key.is_empty() {
            continue;
        }

        let triple = credential_triple(
            vars,
            &format!("{LIVEKIT_PREFIX}{key}_URL"),
            &format!("{LIVEKIT_PREFIX}{key}_API_KEY"),
            name,
        );

        if let Some(set) = triple {
            named.insert(key.to_string(), set);
        }
    }

    named
}
