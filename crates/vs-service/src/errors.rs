//! Voice session error types.
//!
//! Every error maps to a stable code and a generic message via the
//! `IntoResponse` impl. Raw causes are logged server-side only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Voice session error type.
///
/// Maps to HTTP status codes:
/// - InvalidIdentity, ValidationError: 400 Bad Request
/// - SignatureInvalid, InvalidCredentials, Unauthorized: 401 Unauthorized
/// - everything else: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum VsError {
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Identity signature invalid")]
    SignatureInvalid,

    #[error("No media credentials configured")]
    CredentialsNotConfigured,

    #[error("Session create failed: {0}")]
    SessionCreateFailed(String),

    #[error("Session lookup failed: {0}")]
    SessionLookupFailed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Internal server error")]
    Internal,
}

impl VsError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            VsError::InvalidIdentity(_) | VsError::ValidationError(_) => 400,
            VsError::SignatureInvalid | VsError::InvalidCredentials | VsError::Unauthorized => 401,
            VsError::ConfigMissing(_)
            | VsError::CredentialsNotConfigured
            | VsError::SessionCreateFailed(_)
            | VsError::SessionLookupFailed(_)
            | VsError::Database(_)
            | VsError::Crypto(_)
            | VsError::Internal => 500,
        }
    }

    /// Stable error code exposed to callers.
    pub fn code(&self) -> &'static str {
        match self {
            VsError::ConfigMissing(_) => "CONFIG_MISSING",
            VsError::InvalidIdentity(_) => "INVALID_IDENTITY",
            VsError::SignatureInvalid => "SIGNATURE_INVALID",
            VsError::CredentialsNotConfigured => "CREDENTIALS_NOT_CONFIGURED",
            VsError::SessionCreateFailed(_) => "SESSION_CREATE_FAILED",
            VsError::SessionLookupFailed(_) => "SESSION_LOOKUP_FAILED",
            VsError::ValidationError(_) => "VALIDATION_ERROR",
            VsError::InvalidCredentials => "INVALID_CREDENTIALS",
            VsError::Unauthorized => "UNAUTHORIZED",
            VsError::Database(_) => "DATABASE_ERROR",
            VsError::Crypto(_) => "CRYPTO_ERROR",
            VsError::Internal => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for VsError {
    fn into_response(self) -> Response {
        let message = match &self {
            VsError::ConfigMissing(what) => {
                tracing::error!(target: "vs.config", missing = %what, "Required configuration missing");
                "Server misconfigured".to_string()
            }
            VsError::InvalidIdentity(reason) => reason.clone(),
            // Same message whether or not the uid is known
            VsError::SignatureInvalid => "Invalid identity signature".to_string(),
            VsError::CredentialsNotConfigured => {
                tracing::error!(target: "vs.credentials", "Credential resolution exhausted every tier");
                "Media server credentials are not configured".to_string()
            }
            VsError::SessionCreateFailed(err) => {
                tracing::error!(target: "vs.sessions", error = %err, "Session create failed");
                "Failed to create session".to_string()
            }
            VsError::SessionLookupFailed(err) => {
                tracing::error!(target: "vs.sessions", error = %err, "Session lookup failed");
                "Failed to look up session".to_string()
            }
            VsError::ValidationError(reason) => reason.clone(),
            VsError::InvalidCredentials => "Invalid username or password".to_string(),
            VsError::Unauthorized => "Unauthorized".to_string(),
            VsError::Database(err) => {
                tracing::error!(target: "vs.database", error = %err, "Database operation failed");
                "An internal database error occurred".to_string()
            }
            VsError::Crypto(err) => {
                tracing::error!(target: "vs.crypto", error = %err, "Cryptographic operation failed");
                "An internal cryptographic error occurred".to_string()
            }
            VsError::Internal => "An internal error occurred".to_string(),
        };

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Cookie realm=\"voice-session\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Convert sqlx errors to VsError
impl From<sqlx::Error> for VsError {
    fn from(err: sqlx::Error) -> Self {
        VsError::Database(err.to_string())
    }
}
