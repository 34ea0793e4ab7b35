//! Observability for the voice session service.
//!
//! Handlers and crypto use `#[instrument(skip_all)]` and add fields
//! explicitly. Fields fall in three groups:
//! - **SAFE**: logged as-is (tiers, statuses, room prefixes)
//! - **HASHED**: SHA-256 for correlation (uids)
//! - **NEVER**: signatures, grant tokens, API secrets, passwords

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// One-way and truncated; good for matching log lines about the same uid,
/// not for protecting secrets.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Identity or API key rejected, bad login
    Authentication,
    /// Malformed input
    Validation,
    /// Missing configuration or credentials
    Configuration,
    /// Database, crypto, everything else
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&crate::errors::VsError> for ErrorCategory {
    fn from(err: &crate::errors::VsError) -> Self {
        use crate::errors::VsError;
        match err {
            VsError::SignatureInvalid | VsError::InvalidCredentials | VsError::Unauthorized => {
                ErrorCategory::Authentication
            }
            VsError::InvalidIdentity(_) | VsError::ValidationError(_) => ErrorCategory::Validation,
            VsError::ConfigMissing(_) | VsError::CredentialsNotConfigured => {
                ErrorCategory::Configuration
            }
            VsError::SessionCreateFailed(_)
            | VsError::SessionLookupFailed(_)
            | VsError::Database(_)
            | VsError::Crypto(_)
            | VsError::Internal => ErrorCategory::Internal,
        }
    }
}
