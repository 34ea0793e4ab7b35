use crate::config::Config;
use crate::errors::VsError;
use crate::models::IdentityToken;
use crate::observability::metrics::record_identity_verification;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::secret::ExposeSecret;
use ring::{constant_time, hmac};
use std::fmt;
use tracing::instrument;

/// bcrypt cost for password hashes created by this service.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Well-formed bcrypt hash of a random string, verified when a login names an
/// unknown user so that both failure paths cost one bcrypt verification.
const DUMMY_PASSWORD_HASH: &str = "$2b$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW";

/// Signs and verifies opaque user ids with HMAC-SHA256.
///
/// Built once from configuration. A signer without a key is valid to hold;
/// every call on it fails with `ConfigMissing`.
#[derive(Clone)]
pub struct IdentitySigner {
    key: Option<hmac::Key>,
}

impl fmt::Debug for IdentitySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySigner")
            .field("configured", &self.key.is_some())
            .finish()
    }
}

impl IdentitySigner {
    pub fn new(secret: Option<&[u8]>) -> Self {
        Self {
            key: secret
                .filter(|s| !s.is_empty())
                .map(|s| hmac::Key::new(hmac::HMAC_SHA256, s)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config
                .uid_signing_secret
                .as_ref()
                .map(|s| s.expose_secret().as_bytes()),
        )
    }

    fn key(&self) -> Result<&hmac::Key, VsError> {
        self.key
            .as_ref()
            .ok_or_else(|| VsError::ConfigMissing("UID_SIGNING_SECRET".to_string()))
    }

    /// Sign `uid`, returning 43 characters of unpadded URL-safe base64.
    #[instrument(skip_all)]
    pub fn sign(&self, uid: &str) -> Result<String, VsError> {
        let tag = hmac::sign(self.key()?, uid.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(tag.as_ref()))
    }

    /// Check `signature` against `uid` in constant time.
    ///
    /// Malformed or empty signatures verify as `false`. The only error is a
    /// missing signing key.
    #[instrument(skip_all)]
    pub fn verify(&self, uid: &str, signature: &str) -> Result<bool, VsError> {
        let key = self.key()?;

        let valid = match URL_SAFE_NO_PAD.decode(signature.trim()) {
            Ok(tag) if !tag.is_empty() => hmac::verify(key, uid.as_bytes(), &tag).is_ok(),
            _ => false,
        };

        record_identity_verification(if valid { "valid" } else { "invalid" });
        Ok(valid)
    }

    /// Issue an identity token for a non-empty `uid`.
    pub fn issue(&self, uid: &str) -> Result<IdentityToken, VsError> {
        if uid.is_empty() {
            return Err(VsError::InvalidIdentity("uid must not be empty".to_string()));
        }

        Ok(IdentityToken {
            uid: uid.to_string(),
            signature: self.sign(uid)?,
        })
    }
}

/// Compare two shared keys without leaking where they differ.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    constant_time::verify_slices_are_equal(provided.as_bytes(), expected.as_bytes()).is_ok()
}

/// Hash a password with bcrypt.
#[instrument(skip_all)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, VsError> {
    bcrypt::hash(password, cost)
        .map_err(|e| VsError::Crypto(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a bcrypt hash.
#[instrument(skip_all)]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, VsError> {
    bcrypt::verify(password, hash)
        .map_err(|e| VsError::Crypto(format!("Password verification failed: {}", e)))
}

/// Burn one bcrypt verification for a login that named no known user.
#[instrument(skip_all)]
pub fn verify_dummy_password(password: &str) {
    let _ = bcrypt::verify(password, DUMMY_PASSWORD_HASH);
}
