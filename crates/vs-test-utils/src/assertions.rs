//! Assertions over minted grant tokens.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use vs_service::services::grant_service::GrantClaims;

/// Decode a grant with `api_secret`, panicking with context on failure.
pub fn decode_grant(token: &str, api_secret: &str) -> GrantClaims {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    decode::<GrantClaims>(
        token,
        &DecodingKey::from_secret(api_secret.as_bytes()),
        &validation,
    )
    .unwrap_or_else(|e| panic!("grant should decode with the expected secret: {e}"))
    .claims
}

/// Chainable assertions on a grant token string.
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_signed_with(TEST_YUE_API_SECRET)
///     .assert_grant_for_room("voice_assistant_abc123")
///     .assert_issued_by(TEST_YUE_API_KEY)
///     .assert_full_room_capabilities();
/// ```
pub trait GrantAssertions {
    /// Token verifies under HS256 with `api_secret`.
    fn assert_signed_with(&self, api_secret: &str) -> &Self;

    /// `video.room` equals `room`. Signature is not checked.
    fn assert_grant_for_room(&self, room: &str) -> &Self;

    /// `iss` equals `api_key`. Signature is not checked.
    fn assert_issued_by(&self, api_key: &str) -> &Self;

    /// `sub` equals `identity`. Signature is not checked.
    fn assert_identity(&self, identity: &str) -> &Self;

    /// Join, publish, publish data and subscribe are all granted.
    fn assert_full_room_capabilities(&self) -> &Self;
}

/// Claims without signature verification.
fn peek(token: &str) -> GrantClaims {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    decode::<GrantClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .unwrap_or_else(|e| panic!("grant should be a well-formed JWT: {e}"))
        .claims
}

impl GrantAssertions for String {
    fn assert_signed_with(&self, api_secret: &str) -> &Self {
        decode_grant(self, api_secret);
        self
    }

    fn assert_grant_for_room(&self, room: &str) -> &Self {
        assert_eq!(peek(self).video.room, room, "grant room mismatch");
        self
    }

    fn assert_issued_by(&self, api_key: &str) -> &Self {
        assert_eq!(peek(self).iss, api_key, "grant issuer mismatch");
        self
    }

    fn assert_identity(&self, identity: &str) -> &Self {
        assert_eq!(peek(self).sub, identity, "grant identity mismatch");
        self
    }

    fn assert_full_room_capabilities(&self) -> &Self {
        let video = peek(self).video;
        assert!(video.room_join, "grant must allow roomJoin");
        assert!(video.can_publish, "grant must allow canPublish");
        assert!(video.can_publish_data, "grant must allow canPublishData");
        assert!(video.can_subscribe, "grant must allow canSubscribe");
        self
    }
}
