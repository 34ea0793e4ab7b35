//! Login and "who am I".

use crate::crypto::{self, IdentitySigner};
use crate::errors::VsError;
use crate::models::{IdentityToken, UserInfoResponse};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_login;
use crate::repositories::users;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

/// Whether `identifier` looks like a mail address (`x@y.z` somewhere in a
/// whitespace-free run); everything else is treated as a phone number.
pub fn is_mail_identifier(identifier: &str) -> bool {
    identifier.split_whitespace().any(|token| {
        token.char_indices().any(|(at, c)| {
            if c != '@' || at == 0 {
                return false;
            }
            let domain = token.get(at + 1..).unwrap_or_default();
            domain
                .char_indices()
                .any(|(dot, d)| d == '.' && dot > 0 && dot + 1 < domain.len())
        })
    })
}

/// Authenticated user plus the identity token to hand back as cookies.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub uid: String,
    pub name: String,
    pub token: IdentityToken,
}

/// Exchange identifier + password for an identity token.
///
/// Both fields are trimmed. Unknown identifiers, wrong passwords and
/// unusable stored hashes all return `InvalidCredentials`.
#[instrument(skip_all, name = "vs.auth.login")]
pub async fn login(
    pool: &PgPool,
    signer: &IdentitySigner,
    username: &str,
    password: &str,
) -> Result<LoginOutcome, VsError> {
    let result = login_inner(pool, signer, username, password).await;
    record_login(if result.is_ok() { "success" } else { "error" });
    result
}

async fn login_inner(
    pool: &PgPool,
    signer: &IdentitySigner,
    username: &str,
    password: &str,
) -> Result<LoginOutcome, VsError> {
    let username = username.trim();
    let password = password.trim();
    if username.is_empty() || password.is_empty() {
        return Err(VsError::ValidationError(
            "Username and password are required".to_string(),
        ));
    }

    let user = if is_mail_identifier(username) {
        users::get_by_mail(pool, username).await?
    } else {
        users::get_by_phone(pool, username).await?
    };

    let Some(user) = user else {
        crypto::verify_dummy_password(password);
        warn!(target: "vs.auth", "Login failed: unknown identifier");
        return Err(VsError::InvalidCredentials);
    };

    match crypto::verify_password(password, &user.password) {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                target: "vs.auth",
                uid_hash = %hash_for_correlation(&user.uuid),
                "Login failed: wrong password"
            );
            return Err(VsError::InvalidCredentials);
        }
        Err(e) => {
            warn!(
                target: "vs.auth",
                uid_hash = %hash_for_correlation(&user.uuid),
                error = %e,
                "Login failed: stored password hash is not bcrypt"
            );
            return Err(VsError::InvalidCredentials);
        }
    }

    let token = signer.issue(&user.uuid)?;

    info!(
        target: "vs.auth",
        uid_hash = %hash_for_correlation(&user.uuid),
        "Login succeeded"
    );

    Ok(LoginOutcome {
        uid: user.uuid,
        name: user.name,
        token,
    })
}

/// Resolve the caller from their identity cookies.
///
/// Missing or forged cookies are `Unauthorized`. A valid uid without a
/// user row yields an empty name.
#[instrument(skip_all, name = "vs.auth.me")]
pub async fn current_user(
    pool: &PgPool,
    signer: &IdentitySigner,
    uid: Option<&str>,
    signature: Option<&str>,
) -> Result<UserInfoResponse, VsError> {
    let (Some(uid), Some(signature)) = (
        uid.filter(|s| !s.is_empty()),
        signature.filter(|s| !s.is_empty()),
    ) else {
        return Err(VsError::Unauthorized);
    };

    if !signer.verify(uid, signature)? {
        return Err(VsError::Unauthorized);
    }

    let name = users::get_by_uid(pool, uid)
        .await?
        .map(|user| user.name)
        .unwrap_or_default();

    Ok(UserInfoResponse {
        ok: true,
        uuid: uid.to_string(),
        name,
    })
}
