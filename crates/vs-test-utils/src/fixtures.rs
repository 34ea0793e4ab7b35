//! Config and account fixtures.

use crate::test_ids::*;
use sqlx::PgPool;
use std::collections::HashMap;
use vs_service::config::Config;
use vs_service::crypto;
use vs_service::repositories::users;

/// bcrypt cost for seeded accounts; keeps tests fast.
pub const TEST_BCRYPT_COST: u32 = 4;

/// Credential map with a `YUTING_YUE` entry and a `default` entry.
pub fn test_credentials_json() -> String {
    serde_json::json!({
        "YUTING_YUE": {
            "url": TEST_YUE_URL,
            "apiKey": TEST_YUE_API_KEY,
            "apiSecret": TEST_YUE_API_SECRET,
        },
        "default": {
            "url": TEST_DEFAULT_URL,
            "apiKey": TEST_DEFAULT_API_KEY,
            "apiSecret": TEST_DEFAULT_API_SECRET,
        },
    })
    .to_string()
}

/// Environment used by the test server.
pub fn test_config_vars() -> HashMap<String, String> {
    HashMap::from([
        (
            "DATABASE_URL".to_string(),
            "postgresql://test/test".to_string(),
        ),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        (
            "UID_SIGNING_SECRET".to_string(),
            TEST_SIGNING_SECRET.to_string(),
        ),
        (
            "METADATA_API_KEY".to_string(),
            TEST_METADATA_API_KEY.to_string(),
        ),
        (
            "LIVEKIT_CREDENTIALS_JSON".to_string(),
            test_credentials_json(),
        ),
    ])
}

/// Config built from [`test_config_vars`].
pub fn test_config() -> Result<Config, anyhow::Error> {
    Config::from_vars(&test_config_vars())
        .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}

/// Insert a login-capable account with a bcrypt-hashed password.
pub async fn seed_user(
    pool: &PgPool,
    uid: &str,
    name: &str,
    mail: Option<&str>,
    phone: Option<&str>,
    password: &str,
) -> Result<(), anyhow::Error> {
    let hash = crypto::hash_password(password, TEST_BCRYPT_COST)?;
    users::create_user(pool, uid, name, mail, phone, &hash).await?;
    Ok(())
}

/// Seed the Alice account from `test_ids`.
pub async fn seed_alice(pool: &PgPool) -> Result<(), anyhow::Error> {
    seed_user(
        pool,
        TEST_UID_ALICE,
        TEST_ALICE_NAME,
        Some(TEST_ALICE_MAIL),
        Some(TEST_ALICE_PHONE),
        TEST_ALICE_PASSWORD,
    )
    .await
}

/// Count of session rows, optionally limited to one room.
pub async fn count_sessions(pool: &PgPool, room_name: Option<&str>) -> Result<i64, anyhow::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sessions WHERE $1::TEXT IS NULL OR room_name = $1",
    )
    .bind(room_name)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
