//! Agent-facing room metadata lookup E2E tests.

use chrono::{Duration, Utc};
use common::types::SessionId;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use vs_service::models::{SessionRecord, SessionStatus};
use vs_service::repositories::sessions;
use vs_test_utils::*;

const ROOM: &str = "voice_assistant_alice-0001";

fn metadata(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

async fn lookup(
    server: &TestVoiceServer,
    room: Option<&str>,
    api_key: Option<&str>,
) -> Result<reqwest::Response, anyhow::Error> {
    let mut url = format!("{}/api/room-metadata", server.url());
    if let Some(room) = room {
        url.push_str("?room=");
        url.push_str(room);
    }
    let mut request = reqwest::Client::new().get(url);
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }
    Ok(request.send().await?)
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_lookup_after_issuance(pool: PgPool) -> Result<(), anyhow::Error> {
    // Arrange - issue a connection for Alice
    let server = TestVoiceServer::spawn(pool).await?;
    let sig = server.signer().sign(TEST_UID_ALICE)?;
    let bundle: Value = reqwest::Client::new()
        .post(format!("{}/api/connection-details", server.url()))
        .json(&json!({
            "uid": TEST_UID_ALICE,
            "uidSig": sig,
            "voice": "yuting",
            "gender": "female",
            "apiSecret": "must-not-persist",
        }))
        .send()
        .await?
        .json()
        .await?;

    // Act
    let response = lookup(&server, Some(ROOM), Some(TEST_METADATA_API_KEY)).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["found"], true);
    assert_eq!(body["uid"], TEST_UID_ALICE);
    assert_eq!(body["sessionId"], bundle["sessionId"]);
    assert_eq!(body["metadata"], json!({"voice": "yuting", "gender": "female"}));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_room_is_not_found(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;

    let response = lookup(&server, Some("voice_assistant_nobody"), Some(TEST_METADATA_API_KEY)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"found": false}));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_expired_session_is_not_found(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool.clone()).await?;

    // Insert a row that expired a minute ago
    let created_at = Utc::now() - Duration::minutes(20);
    let record = SessionRecord {
        session_id: SessionId::new(),
        room_name: ROOM.to_string(),
        uid: TEST_UID_ALICE.to_string(),
        metadata: metadata(json!({"voice": "yuting"})),
        created_at,
        expire_at: created_at + Duration::minutes(19),
        status: SessionStatus::Active,
        version: 1,
    };
    let mut conn = pool.acquire().await?;
    sessions::insert_session(&mut conn, &record).await?;
    drop(conn);

    let response = lookup(&server, Some(ROOM), Some(TEST_METADATA_API_KEY)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["found"], false);
    assert_eq!(count_sessions(&pool, Some(ROOM)).await?, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_wrong_or_missing_api_key_is_401(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;

    let wrong = lookup(&server, Some(ROOM), Some("not-the-key")).await?;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let missing = lookup(&server, Some(ROOM), None).await?;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let body: Value = missing.json().await?;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unconfigured_api_key_rejects_everything(pool: PgPool) -> Result<(), anyhow::Error> {
    let mut vars = test_config_vars();
    vars.remove("METADATA_API_KEY");
    let config = vs_service::config::Config::from_vars(&vars)?;
    let server = TestVoiceServer::spawn_with_config(pool, config).await?;

    let response = lookup(&server, Some(ROOM), Some("")).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_missing_room_is_400(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;

    let missing = lookup(&server, None, Some(TEST_METADATA_API_KEY)).await?;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let blank = lookup(&server, Some("%20"), Some(TEST_METADATA_API_KEY)).await?;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_api_key_checked_before_room(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;

    let response = lookup(&server, None, Some("not-the-key")).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
