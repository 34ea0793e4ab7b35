//! Connection issuance E2E tests.
//!
//! Drives `/api/connection-details` and `/api/sessions` through the real
//! router with `TestVoiceServer`.

use reqwest::StatusCode;
use serde_json::{json, Value};
use sqlx::PgPool;
use vs_test_utils::*;

async fn post_json(
    url: &str,
    body: &Value,
    cookie: Option<&str>,
) -> Result<reqwest::Response, anyhow::Error> {
    let mut request = reqwest::Client::new().post(url).json(body);
    if let Some(cookie) = cookie {
        request = request.header("cookie", cookie);
    }
    Ok(request.send().await?)
}

async fn stored_metadata(pool: &PgPool, session_id: &str) -> Result<Value, anyhow::Error> {
    let (metadata,): (String,) =
        sqlx::query_as("SELECT metadata FROM sessions WHERE session_id = $1::UUID")
            .bind(session_id)
            .fetch_one(pool)
            .await?;
    Ok(serde_json::from_str(&metadata)?)
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_issue_with_body_identity_end_to_end(pool: PgPool) -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestVoiceServer::spawn(pool).await?;
    let sig = server.signer().sign(TEST_UID_E2E)?;
    assert!(server.signer().verify(TEST_UID_E2E, &sig)?);

    // Act
    let response = post_json(
        &format!("{}/api/connection-details", server.url()),
        &json!({
            "uid": TEST_UID_E2E,
            "uidSig": sig,
            "voice": "yuting",
            "language": "yue",
        }),
        None,
    )
    .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-store")
    );

    let bundle: Value = response.json().await?;
    assert_eq!(bundle["serverUrl"], TEST_YUE_URL);
    assert_eq!(bundle["roomName"], "voice_assistant_abc123");
    assert_eq!(bundle["participantName"], "user");
    assert!(bundle["sessionId"].is_string());

    let token = bundle["participantToken"]
        .as_str()
        .expect("participantToken should be a string")
        .to_string();
    token
        .assert_signed_with(TEST_YUE_API_SECRET)
        .assert_grant_for_room("voice_assistant_abc123")
        .assert_issued_by(TEST_YUE_API_KEY)
        .assert_identity(TEST_UID_E2E)
        .assert_full_room_capabilities();

    assert_eq!(
        count_sessions(server.pool(), Some("voice_assistant_abc123")).await?,
        1
    );

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_issue_with_cookie_identity_uses_default_credentials(
    pool: PgPool,
) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;
    let cookie = server.identity_cookie_header(TEST_UID_ALICE)?;

    let response = post_json(
        &format!("{}/api/connection-details", server.url()),
        &json!({}),
        Some(&cookie),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bundle: Value = response.json().await?;
    assert_eq!(bundle["serverUrl"], TEST_DEFAULT_URL);
    assert_eq!(bundle["roomName"], format!("voice_assistant_{TEST_UID_ALICE}"));

    bundle["participantToken"]
        .as_str()
        .expect("participantToken should be a string")
        .to_string()
        .assert_signed_with(TEST_DEFAULT_API_SECRET)
        .assert_issued_by(TEST_DEFAULT_API_KEY);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_empty_body_with_cookies_is_accepted(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;
    let cookie = server.identity_cookie_header(TEST_UID_BOB)?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/connection-details", server.url()))
        .header("cookie", cookie)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(count_sessions(server.pool(), None).await?, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_wrong_signature_is_401_and_writes_nothing(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;
    let sig_for_other_uid = server.signer().sign(TEST_UID_BOB)?;

    let response = post_json(
        &format!("{}/api/connection-details", server.url()),
        &json!({"uid": TEST_UID_ALICE, "uidSig": sig_for_other_uid}),
        None,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("www-authenticate"));
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "SIGNATURE_INVALID");

    assert_eq!(count_sessions(server.pool(), None).await?, 0);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_and_known_uid_fail_identically(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool.clone()).await?;
    seed_alice(&pool).await?;
    let url = format!("{}/api/connection-details", server.url());

    let known = post_json(&url, &json!({"uid": TEST_UID_ALICE, "uidSig": "forged"}), None).await?;
    let unknown = post_json(&url, &json!({"uid": "nobody", "uidSig": "forged"}), None).await?;

    assert_eq!(known.status(), unknown.status());
    let known: Value = known.json().await?;
    let unknown: Value = unknown.json().await?;
    assert_eq!(known, unknown);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_missing_uid_is_400(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;

    let response = post_json(
        &format!("{}/api/connection-details", server.url()),
        &json!({"voice": "yuting"}),
        None,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_IDENTITY");
    assert_eq!(count_sessions(server.pool(), None).await?, 0);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_only_whitelisted_metadata_is_persisted(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;
    let sig = server.signer().sign(TEST_UID_ALICE)?;

    let response = post_json(
        &format!("{}/api/connection-details", server.url()),
        &json!({
            "uid": TEST_UID_ALICE,
            "uidSig": sig,
            "participantName": "x",
            "secretField": "y",
        }),
        None,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bundle: Value = response.json().await?;
    assert_eq!(bundle["participantName"], "x");

    let session_id = bundle["sessionId"].as_str().expect("sessionId");
    let stored = stored_metadata(server.pool(), session_id).await?;
    assert_eq!(stored, json!({"participantName": "x"}));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_participant_id_becomes_grant_identity(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;
    let sig = server.signer().sign(TEST_UID_ALICE)?;

    let response = post_json(
        &format!("{}/api/connection-details", server.url()),
        &json!({
            "uid": TEST_UID_ALICE,
            "uidSig": sig,
            "participantId": "device-42",
            "agentName": "voice-agent",
        }),
        None,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bundle: Value = response.json().await?;
    let claims = decode_grant(
        bundle["participantToken"].as_str().expect("token"),
        TEST_DEFAULT_API_SECRET,
    );
    assert_eq!(claims.sub, "device-42");
    assert_eq!(claims.video.room, format!("voice_assistant_{TEST_UID_ALICE}"));
    let agents = claims.room_config.expect("room_config").agents;
    assert_eq!(agents.len(), 1);
    assert_eq!(agents.first().map(|a| a.agent_name.as_str()), Some("voice-agent"));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_sessions_route_behaves_like_connection_details(
    pool: PgPool,
) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;
    let sig = server.signer().sign(TEST_UID_E2E)?;

    let response = post_json(
        &format!("{}/api/sessions", server.url()),
        &json!({"uid": TEST_UID_E2E, "uidSig": sig, "voice": "YUTING", "language": "YUE"}),
        None,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let bundle: Value = response.json().await?;
    assert_eq!(bundle["serverUrl"], TEST_YUE_URL);
    assert_eq!(bundle["roomName"], "voice_assistant_abc123");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_repeat_issuance_creates_distinct_sessions(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;
    let cookie = server.identity_cookie_header(TEST_UID_ALICE)?;
    let url = format!("{}/api/connection-details", server.url());

    let first: Value = post_json(&url, &json!({}), Some(&cookie)).await?.json().await?;
    let second: Value = post_json(&url, &json!({}), Some(&cookie)).await?.json().await?;

    assert_eq!(first["roomName"], second["roomName"]);
    assert_ne!(first["sessionId"], second["sessionId"]);
    assert_eq!(count_sessions(server.pool(), None).await?, 2);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_missing_signing_secret_is_500(pool: PgPool) -> Result<(), anyhow::Error> {
    let mut vars = test_config_vars();
    vars.remove("UID_SIGNING_SECRET");
    let config = vs_service::config::Config::from_vars(&vars)?;
    let server = TestVoiceServer::spawn_with_config(pool, config).await?;

    let response = post_json(
        &format!("{}/api/connection-details", server.url()),
        &json!({"uid": TEST_UID_ALICE, "uidSig": "anything"}),
        None,
    )
    .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "CONFIG_MISSING");
    assert!(!body.to_string().contains("UID_SIGNING_SECRET"));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_no_credentials_is_500_and_writes_nothing(pool: PgPool) -> Result<(), anyhow::Error> {
    let mut vars = test_config_vars();
    vars.remove("LIVEKIT_CREDENTIALS_JSON");
    let config = vs_service::config::Config::from_vars(&vars)?;
    let server = TestVoiceServer::spawn_with_config(pool, config).await?;
    let cookie = server.identity_cookie_header(TEST_UID_ALICE)?;

    let response = post_json(
        &format!("{}/api/connection-details", server.url()),
        &json!({}),
        Some(&cookie),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "CREDENTIALS_NOT_CONFIGURED");
    assert_eq!(count_sessions(server.pool(), None).await?, 0);

    Ok(())
}
