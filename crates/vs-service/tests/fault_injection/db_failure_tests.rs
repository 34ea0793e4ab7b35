//! Fault injection tests for database failures.
//!
//! - A deferred constraint trigger makes COMMIT fail after the insert has
//!   succeeded, exercising the rollback path of session creation.
//! - `pool.close()` simulates the database becoming unreachable.

use common::types::SessionId;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use uuid::Uuid;
use vs_service::errors::VsError;
use vs_service::repositories::sessions;
use vs_test_utils::*;

const DOOMED_UID: &str = "doomed";
const DOOMED_ROOM: &str = "voice_assistant_doomed";

/// Install a trigger that fails any transaction inserting a row for the
/// doomed room, but only when that transaction commits.
async fn fail_commits_for_doomed_room(pool: &PgPool) -> Result<(), anyhow::Error> {
    sqlx::raw_sql(
        r#"
        CREATE FUNCTION reject_doomed_session() RETURNS trigger AS $$
        BEGIN
            IF NEW.room_name = 'voice_assistant_doomed' THEN
                RAISE EXCEPTION 'injected commit failure';
            END IF;
            RETURN NEW;
        END
        $$ LANGUAGE plpgsql;

        CREATE CONSTRAINT TRIGGER reject_doomed_session_at_commit
            AFTER INSERT ON sessions
            DEFERRABLE INITIALLY DEFERRED
            FOR EACH ROW EXECUTE FUNCTION reject_doomed_session();
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn rows_for_session(pool: &PgPool, session_id: Uuid) -> Result<i64, anyhow::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE session_id = $1")
        .bind(session_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_commit_failure_leaves_no_row(pool: PgPool) -> Result<(), anyhow::Error> {
    // Arrange
    fail_commits_for_doomed_room(&pool).await?;
    let session_id = SessionId::new();

    // Act
    let result = sessions::create_session(
        &pool,
        session_id,
        DOOMED_ROOM,
        DOOMED_UID,
        Map::new(),
        900,
    )
    .await;

    // Assert
    assert!(
        matches!(result, Err(VsError::SessionCreateFailed(_))),
        "commit failure should surface as SessionCreateFailed, got {result:?}"
    );
    assert_eq!(rows_for_session(&pool, session_id.0).await?, 0);

    // Other rooms are unaffected
    sessions::create_session(
        &pool,
        SessionId::new(),
        "voice_assistant_fine",
        "fine",
        Map::new(),
        900,
    )
    .await?;
    assert_eq!(count_sessions(&pool, None).await?, 1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_commit_failure_over_http_is_generic_500(pool: PgPool) -> Result<(), anyhow::Error> {
    fail_commits_for_doomed_room(&pool).await?;
    let server = TestVoiceServer::spawn(pool.clone()).await?;
    let sig = server.signer().sign(DOOMED_UID)?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/connection-details", server.url()))
        .json(&json!({"uid": DOOMED_UID, "uidSig": sig}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "SESSION_CREATE_FAILED");
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(!message.contains("injected"), "driver error must not leak");
    assert!(body.get("participantToken").is_none());

    assert_eq!(count_sessions(&pool, Some(DOOMED_ROOM)).await?, 0);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_readiness_returns_503_when_db_unavailable(pool: PgPool) -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestVoiceServer::spawn(pool.clone()).await?;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/ready", server.url())).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Act
    pool.close().await;

    // Assert
    let response = client.get(format!("{}/ready", server.url())).send().await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["database"], "unhealthy");
    let error = body["error"].as_str().expect("error message should be present");
    assert_eq!(error, "Service dependencies unavailable");
    assert!(!error.to_lowercase().contains("postgres"));

    // Liveness is unaffected
    let health = client.get(format!("{}/health", server.url())).send().await?;
    assert_eq!(health.status(), StatusCode::OK);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_issuance_with_db_down_is_500_without_details(
    pool: PgPool,
) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool.clone()).await?;
    let cookie = server.identity_cookie_header(TEST_UID_ALICE)?;
    pool.close().await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/connection-details", server.url()))
        .header("cookie", cookie)
        .json(&json!({}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "SESSION_CREATE_FAILED");
    assert!(!body.to_string().to_lowercase().contains("pool"));

    Ok(())
}
