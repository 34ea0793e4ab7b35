//! Operational endpoint tests: `/health`, `/ready`, `/metrics`, 404s.

use reqwest::StatusCode;
use sqlx::PgPool;
use vs_test_utils::TestVoiceServer;

#[sqlx::test(migrations = "../../migrations")]
async fn test_health_returns_ok(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_ready_with_healthy_database(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["database"], "healthy");
    assert!(body.get("error").is_none());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_metrics_endpoint_is_text(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    // Body content depends on which recorder this process installed first.
    response.text().await?;

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_route_returns_404(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestVoiceServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/api/unknown", server.url())).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
