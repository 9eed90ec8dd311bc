//! Liveness, readiness and metrics endpoints.

use lti_test_utils::{MockPlatform, TestToolServer};
use reqwest::StatusCode;
use serde_json::Value;
use sqlx::SqlitePool;

#[sqlx::test(migrations = "../../migrations")]
async fn test_health_endpoint_returns_ok(pool: SqlitePool) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    let response = server
        .client()
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_ready_endpoint_returns_ok_when_healthy(
    pool: SqlitePool,
) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    let response = server
        .client()
        .get(format!("{}/ready", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["database"], "healthy");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_ready_endpoint_returns_503_when_db_closed(
    pool: SqlitePool,
) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    server.pool().close().await;

    let response = server
        .client()
        .get(format!("{}/ready", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["database"], "unhealthy");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_metrics_endpoint_is_exposed(pool: SqlitePool) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    let response = server
        .client()
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
