//! Deployment registry storage.

use crate::errors::LtiError;
use crate::models::Deployment;
use crate::observability::metrics::record_db_query;
use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Instant;

/// Insert a deployment row. Duplicates are allowed.
pub async fn create_deployment(
    pool: &SqlitePool,
    client_id: &str,
    deployment_id: &str,
    platform_issuer: &str,
) -> Result<Deployment, LtiError> {
    let start = Instant::now();
    let result = sqlx::query_as::<_, Deployment>(
        r#"
        INSERT INTO lti_deployments (client_id, deployment_id, platform_issuer, created_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, client_id, deployment_id, platform_issuer, created_at
        "#,
    )
    .bind(client_id)
    .bind(deployment_id)
    .bind(platform_issuer)
    .bind(Utc::now())
    .fetch_one(pool)
    .await;
    let status = if result.is_ok() { "success" } else { "error" };
    record_db_query("insert", "lti_deployments", status, start.elapsed());
    let deployment =
        result.map_err(|e| LtiError::Database(format!("Failed to create deployment: {}", e)))?;

    Ok(deployment)
}

/// All deployments, oldest first.
pub async fn list_deployments(pool: &SqlitePool) -> Result<Vec<Deployment>, LtiError> {
    let start = Instant::now();
    let result = sqlx::query_as::<_, Deployment>(
        r#"
        SELECT id, client_id, deployment_id, platform_issuer, created_at
        FROM lti_deployments
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await;
    let status = if result.is_ok() { "success" } else { "error" };
    record_db_query("select", "lti_deployments", status, start.elapsed());
    let deployments =
        result.map_err(|e| LtiError::Database(format!("Failed to list deployments: {}", e)))?;

    Ok(deployments)
}

/// Most recent deployment matching the full (client, deployment, issuer) triple.
pub async fn find_deployment(
    pool: &SqlitePool,
    client_id: &str,
    deployment_id: &str,
    platform_issuer: &str,
) -> Result<Option<Deployment>, LtiError> {
    let start = Instant::now();
    let result = sqlx::query_as::<_, Deployment>(
        r#"
        SELECT id, client_id, deployment_id, platform_issuer, created_at
        FROM lti_deployments
        WHERE client_id = ?1 AND deployment_id = ?2 AND platform_issuer = ?3
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(client_id)
    .bind(deployment_id)
    .bind(platform_issuer)
    .fetch_optional(pool)
    .await;
    let status = if result.is_ok() { "success" } else { "error" };
    record_db_query("select", "lti_deployments", status, start.elapsed());
    let deployment =
        result.map_err(|e| LtiError::Database(format!("Failed to find deployment: {}", e)))?;

    Ok(deployment)
}
