//! Single-use login nonces.
//!
//! A `(state, nonce)` pair is stored when the login redirect is built and
//! removed by the launch that presents it. Consumption is one `DELETE`, so
//! two concurrent launches with the same nonce cannot both succeed.

use crate::errors::LtiError;
use crate::observability::metrics::record_db_query;
use chrono::Utc;
use sqlx::SqlitePool;
use std::time::{Duration, Instant};

fn cutoff(max_age: Duration) -> i64 {
    let age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    Utc::now().timestamp().saturating_sub(age)
}

/// Store an issued `(state, nonce)` pair.
pub async fn record_nonce(pool: &SqlitePool, state: &str, nonce: &str) -> Result<(), LtiError> {
    let start = Instant::now();
    let result = sqlx::query(
        r#"
        INSERT INTO lti_nonces (nonce, state, issued_at)
        VALUES (?1, ?2, ?3)
        "#,
    )
    .bind(nonce)
    .bind(state)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await;
    let status = if result.is_ok() { "success" } else { "error" };
    record_db_query("insert", "lti_nonces", status, start.elapsed());
    result.map_err(|e| LtiError::Database(format!("Failed to record nonce: {}", e)))?;

    Ok(())
}

/// Consume a nonce issued with `state` no longer than `max_age` ago.
///
/// Returns `false` if the pair is unknown, expired or already consumed.
pub async fn consume_nonce(
    pool: &SqlitePool,
    state: &str,
    nonce: &str,
    max_age: Duration,
) -> Result<bool, LtiError> {
    let start = Instant::now();
    let result = sqlx::query(
        r#"
        DELETE FROM lti_nonces
        WHERE nonce = ?1 AND state = ?2 AND issued_at >= ?3
        "#,
    )
    .bind(nonce)
    .bind(state)
    .bind(cutoff(max_age))
    .execute(pool)
    .await;
    let status = if result.is_ok() { "success" } else { "error" };
    record_db_query("delete", "lti_nonces", status, start.elapsed());
    let done = result.map_err(|e| LtiError::Database(format!("Failed to consume nonce: {}", e)))?;

    Ok(done.rows_affected() == 1)
}

/// Delete nonces older than `max_age`. Returns the number removed.
pub async fn purge_expired(pool: &SqlitePool, max_age: Duration) -> Result<u64, LtiError> {
    let start = Instant::now();
    let result = sqlx::query("DELETE FROM lti_nonces WHERE issued_at < ?1")
        .bind(cutoff(max_age))
        .execute(pool)
        .await;
    let status = if result.is_ok() { "success" } else { "error" };
    record_db_query("delete", "lti_nonces", status, start.elapsed());
    let done =
        result.map_err(|e| LtiError::Database(format!("Failed to purge nonces: {}", e)))?;

    Ok(done.rows_affected())
}
