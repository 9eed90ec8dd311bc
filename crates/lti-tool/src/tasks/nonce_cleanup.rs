//! Nonce cleanup background task.
//!
//! Launches that never arrive leave their login nonce behind. This task
//! periodically deletes nonces older than the configured TTL.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is cancelled, after finishing
//! any purge already in progress.

use crate::repositories::nonces;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Start the nonce cleanup loop. Runs one purge every `interval`.
#[instrument(skip_all, name = "lti.task.nonce_cleanup")]
pub async fn start_nonce_cleanup(
    pool: SqlitePool,
    interval: Duration,
    nonce_ttl: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "lti.task.nonce_cleanup",
        interval_seconds = interval.as_secs(),
        nonce_ttl_seconds = nonce_ttl.as_secs(),
        "Starting nonce cleanup task"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_cleanup(&pool, nonce_ttl).await;
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "lti.task.nonce_cleanup",
                    "Nonce cleanup task received shutdown signal, exiting"
                );
                break;
            }
        }
    }
}

/// Run a single purge. Errors are logged; the loop keeps going.
pub(crate) async fn run_cleanup(pool: &SqlitePool, nonce_ttl: Duration) -> u64 {
    match nonces::purge_expired(pool, nonce_ttl).await {
        Ok(count) => {
            if count > 0 {
                info!(
                    target: "lti.task.nonce_cleanup",
                    purged = count,
                    "Purged expired nonces"
                );
            }
            count
        }
        Err(e) => {
            warn!(
                target: "lti.task.nonce_cleanup",
                error = %e,
                "Nonce purge failed"
            );
            0
        }
    }
}
