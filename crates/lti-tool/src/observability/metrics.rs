//! Metrics definitions for the LTI tool.
//!
//! All metrics follow Prometheus naming conventions:
//! - `lti_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: success, error (plus `cache_hit` for JWKS)
//! - `reason`: a `LaunchFailure` label or an error code, bounded by code
//! - `method`: GET, POST
//! - `operation`: select, insert, delete
//! - `table`: lti_deployments, lti_nonces

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle served on `/metrics`.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Launch validation includes a network round trip for the platform JWKS
        .set_buckets_for_metric(
            Matcher::Prefix("lti_launch_duration".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set launch buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("lti_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Protocol Metrics
// ============================================================================

/// Record a login initiation
///
/// Metric: `lti_login_total`
/// Labels: `method`, `status`
pub fn record_login(method: &str, status: &str) {
    counter!("lti_login_total", "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record launch validation duration and outcome
///
/// Metric: `lti_launch_total`, `lti_launch_duration_seconds`
/// Labels: `status`, `reason` (`none` on success)
pub fn record_launch(status: &str, reason: &str, duration: Duration) {
    histogram!("lti_launch_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("lti_launch_total", "status" => status.to_string(), "reason" => reason.to_string())
        .increment(1);
}

/// Record a platform JWKS lookup
///
/// Metric: `lti_jwks_fetch_total`
/// Labels: `status` (success, error, cache_hit)
pub fn record_jwks_fetch(status: &str) {
    counter!("lti_jwks_fetch_total", "status" => status.to_string()).increment(1);
}

/// Record a deployment registration attempt
///
/// Metric: `lti_registration_total`
/// Labels: `status`
pub fn record_registration(status: &str) {
    counter!("lti_registration_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `lti_db_query_duration_seconds`, `lti_db_queries_total`
/// Labels: `operation`, `table`, `status`
pub fn record_db_query(operation: &str, table: &str, status: &str, duration: Duration) {
    histogram!("lti_db_query_duration_seconds", "operation" => operation.to_string(), "table" => table.to_string())
        .record(duration.as_secs_f64());

    counter!("lti_db_queries_total", "operation" => operation.to_string(), "table" => table.to_string(), "status" => status.to_string())
        .increment(1);
}
