//! HTTP routes for the LTI tool.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::crypto::KeyManager;
use crate::handlers::{self, jwks_handler, lti_handler, registration_handler};
use crate::services::launch_service::LaunchValidator;
use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: SqlitePool,

    /// Service configuration.
    pub config: Config,

    /// The tool's signing keypair.
    pub key_manager: Arc<KeyManager>,

    /// Launch token validator with its platform JWKS cache.
    pub launch_validator: Arc<LaunchValidator>,
}

/// Build the application routes.
///
/// - `/lti/config` - Tool configuration JSON
/// - `/lti/login` - OIDC login initiation (GET or POST)
/// - `/lti/launch` - Launch token validation (POST)
/// - `/lti/register` - LTI 2.0 tool proxy descriptor (GET) and registration (POST)
/// - `/.well-known/jwks.json` - The tool's public key
/// - `/health`, `/ready` - Probes
/// - `/metrics` - Prometheus scrape endpoint
///
/// All routes share a TraceLayer and a 30 second request timeout.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let app_routes = Router::new()
        .route("/lti/config", get(lti_handler::handle_config))
        .route(
            "/lti/login",
            get(lti_handler::handle_login_get).post(lti_handler::handle_login_post),
        )
        .route("/lti/launch", post(lti_handler::handle_launch))
        .route(
            "/lti/register",
            get(registration_handler::handle_get_tool_proxy)
                .post(registration_handler::handle_register),
        )
        .route("/.well-known/jwks.json", get(jwks_handler::handle_get_jwks))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    app_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
