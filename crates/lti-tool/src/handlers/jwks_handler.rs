use crate::models::Jwks;
use crate::routes::AppState;
use axum::{
    extract::State,
    http::header::{HeaderMap, HeaderValue, CACHE_CONTROL},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handle JWKS request
///
/// GET /.well-known/jwks.json
///
/// Returns the tool's public signing key in JWKS format (RFC 7517)
/// with Cache-Control header set to max-age=3600 (1 hour)
#[instrument(skip_all, name = "lti.jwks.get")]
pub async fn handle_get_jwks(State(state): State<Arc<AppState>>) -> (HeaderMap, Json<Jwks>) {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=3600"));

    (headers, Json(state.key_manager.jwks()))
}
