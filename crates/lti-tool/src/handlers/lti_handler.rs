//! LTI 1.3 protocol endpoints: tool configuration, login initiation, launch.

use crate::errors::LtiError;
use crate::models::ToolConfiguration;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{record_launch, record_login};
use crate::routes::AppState;
use crate::services::{launch_service, login_service, registration_service};
use axum::{
    extract::{Query, State},
    response::Redirect,
    Form, Json,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// GET /lti/config
#[instrument(skip_all, name = "lti.config")]
pub async fn handle_config(State(state): State<Arc<AppState>>) -> Json<ToolConfiguration> {
    Json(registration_service::tool_configuration(&state.config))
}

/// GET /lti/login
///
/// Platforms may initiate login with a query string instead of a form post.
#[instrument(skip_all, name = "lti.login", fields(method = "GET", status))]
pub async fn handle_login_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Redirect, LtiError> {
    login(&state, "GET", &params).await
}

/// POST /lti/login
#[instrument(skip_all, name = "lti.login", fields(method = "POST", status))]
pub async fn handle_login_post(
    State(state): State<Arc<AppState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, LtiError> {
    login(&state, "POST", &form).await
}

async fn login(
    state: &AppState,
    method: &str,
    params: &HashMap<String, String>,
) -> Result<Redirect, LtiError> {
    let result = login_service::initiate_login(&state.pool, &state.config, params).await;

    let status = if result.is_ok() { "success" } else { "error" };
    tracing::Span::current().record("status", status);
    record_login(method, status);

    let url = result?;
    Ok(Redirect::to(url.as_str()))
}

/// POST /lti/launch
///
/// Redirects (303) to the tool application with the launch subject appended
/// as `sub`.
#[instrument(skip_all, name = "lti.launch", fields(status, reason))]
pub async fn handle_launch(
    State(state): State<Arc<AppState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, LtiError> {
    let start = Instant::now();

    let result = async {
        let claims = state.launch_validator.validate_launch(&form).await?;
        launch_service::enforce_launch_policy(&state.pool, &state.config, &form, &claims).await?;
        Ok::<_, LtiError>(claims)
    }
    .await;

    let (status, reason) = match &result {
        Ok(_) => ("success", "none"),
        Err(e) => ("error", e.metric_label()),
    };
    let span = tracing::Span::current();
    span.record("status", status);
    span.record("reason", reason);
    record_launch(status, reason, start.elapsed());

    let claims = result?;
    let subject = claims.subject().unwrap_or_default();

    tracing::info!(
        target: "lti.launch",
        user = %hash_for_correlation(&state.config.secret_key, subject),
        message_type = claims.message_type().unwrap_or_default(),
        "Launch accepted"
    );

    let mut redirect = state.config.tool_redirect_url.clone();
    redirect.query_pairs_mut().append_pair("sub", subject);
    Ok(Redirect::to(redirect.as_str()))
}
