use crate::errors::LtiError;
use crate::models::{Deployment, RegistrationRequest};
use crate::routes::AppState;
use crate::services::registration_service;
use axum::{extract::State, http::StatusCode, Form, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// GET /lti/register
///
/// Static LTI 2.0 tool proxy descriptor built from the vendor settings.
#[instrument(skip_all, name = "lti.registration.descriptor")]
pub async fn handle_get_tool_proxy(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(registration_service::tool_proxy_descriptor(&state.config))
}

/// POST /lti/register
///
/// Form body: `reg_key`, `reg_password`, `tc_profile_url`.
/// Returns 201 with the recorded deployment.
#[instrument(skip_all, name = "lti.registration.register", fields(status))]
pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    Form(request): Form<RegistrationRequest>,
) -> Result<(StatusCode, Json<Deployment>), LtiError> {
    let result =
        registration_service::register_from_tool_proxy(&state.pool, &state.config, &request).await;

    let status = if result.is_ok() { "success" } else { "error" };
    tracing::Span::current().record("status", status);

    Ok((StatusCode::CREATED, Json(result?)))
}
