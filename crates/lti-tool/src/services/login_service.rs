//! OIDC login initiation (third-party initiated login, LTI 1.3 section 5.1.1).

use crate::config::Config;
use crate::crypto::generate_url_safe_token;
use crate::errors::LtiError;
use crate::models::AuthRedirectParams;
use crate::repositories::nonces;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::instrument;
use url::Url;

/// Parameters a platform must send to start a login, in the order checked.
pub const REQUIRED_LOGIN_PARAMS: [&str; 5] = [
    "iss",
    "target_link_uri",
    "login_hint",
    "lti_message_hint",
    "client_id",
];

/// Validate a login initiation request and build the authorization parameters.
///
/// Only presence is checked; an empty value is accepted.
///
/// # Errors
///
/// Returns `LtiError::MissingParameter` naming the first absent parameter.
pub fn validate_login(
    form: &HashMap<String, String>,
    redirect_uri: &str,
) -> Result<AuthRedirectParams, LtiError> {
    if let Some(missing) = REQUIRED_LOGIN_PARAMS
        .iter()
        .find(|name| !form.contains_key(**name))
    {
        return Err(LtiError::MissingParameter(*missing));
    }

    let field = |name: &str| form.get(name).cloned().unwrap_or_default();

    Ok(AuthRedirectParams::new(vec![
        ("state", generate_url_safe_token()?),
        ("nonce", generate_url_safe_token()?),
        ("prompt", "none".to_string()),
        ("response_type", "id_token".to_string()),
        ("response_mode", "form_post".to_string()),
        ("scope", "openid".to_string()),
        ("login_hint", field("login_hint")),
        ("lti_message_hint", field("lti_message_hint")),
        ("client_id", field("client_id")),
        ("redirect_uri", redirect_uri.to_string()),
    ]))
}

/// Append `params` to the platform authorization endpoint.
///
/// Values are percent-encoded; query pairs already on `endpoint` are kept.
pub fn build_auth_redirect_url(endpoint: &Url, params: &AuthRedirectParams) -> Url {
    let mut url = endpoint.clone();
    {
        let mut query = url.query_pairs_mut();
        for (name, value) in params.pairs() {
            query.append_pair(name, value);
        }
    }
    url
}

/// Handle a login initiation end to end.
///
/// When nonce enforcement is on, the issued `(state, nonce)` pair is stored
/// so the matching launch can consume it.
#[instrument(skip_all)]
pub async fn initiate_login(
    pool: &SqlitePool,
    config: &Config,
    form: &HashMap<String, String>,
) -> Result<Url, LtiError> {
    let params = validate_login(form, &config.tool_launch_url)?;

    if config.enforce_nonce {
        nonces::record_nonce(pool, params.state(), params.nonce()).await?;
    }

    let url = build_auth_redirect_url(&config.lti_auth_url, &params);
    tracing::debug!(target: "lti.login", platform = %config.lti_auth_url.host_str().unwrap_or_default(), "Login initiated");
    Ok(url)
}
