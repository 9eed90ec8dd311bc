//! Deployment registration and tool metadata.
//!
//! Two registration paths write to the same registry:
//! - [`register`]: direct insert of a known (client, deployment, issuer) triple
//! - [`register_from_tool_proxy`]: the LTI 2.0 handshake form posted by a platform

use crate::config::Config;
use crate::errors::LtiError;
use crate::models::{
    Deployment, Placement, PlacementSettings, PlatformExtension, RegistrationRequest,
    ToolConfiguration,
};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_registration;
use crate::repositories::deployments;
use common::secret::ExposeSecret;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::instrument;
use url::Url;

/// OAuth scopes requested from the platform.
pub const TOOL_SCOPES: [&str; 3] = [
    "https://purl.imsglobal.org/spec/lti-ags/scope/lineitem",
    "https://purl.imsglobal.org/spec/lti-ags/scope/result.readonly",
    "https://purl.imsglobal.org/spec/lti-nrps/scope/contextmembership.readonly",
];

/// Record a platform deployment.
#[instrument(skip_all)]
pub async fn register(
    pool: &SqlitePool,
    config: &Config,
    client_id: &str,
    deployment_id: &str,
    issuer: &str,
) -> Result<Deployment, LtiError> {
    let result = deployments::create_deployment(pool, client_id, deployment_id, issuer).await;
    record_registration(if result.is_ok() { "success" } else { "error" });
    let deployment = result?;

    tracing::info!(
        target: "lti.registration",
        id = deployment.id,
        client = %hash_for_correlation(&config.secret_key, client_id),
        issuer = %issuer,
        "Deployment registered"
    );
    Ok(deployment)
}

/// Record a deployment from an LTI 2.0 registration form.
///
/// `client_id` is the platform's `reg_key`, `deployment_id` the configured
/// `LTI_DEPLOYMENT_ID` and the issuer the origin of `tc_profile_url`.
/// `reg_password` must be present but is neither stored nor logged.
///
/// # Errors
///
/// Returns `LtiError::InvalidRegistration` for a missing or empty field or a
/// `tc_profile_url` that is not an absolute http(s) URL.
#[instrument(skip_all)]
pub async fn register_from_tool_proxy(
    pool: &SqlitePool,
    config: &Config,
    request: &RegistrationRequest,
) -> Result<Deployment, LtiError> {
    let fields = validate_registration(request);
    if fields.is_err() {
        record_registration("error");
    }
    let (reg_key, issuer) = fields?;

    register(pool, config, reg_key, &config.lti_deployment_id, &issuer).await
}

fn validate_registration(request: &RegistrationRequest) -> Result<(&str, String), LtiError> {
    let reg_key = request
        .reg_key
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LtiError::InvalidRegistration("missing reg_key".to_string()))?;

    let has_password = request
        .reg_password
        .as_ref()
        .is_some_and(|p| !p.expose_secret().is_empty());
    if !has_password {
        return Err(LtiError::InvalidRegistration(
            "missing reg_password".to_string(),
        ));
    }

    let profile_url = request
        .tc_profile_url
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LtiError::InvalidRegistration("missing tc_profile_url".to_string()))?;

    Ok((reg_key, platform_origin(profile_url)?))
}

/// Scheme, host and (non-default) port of the tool consumer profile URL.
fn platform_origin(profile_url: &str) -> Result<String, LtiError> {
    let url = Url::parse(profile_url).map_err(|e| {
        LtiError::InvalidRegistration(format!("tc_profile_url is not a valid URL: {}", e))
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return Err(LtiError::InvalidRegistration(
            "tc_profile_url must be an http(s) URL".to_string(),
        ));
    }

    Ok(url.origin().ascii_serialization())
}

/// LTI 1.3 tool configuration served at `/lti/config`.
pub fn tool_configuration(config: &Config) -> ToolConfiguration {
    let placement = Placement {
        placement: "course_navigation".to_string(),
        message_type: "LtiResourceLinkRequest".to_string(),
        target_link_uri: config.tool_launch_url.clone(),
        text: config.app_name.clone(),
        icon_url: config.tool_icon_url.clone(),
    };

    ToolConfiguration {
        title: config.app_name.clone(),
        description: config.tool_description.clone(),
        scopes: TOOL_SCOPES.iter().map(ToString::to_string).collect(),
        public_jwk_url: config.public_jwk_url(),
        target_link_uri: config.tool_launch_url.clone(),
        oidc_initiation_url: config.tool_login_url.clone(),
        extensions: vec![PlatformExtension {
            platform: "canvas.instructure.com".to_string(),
            privacy_level: "public".to_string(),
            settings: PlacementSettings {
                text: config.app_name.clone(),
                placements: vec![placement],
            },
        }],
    }
}

/// LTI 2.0 tool proxy descriptor served at `GET /lti/register`.
pub fn tool_proxy_descriptor(config: &Config) -> Value {
    let mut product_instance = json!({
        "guid": config.tool_proxy_guid,
        "product_info": {
            "product_name": { "default_value": config.app_name },
            "description": { "default_value": config.tool_description },
            "product_version": env!("CARGO_PKG_VERSION"),
            "product_family": {
                "code": config.tool_code,
                "vendor": {
                    "code": config.tool_vendor_code,
                    "vendor_name": { "default_value": config.tool_vendor_name },
                    "description": { "default_value": config.tool_vendor_description },
                    "website": config.tool_vendor_url,
                    "contact": { "email": config.tool_contact_email }
                }
            }
        },
        "support": { "email": config.tool_contact_email }
    });

    if let (Some(icon), Some(info)) = (
        &config.tool_icon_url,
        product_instance.get_mut("product_info"),
    ) {
        if let Some(info) = info.as_object_mut() {
            info.insert("icon".to_string(), json!({ "default_location": { "path": icon } }));
        }
    }

    json!({
        "@context": ["http://purl.imsglobal.org/ctx/lti/v2/ToolProxy"],
        "@type": "ToolProxy",
        "lti_version": "LTI-2p0",
        "tool_proxy_guid": config.tool_proxy_guid,
        "tool_profile": {
            "lti_version": "LTI-2p0",
            "product_instance": product_instance,
            "base_url_choice": [{
                "default_base_url": config.tool_url,
                "selector": { "applies_to": ["MessageHandler"] }
            }],
            "resource_handler": [{
                "resource_type": { "code": config.tool_code },
                "resource_name": { "default_value": config.app_name },
                "message": [{
                    "message_type": "basic-lti-launch-request",
                    "path": config.tool_launch_url,
                    "enabled_capability": []
                }]
            }]
        },
        "security_contract": { "tool_service": [] }
    })
}
