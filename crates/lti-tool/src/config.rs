//! Tool configuration loaded from environment variables.
//!
//! Variable names follow the `.env` layout platforms are usually handed when
//! installing the tool (`LTI_*` for the platform side, `TOOL_*` for this
//! tool's own URLs and vendor metadata).

use common::jwt::MAX_CLOCK_SKEW;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use thiserror::Error;
use url::Url;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Key ID published for the tool's signing key.
pub const DEFAULT_KEY_ID: &str = "lti-tool-signing-key";

/// Default JWKS cache TTL in seconds (5 minutes). `0` disables caching.
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default timeout for fetching the platform JWKS.
pub const DEFAULT_JWKS_TIMEOUT_SECONDS: u64 = 10;

/// Default JWT clock skew tolerance in seconds.
pub const DEFAULT_JWT_CLOCK_SKEW_SECONDS: u64 = 300;

/// Default lifetime of an issued login nonce (10 minutes).
pub const DEFAULT_NONCE_TTL_SECONDS: u64 = 600;

#[derive(Debug, Clone)]
pub struct Config {
    // Application
    pub app_name: String,
    pub tool_description: String,
    pub debug_mode: bool,
    pub bind_address: String,

    // Database
    pub database_url: String,

    // Platform (LTI) settings
    pub lti_client_id: String,
    pub lti_deployment_id: String,
    pub lti_issuer: String,
    /// Platform OIDC authorization endpoint.
    pub lti_auth_url: Url,
    /// Platform JWKS endpoint.
    pub lti_jwk_url: Url,

    // Tool URLs
    pub tool_url: String,
    pub tool_login_url: String,
    pub tool_launch_url: String,
    pub tool_redirect_url: Url,
    pub tool_code: String,
    pub tool_icon_url: Option<String>,

    // LTI 2.0 registration metadata
    pub tool_proxy_guid: String,
    pub tool_contact_email: String,
    pub tool_vendor_code: String,
    pub tool_vendor_name: String,
    pub tool_vendor_description: String,
    pub tool_vendor_url: String,

    // Security
    pub secret_key: SecretString,
    pub key_id: String,
    pub private_key_path: Option<String>,

    // Launch validation tuning
    pub jwks_cache_ttl_seconds: u64,
    pub jwks_timeout_seconds: u64,
    pub jwt_clock_skew_seconds: u64,
    pub nonce_ttl_seconds: u64,
    pub enforce_nonce: bool,
    pub enforce_deployment: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid URL in {name}: {reason}")]
    InvalidUrl { name: String, reason: String },

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let app_name = required(vars, "APP_NAME")?;
        let tool_code = required(vars, "TOOL_CODE")?;

        let jwt_clock_skew_seconds = parse_u64(
            vars,
            "LTI_JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_JWT_CLOCK_SKEW_SECONDS,
        )?;
        if jwt_clock_skew_seconds > MAX_CLOCK_SKEW.as_secs() {
            return Err(ConfigError::InvalidValue {
                name: "LTI_JWT_CLOCK_SKEW_SECONDS".to_string(),
                reason: format!(
                    "{} exceeds the maximum of {} seconds",
                    jwt_clock_skew_seconds,
                    MAX_CLOCK_SKEW.as_secs()
                ),
            });
        }

        let jwks_timeout_seconds = parse_u64(
            vars,
            "LTI_JWKS_TIMEOUT_SECONDS",
            DEFAULT_JWKS_TIMEOUT_SECONDS,
        )?;
        if jwks_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                name: "LTI_JWKS_TIMEOUT_SECONDS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Config {
            tool_description: required(vars, "TOOL_DESCRIPTION")?,
            debug_mode: parse_bool(vars, "DEBUG_MODE", false)?,
            bind_address: optional(vars, "BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            database_url: required(vars, "DATABASE_URL")?,
            lti_client_id: required(vars, "LTI_CLIENT_ID")?,
            lti_deployment_id: required(vars, "LTI_DEPLOYMENT_ID")?,
            lti_issuer: required(vars, "LTI_ISSUER")?,
            lti_auth_url: required_url(vars, "LTI_AUTH_TOKEN_URL")?,
            lti_jwk_url: required_url(vars, "LTI_JWK_URL")?,
            tool_url: required(vars, "TOOL_URL")?
                .trim_end_matches('/')
                .to_string(),
            tool_login_url: required(vars, "TOOL_LOGIN_URL")?,
            tool_launch_url: required(vars, "TOOL_LAUNCH_URL")?,
            tool_redirect_url: required_url(vars, "TOOL_REDIRECT_URL")?,
            tool_icon_url: optional(vars, "TOOL_ICON_URL"),
            tool_proxy_guid: optional(vars, "TOOL_PROXY_GUID").unwrap_or_else(|| tool_code.clone()),
            tool_contact_email: optional(vars, "TOOL_CONTACT_EMAIL").unwrap_or_default(),
            tool_vendor_code: optional(vars, "TOOL_VENDOR_CODE")
                .unwrap_or_else(|| tool_code.clone()),
            tool_vendor_name: optional(vars, "TOOL_VENDOR_NAME")
                .unwrap_or_else(|| app_name.clone()),
            tool_vendor_description: optional(vars, "TOOL_VENDOR_DESCRIPTION").unwrap_or_default(),
            tool_vendor_url: optional(vars, "TOOL_VENDOR_URL").unwrap_or_default(),
            secret_key: SecretString::from(required(vars, "SECRET_KEY")?),
            key_id: optional(vars, "TOOL_KEY_ID").unwrap_or_else(|| DEFAULT_KEY_ID.to_string()),
            private_key_path: optional(vars, "TOOL_PRIVATE_KEY_PATH"),
            jwks_cache_ttl_seconds: parse_u64(
                vars,
                "LTI_JWKS_CACHE_TTL_SECONDS",
                DEFAULT_JWKS_CACHE_TTL_SECONDS,
            )?,
            jwks_timeout_seconds,
            jwt_clock_skew_seconds,
            nonce_ttl_seconds: parse_u64(vars, "LTI_NONCE_TTL_SECONDS", DEFAULT_NONCE_TTL_SECONDS)?,
            enforce_nonce: parse_bool(vars, "LTI_ENFORCE_NONCE", false)?,
            enforce_deployment: parse_bool(vars, "LTI_ENFORCE_DEPLOYMENT", false)?,
            app_name,
            tool_code,
        })
    }

    /// Public URL of this tool's JWKS document.
    pub fn public_jwk_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.tool_url)
    }
}

fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name).filter(|v| !v.trim().is_empty()).cloned()
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    optional(vars, name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn required_url(vars: &HashMap<String, String>, name: &str) -> Result<Url, ConfigError> {
    let raw = required(vars, name)?;
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn parse_u64(vars: &HashMap<String, String>, name: &str, default: u64) -> Result<u64, ConfigError> {
    match optional(vars, name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("'{}': {}", raw, e),
        }),
    }
}

fn parse_bool(vars: &HashMap<String, String>, name: &str, default: bool) -> Result<bool, ConfigError> {
    match optional(vars, name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("'{}' is not a boolean", v),
            }),
        },
    }
}
