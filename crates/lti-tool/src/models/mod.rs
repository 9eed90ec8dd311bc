use chrono::{DateTime, Utc};
use common::secret::SecretString;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Platform deployment model (maps to lti_deployments table)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Deployment {
    pub id: i64,
    pub client_id: String,
    pub deployment_id: String,
    pub platform_issuer: String,
    pub created_at: DateTime<Utc>,
}

/// Issued login nonce (maps to lti_nonces table)
#[derive(Debug, Clone, FromRow)]
pub struct LaunchNonce {
    pub nonce: String,
    pub state: String,
    /// Unix epoch seconds.
    pub issued_at: i64,
}

/// Parameters of the OIDC authorization redirect, in the order they are
/// serialized into the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRedirectParams {
    pairs: Vec<(&'static str, String)>,
}

impl AuthRedirectParams {
    pub(crate) fn new(pairs: Vec<(&'static str, String)>) -> Self {
        Self { pairs }
    }

    /// All parameters in insertion order.
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn state(&self) -> &str {
        self.get("state").unwrap_or_default()
    }

    pub fn nonce(&self) -> &str {
        self.get("nonce").unwrap_or_default()
    }
}

/// JWKS response (RFC 7517)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<JsonWebKey>,
}

/// RSA public JSON Web Key (RFC 7517 / RFC 7518 section 6.3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String, // Key Type ("RSA")
    pub alg: String, // Algorithm ("RS256")
    #[serde(rename = "use")]
    pub use_: String, // Public key use ("sig")
    pub kid: String, // Key ID
    pub n: String,   // Modulus (base64url, unpadded)
    pub e: String,   // Exponent (base64url, unpadded)
}

/// LTI 2.0 registration form posted by the platform.
///
/// Fields are optional so a missing one surfaces as `InvalidRegistration`
/// naming it rather than as a generic form rejection.
#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub reg_key: Option<String>,
    pub reg_password: Option<SecretString>,
    pub tc_profile_url: Option<String>,
}

/// Tool configuration descriptor served at `/lti/config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfiguration {
    pub title: String,
    pub description: String,
    pub scopes: Vec<String>,
    pub public_jwk_url: String,
    pub target_link_uri: String,
    pub oidc_initiation_url: String,
    pub extensions: Vec<PlatformExtension>,
}

/// Platform-specific settings block (Canvas `extensions` entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformExtension {
    pub platform: String,
    pub privacy_level: String,
    pub settings: PlacementSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementSettings {
    pub text: String,
    pub placements: Vec<Placement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub placement: String,
    pub message_type: String,
    pub target_link_uri: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}
