//! LTI 1.3 launch claims.
//!
//! The platform's identity token is returned to callers as a [`LaunchClaims`]
//! mapping; the claim names the tool relies on are constants here so every
//! lookup goes through one spelling.

use crate::errors::LtiError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const CLAIM_ISSUER: &str = "iss";
pub const CLAIM_SUBJECT: &str = "sub";
pub const CLAIM_AUDIENCE: &str = "aud";
pub const CLAIM_EXPIRES_AT: &str = "exp";
pub const CLAIM_ISSUED_AT: &str = "iat";
pub const CLAIM_NONCE: &str = "nonce";
pub const CLAIM_MESSAGE_TYPE: &str = "https://purl.imsglobal.org/spec/lti/claim/message_type";
pub const CLAIM_VERSION: &str = "https://purl.imsglobal.org/spec/lti/claim/version";
pub const CLAIM_DEPLOYMENT_ID: &str = "https://purl.imsglobal.org/spec/lti/claim/deployment_id";

/// Claims every resource launch must carry, in the order they are checked.
pub const REQUIRED_CLAIMS: [&str; 9] = [
    CLAIM_ISSUER,
    CLAIM_SUBJECT,
    CLAIM_AUDIENCE,
    CLAIM_EXPIRES_AT,
    CLAIM_ISSUED_AT,
    CLAIM_NONCE,
    CLAIM_MESSAGE_TYPE,
    CLAIM_VERSION,
    CLAIM_DEPLOYMENT_ID,
];

/// Verified claim set of a launch.
///
/// Holds every claim the platform sent, including ones the tool does not
/// interpret (context, roles, custom parameters).
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchClaims(Map<String, Value>);

impl LaunchClaims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get_str(CLAIM_SUBJECT)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get_str(CLAIM_ISSUER)
    }

    pub fn nonce(&self) -> Option<&str> {
        self.get_str(CLAIM_NONCE)
    }

    pub fn message_type(&self) -> Option<&str> {
        self.get_str(CLAIM_MESSAGE_TYPE)
    }

    pub fn version(&self) -> Option<&str> {
        self.get_str(CLAIM_VERSION)
    }

    pub fn deployment_id(&self) -> Option<&str> {
        self.get_str(CLAIM_DEPLOYMENT_ID)
    }

    /// `aud` as a list; a single-string audience yields one entry.
    pub fn audiences(&self) -> Vec<&str> {
        match self.0.get(CLAIM_AUDIENCE) {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for LaunchClaims {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

impl fmt::Debug for LaunchClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.0 {
            if name == CLAIM_SUBJECT {
                map.entry(name, &"[REDACTED]");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

/// Check that every claim in [`REQUIRED_CLAIMS`] is present.
///
/// # Errors
///
/// Returns `LtiError::MissingClaim` naming the first absent claim.
pub fn validate_required_claims(claims: &LaunchClaims) -> Result<(), LtiError> {
    match REQUIRED_CLAIMS.iter().find(|name| !claims.contains(name)) {
        Some(missing) => Err(LtiError::MissingClaim(*missing)),
        None => Ok(()),
    }
}
