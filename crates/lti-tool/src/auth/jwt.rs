//! RS256 verification of platform identity tokens.
//!
//! # Security
//!
//! - Only RS256 is accepted, whatever the token header claims
//! - `aud` and `exp` are checked here rather than by `jsonwebtoken` so that
//!   an absent claim is reported by the required-claims check (by name)
//!   instead of as a verification failure
//! - Callers must run `common::jwt::inspect_header` first (size limit)

use crate::auth::claims::{LaunchClaims, CLAIM_AUDIENCE, CLAIM_EXPIRES_AT};
use crate::auth::jwks::Jwk;
use crate::errors::{LaunchFailure, LtiError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;

/// Verify `token` against the candidate keys and return its claims.
///
/// Each key is tried in order; the first one that verifies the signature
/// wins. Audience must contain `audience`; `exp` (when present) must not
/// have passed by more than `leeway`.
///
/// # Errors
///
/// Returns `LtiError::InvalidLaunch` carrying the cause of the last failure.
pub fn verify_token(
    token: &str,
    keys: &[Jwk],
    audience: &str,
    leeway: Duration,
) -> Result<LaunchClaims, LtiError> {
    let mut last_failure = LaunchFailure::KeyNotFound;

    for jwk in keys {
        match verify_with_key(token, jwk) {
            Ok(claims) => {
                let claims = LaunchClaims::new(claims);
                check_audience(&claims, audience)?;
                check_expiry(&claims, leeway, chrono::Utc::now().timestamp())?;
                return Ok(claims);
            }
            Err(failure) => {
                tracing::debug!(target: "lti.launch", kid = ?jwk.kid, reason = failure.as_label(), "Key did not verify token");
                last_failure = failure;
            }
        }
    }

    Err(last_failure.into())
}

fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, LaunchFailure> {
    if jwk.kty != "RSA" {
        tracing::warn!(target: "lti.launch", kty = %jwk.kty, "Unexpected JWK key type");
        return Err(LaunchFailure::UnsupportedKey(format!("key type {}", jwk.kty)));
    }
    if let Some(alg) = &jwk.alg {
        if alg != "RS256" {
            tracing::warn!(target: "lti.launch", alg = %alg, "Unexpected JWK algorithm");
            return Err(LaunchFailure::UnsupportedKey(format!("algorithm {}", alg)));
        }
    }

    let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
        tracing::warn!(target: "lti.launch", kid = ?jwk.kid, "JWK missing n or e member");
        return Err(LaunchFailure::UnsupportedKey(
            "RSA key without modulus or exponent".to_string(),
        ));
    };

    DecodingKey::from_rsa_components(n, e).map_err(|e| {
        tracing::warn!(target: "lti.launch", error = %e, "Invalid RSA key components");
        LaunchFailure::UnsupportedKey("invalid RSA key components".to_string())
    })
}

fn verify_with_key(token: &str, jwk: &Jwk) -> Result<Map<String, Value>, LaunchFailure> {
    let key = decoding_key(jwk)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = false;
    validation.validate_aud = false;

    decode::<Map<String, Value>>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => LaunchFailure::InvalidSignature,
            ErrorKind::InvalidAlgorithm => {
                LaunchFailure::UnsupportedKey("token algorithm is not RS256".to_string())
            }
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => LaunchFailure::MalformedToken,
            _ => LaunchFailure::Verification(e.to_string()),
        })
}

fn check_audience(claims: &LaunchClaims, audience: &str) -> Result<(), LaunchFailure> {
    if !claims.contains(CLAIM_AUDIENCE) {
        return Ok(());
    }
    if claims.audiences().contains(&audience) {
        Ok(())
    } else {
        Err(LaunchFailure::InvalidAudience)
    }
}

fn check_expiry(claims: &LaunchClaims, leeway: Duration, now: i64) -> Result<(), LaunchFailure> {
    let Some(exp) = claims.get(CLAIM_EXPIRES_AT) else {
        return Ok(());
    };
    let Some(exp) = exp.as_i64() else {
        return Err(LaunchFailure::Verification("exp is not a number".to_string()));
    };

    let leeway = i64::try_from(leeway.as_secs()).unwrap_or(i64::MAX);
    if exp.saturating_add(leeway) < now {
        return Err(LaunchFailure::Expired);
    }
    Ok(())
}
