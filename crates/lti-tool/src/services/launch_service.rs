//! Resource launch validation (LTI 1.3 section 5.1.2).
//!
//! # Checks, in order
//!
//! 1. `id_token` present in the posted form
//! 2. Size limit and JOSE header shape, `alg` must be RS256
//! 3. Platform key set fetched (or served from cache)
//! 4. RS256 signature, audience, `exp` with leeway
//! 5. `iat` no further in the future than the configured clock skew
//! 6. Required LTI claims present, first missing one reported
//!
//! The optional launch policy (nonce replay protection, deployment
//! cross-check) runs afterwards against the database.

use crate::auth::claims::{validate_required_claims, LaunchClaims, CLAIM_ISSUED_AT};
use crate::auth::jwks::JwksClient;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::errors::{LaunchFailure, LtiError};
use crate::repositories::{deployments, nonces};
use common::jwt::{inspect_header, validate_iat, JwtValidationError};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Validates platform identity tokens for this tool's client id.
pub struct LaunchValidator {
    jwks_client: Arc<JwksClient>,
    client_id: String,
    clock_skew: Duration,
}

impl LaunchValidator {
    /// # Arguments
    ///
    /// * `jwks_client` - Platform key set client
    /// * `client_id` - Expected `aud`
    /// * `clock_skew` - Tolerance for `iat` in the future and `exp` in the past
    pub fn new(jwks_client: Arc<JwksClient>, client_id: String, clock_skew: Duration) -> Self {
        Self {
            jwks_client,
            client_id,
            clock_skew,
        }
    }

    /// Build a validator (and its JWKS client) from configuration.
    pub fn from_config(config: &Config) -> Self {
        let jwks_client = JwksClient::new(
            config.lti_jwk_url.to_string(),
            Duration::from_secs(config.jwks_cache_ttl_seconds),
            Duration::from_secs(config.jwks_timeout_seconds),
        );
        Self::new(
            Arc::new(jwks_client),
            config.lti_client_id.clone(),
            Duration::from_secs(config.jwt_clock_skew_seconds),
        )
    }

    /// Validate the form posted to the launch endpoint and return its claims.
    ///
    /// # Errors
    ///
    /// - `MissingIdToken` if the form has no `id_token`
    /// - `InvalidLaunch` for any verification failure
    /// - `MissingClaim` for the first required claim the token lacks
    #[instrument(skip_all)]
    pub async fn validate_launch(
        &self,
        form: &HashMap<String, String>,
    ) -> Result<LaunchClaims, LtiError> {
        let token = form.get("id_token").ok_or(LtiError::MissingIdToken)?;

        let header = inspect_header(token).map_err(|e| LtiError::from(header_failure(e)))?;
        if header.alg != "RS256" {
            return Err(LaunchFailure::UnsupportedKey(format!("algorithm {}", header.alg)).into());
        }

        let keys = self.jwks_client.get_keys(header.kid.as_deref()).await?;
        let claims = verify_token(token, &keys, &self.client_id, self.clock_skew)?;

        if let Some(iat) = issued_at_seconds(&claims)? {
            validate_iat(iat, self.clock_skew).map_err(|e| LtiError::from(header_failure(e)))?;
        }

        validate_required_claims(&claims)?;

        tracing::debug!(target: "lti.launch", kid = ?header.kid, "Launch token validated");
        Ok(claims)
    }
}

/// `iat` as whole seconds, rounded up so a fractional future time is not
/// pulled back inside the skew. Absent is `None`; a non-number is rejected.
// Float to int `as` saturates at the i64 bounds
#[allow(clippy::cast_possible_truncation)]
fn issued_at_seconds(claims: &LaunchClaims) -> Result<Option<i64>, LaunchFailure> {
    let Some(iat) = claims.get(CLAIM_ISSUED_AT) else {
        return Ok(None);
    };
    if let Some(secs) = iat.as_i64() {
        return Ok(Some(secs));
    }
    match iat.as_f64() {
        Some(secs) if secs.is_finite() => Ok(Some(secs.ceil() as i64)),
        _ => Err(LaunchFailure::Verification("iat is not a number".to_string())),
    }
}

fn header_failure(err: JwtValidationError) -> LaunchFailure {
    match err {
        JwtValidationError::TokenTooLarge => LaunchFailure::TokenTooLarge,
        JwtValidationError::MalformedToken => LaunchFailure::MalformedToken,
        JwtValidationError::IatTooFarInFuture => LaunchFailure::IssuedInFuture,
    }
}

/// Apply the configured launch policy to validated claims.
///
/// The deployment check runs first so a rejected deployment does not burn
/// the nonce.
///
/// # Errors
///
/// - `InvalidLaunch(UnknownDeployment)` when deployment enforcement is on and
///   `(client id, deployment_id, iss)` is not registered
/// - `InvalidLaunch(NonceRejected)` when nonce enforcement is on and the
///   `(state, nonce)` pair is unknown, expired or already used
#[instrument(skip_all)]
pub async fn enforce_launch_policy(
    pool: &SqlitePool,
    config: &Config,
    form: &HashMap<String, String>,
    claims: &LaunchClaims,
) -> Result<(), LtiError> {
    if config.enforce_deployment {
        let (Some(deployment_id), Some(issuer)) = (claims.deployment_id(), claims.issuer()) else {
            return Err(LaunchFailure::UnknownDeployment.into());
        };
        let found =
            deployments::find_deployment(pool, &config.lti_client_id, deployment_id, issuer)
                .await?;
        if found.is_none() {
            tracing::warn!(target: "lti.launch", deployment_id = %deployment_id, "Launch from unregistered deployment");
            return Err(LaunchFailure::UnknownDeployment.into());
        }
    }

    if config.enforce_nonce {
        let (Some(state), Some(nonce)) = (form.get("state"), claims.nonce()) else {
            return Err(LaunchFailure::NonceRejected.into());
        };
        let max_age = Duration::from_secs(config.nonce_ttl_seconds);
        if !nonces::consume_nonce(pool, state, nonce, max_age).await? {
            return Err(LaunchFailure::NonceRejected.into());
        }
    }

    Ok(())
}
