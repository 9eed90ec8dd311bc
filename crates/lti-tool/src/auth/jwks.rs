//! JWKS client for fetching and caching the platform's public keys.
//!
//! The platform (Canvas, Moodle, ...) publishes its signing keys at the URL
//! configured as `LTI_JWK_URL`. Keys are cached with a configurable TTL; a
//! TTL of zero disables the cache and every launch fetches the key set.
//!
//! # Security
//!
//! - One GET per refresh, bounded by a request timeout, no retries
//! - A `kid` unknown to a fresh cache triggers a single refresh so platform
//!   key rotation is picked up without waiting for the TTL

use crate::errors::{LaunchFailure, LtiError};
use crate::observability::metrics::record_jwks_fetch;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// JSON Web Key as published by the platform.
///
/// Only `kty` is required so that key sets mixing RSA keys with other key
/// types still parse; unusable keys are rejected at verification time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for LTI 1.3 platforms).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// RSA modulus (base64url, unpadded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url, unpadded).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm (should be "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

struct CachedJwks {
    keys: Vec<Jwk>,
    expires_at: Instant,
}

/// Thread-safe platform JWKS client.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: RwLock<Option<CachedJwks>>,
    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a new JWKS client.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - Platform JWKS endpoint
    /// * `cache_ttl` - How long to cache the key set (`Duration::ZERO` disables caching)
    /// * `timeout` - Request timeout for each fetch
    pub fn new(jwks_url: String, cache_ttl: Duration, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "lti.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            cache_ttl,
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Fetch the platform key set, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Network error, timeout, non-2xx status or a body that is not a JWKS
    /// document all yield `InvalidLaunch(KeySetUnavailable)`.
    #[instrument(skip_all)]
    pub async fn fetch_key_set(&self) -> Result<JwksResponse, LtiError> {
        tracing::debug!(target: "lti.jwks", url = %self.jwks_url, "Fetching platform JWKS");

        let result = self.fetch_inner().await;
        record_jwks_fetch(if result.is_ok() { "success" } else { "error" });
        result.map_err(|reason| LaunchFailure::KeySetUnavailable(reason).into())
    }

    async fn fetch_inner(&self) -> Result<JwksResponse, String> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "lti.jwks", error = %e, "Failed to fetch JWKS");
                if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    "request failed".to_string()
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(target: "lti.jwks", status = %status, "JWKS endpoint returned error");
            return Err(format!("endpoint returned {}", status.as_u16()));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "lti.jwks", error = %e, "Failed to parse JWKS response");
            "response is not a key set".to_string()
        })?;

        tracing::debug!(target: "lti.jwks", key_count = jwks.keys.len(), "JWKS fetched");
        Ok(jwks)
    }

    /// Candidate verification keys for a token.
    ///
    /// With a `kid`, returns the key carrying that id. Without one, returns
    /// every RSA key in the set. A `kid` the set does not name falls back to
    /// the RSA keys published without a `kid`, once the set has been
    /// refreshed (or straight from the cache when the set names no keys).
    ///
    /// # Errors
    ///
    /// - `InvalidLaunch(KeySetUnavailable)` if the key set cannot be fetched
    /// - `InvalidLaunch(KeyNotFound)` if no key matches, even after a refresh
    #[instrument(skip(self))]
    pub async fn get_keys(&self, kid: Option<&str>) -> Result<Vec<Jwk>, LtiError> {
        if self.cache_ttl.is_zero() {
            let jwks = self.fetch_key_set().await?;
            return non_empty(select_keys_or_unnamed(&jwks.keys, kid), kid);
        }

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    let keys = if cached.keys.iter().all(|key| key.kid.is_none()) {
                        select_keys_or_unnamed(&cached.keys, kid)
                    } else {
                        select_keys(&cached.keys, kid)
                    };
                    if !keys.is_empty() {
                        tracing::debug!(target: "lti.jwks", "JWKS cache hit");
                        record_jwks_fetch("cache_hit");
                        return Ok(keys);
                    }
                    // Possibly a rotated key: fall through to a refresh
                    tracing::debug!(target: "lti.jwks", "Key not found in JWKS cache");
                }
            }
        }

        let keys = self.refresh_cache().await?;
        non_empty(select_keys_or_unnamed(&keys, kid), kid)
    }

    async fn refresh_cache(&self) -> Result<Vec<Jwk>, LtiError> {
        let jwks = self.fetch_key_set().await?;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys: jwks.keys.clone(),
            expires_at: Instant::now() + self.cache_ttl,
        });

        tracing::info!(target: "lti.jwks", key_count = jwks.keys.len(), "JWKS cache refreshed");
        Ok(jwks.keys)
    }
}

fn select_keys(keys: &[Jwk], kid: Option<&str>) -> Vec<Jwk> {
    keys.iter()
        .filter(|key| match kid {
            Some(kid) => key.kid.as_deref() == Some(kid),
            None => key.kty == "RSA",
        })
        .cloned()
        .collect()
}

fn select_keys_or_unnamed(keys: &[Jwk], kid: Option<&str>) -> Vec<Jwk> {
    let selected = select_keys(keys, kid);
    if !selected.is_empty() || kid.is_none() {
        return selected;
    }
    tracing::debug!(target: "lti.jwks", kid = ?kid, "kid not in key set, trying unnamed keys");
    keys.iter()
        .filter(|key| key.kty == "RSA" && key.kid.is_none())
        .cloned()
        .collect()
}

fn non_empty(keys: Vec<Jwk>, kid: Option<&str>) -> Result<Vec<Jwk>, LtiError> {
    if keys.is_empty() {
        tracing::warn!(target: "lti.jwks", kid = ?kid, "No matching key in platform JWKS");
        return Err(LaunchFailure::KeyNotFound.into());
    }
    Ok(keys)
}
