//! Observability for the LTI tool.
//!
//! # Privacy by Default
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit safe field
//! allow-listing. Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (outcomes, failure reasons, key ids)
//! - **HASHED**: Logged only as a keyed correlation hash (`sub`, `client_id`)
//! - **NEVER**: Must never appear in logs (id tokens, `reg_password`, keys)

pub mod metrics;

use common::secret::{ExposeSecret, SecretString};
use ring::hmac;

/// Keyed correlation hash for identifiers that must not be logged in the clear.
///
/// HMAC-SHA256 keyed with `SECRET_KEY`, truncated to 8 hex chars and prefixed
/// with `h:`. Stable within one deployment, so log lines about the same user
/// can be joined without revealing the identifier.
pub fn hash_for_correlation(secret: &SecretString, value: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.expose_secret().as_bytes());
    let tag = hmac::sign(&key, value.as_bytes());
    let prefix = tag.as_ref().get(..4).unwrap_or_default();
    format!("h:{}", hex::encode(prefix))
}
