//! JWT utilities shared by the LTI tool crates.
//!
//! This module provides the pre-verification checks applied to every inbound
//! identity token:
//! - Size limits for DoS prevention
//! - Clock skew constants for iat validation
//! - Header inspection (`alg`, `kid`) before key lookup
//! - iat validation logic
//! - base64url helpers for JWK `n`/`e` members
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Header inspection never verifies anything; the token MUST still be
//!   verified against a key from a trusted key set
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{inspect_header, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! let header = inspect_header(id_token)?;
//! // look up header.kid in the platform key set, verify the signature ...
//! validate_iat(iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// LTI launch tokens carry more claims than a plain access token (context,
/// resource link, roles, custom parameters) but still sit well under 4KB in
/// practice. Anything over 8KB is rejected before base64 decoding or any
/// cryptographic work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes).
///
/// Tokens with an `iat` (issued-at) timestamp more than this amount in the
/// future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Configuration above this value is refused at startup.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the pre-verification checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("token exceeds the maximum allowed size")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWS compact serialization).
    #[error("token is malformed")]
    MalformedToken,

    /// Token `iat` claim is too far in the future.
    #[error("token was issued in the future")]
    IatTooFarInFuture,
}

// =============================================================================
// Header Inspection
// =============================================================================

/// The parts of a JOSE header needed to pick a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtHeaderInfo {
    /// Signing algorithm named by the token (not trusted until verified).
    pub alg: String,

    /// Key ID, if the issuer set one. Empty strings are treated as absent.
    pub kid: Option<String>,
}

/// Inspect the JOSE header of a compact JWT without verifying the signature.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - wrong number of segments, bad base64url, invalid
///   JSON or a header with no string `alg`
pub fn inspect_header(token: &str) -> Result<JwtHeaderInfo, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let alg = header
        .get("alg")
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MalformedToken)?;

    let kid = header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    Ok(JwtHeaderInfo { alg, kid })
}

// =============================================================================
// Temporal Checks
// =============================================================================

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is
/// more than `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// JWK Member Encoding
// =============================================================================

/// Encode a big-endian unsigned integer as a JWK member (base64url, no padding).
#[must_use]
pub fn encode_jwk_uint(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a JWK `n`/`e` member back into big-endian bytes.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the value is not unpadded base64url.
pub fn decode_jwk_uint(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(value)
}

// =============================================================================
// Tests
// =============================================================================
