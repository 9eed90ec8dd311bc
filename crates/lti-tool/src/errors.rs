//! LTI tool error types.
//!
//! Validation failures map to 400 (incomplete request) or 401 (launch could
//! not be trusted). Every `InvalidLaunch` carries a [`LaunchFailure`] naming
//! the internal cause; callers see one 401 category with a short reason,
//! while the cause is logged and recorded as a metrics label.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Why a launch was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchFailure {
    /// Platform key set could not be fetched or parsed.
    #[error("platform key set unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("token exceeds the maximum allowed size")]
    TokenTooLarge,

    #[error("token is malformed")]
    MalformedToken,

    /// No key in the platform key set matches the token.
    #[error("no matching key in the platform key set")]
    KeyNotFound,

    /// The selected key or the token header names something other than RS256/RSA.
    #[error("unsupported key or algorithm: {0}")]
    UnsupportedKey(String),

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token audience does not match this tool")]
    InvalidAudience,

    #[error("token has expired")]
    Expired,

    #[error("token was issued in the future")]
    IssuedInFuture,

    /// Nonce unknown, already used, expired or paired with another state.
    #[error("nonce was not issued by this tool or has already been used")]
    NonceRejected,

    /// Issuer/deployment pairing is not registered.
    #[error("deployment is not registered with this tool")]
    UnknownDeployment,

    /// Any other verification error reported by the JWT library.
    #[error("token verification failed: {0}")]
    Verification(String),
}

impl LaunchFailure {
    /// Bounded label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchFailure::KeySetUnavailable(_) => "key_set_unavailable",
            LaunchFailure::TokenTooLarge => "token_too_large",
            LaunchFailure::MalformedToken => "malformed_token",
            LaunchFailure::KeyNotFound => "key_not_found",
            LaunchFailure::UnsupportedKey(_) => "unsupported_key",
            LaunchFailure::InvalidSignature => "invalid_signature",
            LaunchFailure::InvalidAudience => "invalid_audience",
            LaunchFailure::Expired => "expired",
            LaunchFailure::IssuedInFuture => "issued_in_future",
            LaunchFailure::NonceRejected => "nonce_rejected",
            LaunchFailure::UnknownDeployment => "unknown_deployment",
            LaunchFailure::Verification(_) => "verification",
        }
    }
}

#[derive(Debug, Error)]
pub enum LtiError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Missing id_token")]
    MissingIdToken,

    #[error("Missing required claim: {0}")]
    MissingClaim(&'static str),

    #[error("Invalid launch request: {0}")]
    InvalidLaunch(LaunchFailure),

    #[error("Invalid registration request: {0}")]
    InvalidRegistration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Internal server error")]
    Internal,
}

impl LtiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            LtiError::MissingParameter(_)
            | LtiError::MissingIdToken
            | LtiError::MissingClaim(_)
            | LtiError::InvalidRegistration(_) => StatusCode::BAD_REQUEST,
            LtiError::InvalidLaunch(_) => StatusCode::UNAUTHORIZED,
            LtiError::Database(_) | LtiError::Crypto(_) | LtiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Bounded label for metrics; launch failures report their cause.
    pub fn metric_label(&self) -> &'static str {
        match self {
            LtiError::MissingParameter(_) => "missing_parameter",
            LtiError::MissingIdToken => "missing_id_token",
            LtiError::MissingClaim(_) => "missing_claim",
            LtiError::InvalidLaunch(cause) => cause.as_label(),
            LtiError::InvalidRegistration(_) => "invalid_registration",
            LtiError::Database(_) => "database",
            LtiError::Crypto(_) => "crypto",
            LtiError::Internal => "internal",
        }
    }

    /// The launch failure cause, if this is an `InvalidLaunch`.
    pub fn launch_failure(&self) -> Option<&LaunchFailure> {
        match self {
            LtiError::InvalidLaunch(cause) => Some(cause),
            _ => None,
        }
    }
}

impl From<LaunchFailure> for LtiError {
    fn from(cause: LaunchFailure) -> Self {
        LtiError::InvalidLaunch(cause)
    }
}

impl From<sqlx::Error> for LtiError {
    fn from(err: sqlx::Error) -> Self {
        LtiError::Database(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for LtiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            LtiError::MissingParameter(_) => ("MISSING_PARAMETER", self.to_string()),
            LtiError::MissingIdToken => ("MISSING_ID_TOKEN", self.to_string()),
            LtiError::MissingClaim(_) => ("MISSING_CLAIM", self.to_string()),
            LtiError::InvalidLaunch(cause) => {
                tracing::warn!(target: "lti.launch", reason = cause.as_label(), error = %cause, "Launch rejected");
                ("INVALID_LAUNCH", self.to_string())
            }
            LtiError::InvalidRegistration(_) => ("INVALID_REGISTRATION", self.to_string()),
            LtiError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "lti.db", error = %err, "Database operation failed");
                (
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            LtiError::Crypto(err) => {
                tracing::error!(target: "lti.crypto", error = %err, "Cryptographic operation failed");
                (
                    "CRYPTO_ERROR",
                    "An internal cryptographic error occurred".to_string(),
                )
            }
            LtiError::Internal => ("INTERNAL_ERROR", "An internal error occurred".to_string()),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
