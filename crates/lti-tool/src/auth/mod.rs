//! Platform identity token handling.
//!
//! - [`jwks`]: platform key set retrieval and caching
//! - [`jwt`]: RS256 signature, audience and expiry checks
//! - [`claims`]: LTI claim names and required-claim validation

pub mod claims;
pub mod jwks;
pub mod jwt;
