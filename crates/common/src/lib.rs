//! Utilities shared across the LTI tool crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT pre-verification helpers and JWK member encoding
pub mod jwt;
