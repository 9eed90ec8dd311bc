//! LTI 1.3 tool provider.
//!
//! Implements the tool side of the IMS LTI 1.3 / OIDC third-party login flow:
//! login initiation, signed launch validation against the platform's JWKS,
//! deployment registration, and publication of the tool's own public key.
//!
//! The binary in `main.rs` wires these modules into an Axum server; the
//! library form exists so integration tests can drive the same router.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
