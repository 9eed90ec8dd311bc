//! # LTI Test Utilities
//!
//! Shared test utilities for the LTI tool.
//!
//! This crate provides:
//! - Deterministic RSA fixtures (seeded keys for reproducible tests)
//! - Launch token builders (TestLaunchTokenBuilder)
//! - A mock platform serving JWKS (MockPlatform)
//! - Server test harness (TestToolServer for E2E tests)
//! - Fixed test identifiers
//! - Custom assertions (TokenAssertions, RedirectAssertions)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lti_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: SqlitePool) -> anyhow::Result<()> {
//!     let platform = MockPlatform::start().await;
//!     let server = TestToolServer::spawn(pool, &platform).await?;
//!
//!     let id_token = TestLaunchTokenBuilder::new()
//!         .for_subject("student-1")
//!         .sign(platform_key_manager());
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod mock_platform;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use mock_platform::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
