//! Deterministic cryptographic fixtures for testing
//!
//! RSA keys are generated from a seeded RNG so the same seed always yields
//! the same keypair. Generation is slow even with an optimised `rsa`, so
//! the common keys are built once per test binary.

use crate::test_ids::{TEST_OTHER_KID, TEST_PLATFORM_KID};
use lti_tool::crypto::KeyManager;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use std::sync::OnceLock;
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Modulus size for fixture keys.
pub const TEST_KEY_BITS: usize = 2048;

/// Generate a deterministic RSA private key for testing.
///
/// # Example
/// ```rust,ignore
/// let a = test_rsa_key(1)?;
/// let b = test_rsa_key(1)?;
/// assert_eq!(a, b);
/// ```
pub fn test_rsa_key(seed: u64) -> Result<RsaPrivateKey, FixtureError> {
    let mut rng = StdRng::seed_from_u64(seed);
    RsaPrivateKey::new(&mut rng, TEST_KEY_BITS)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test key: {}", e)))
}

/// PKCS#8 PEM encoding of a fixture key, for exercising file-based loading.
pub fn test_rsa_key_pem(seed: u64) -> Result<String, FixtureError> {
    let key = test_rsa_key(seed)?;
    key.to_pkcs8_pem(LineEnding::LF)
        .map(|pem| pem.to_string())
        .map_err(|e| FixtureError::Crypto(format!("Failed to encode test key: {}", e)))
}

static PLATFORM_PRIVATE_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
static PLATFORM_KEY: OnceLock<KeyManager> = OnceLock::new();
static OTHER_KEY: OnceLock<KeyManager> = OnceLock::new();

/// The platform's raw private key, for tests that build tokens by hand.
pub fn platform_private_key() -> &'static RsaPrivateKey {
    PLATFORM_PRIVATE_KEY.get_or_init(|| test_rsa_key(1).expect("fixture key generation"))
}

/// The platform's signing key, published by [`crate::MockPlatform`].
pub fn platform_key_manager() -> &'static KeyManager {
    PLATFORM_KEY.get_or_init(|| {
        KeyManager::from_private_key(TEST_PLATFORM_KID, platform_private_key().clone())
            .expect("fixture key manager")
    })
}

/// A key the platform never publishes. Tokens signed with it must be rejected.
pub fn other_key_manager() -> &'static KeyManager {
    OTHER_KEY.get_or_init(|| {
        let key = test_rsa_key(2).expect("fixture key generation");
        KeyManager::from_private_key(TEST_OTHER_KID, key).expect("fixture key manager")
    })
}
