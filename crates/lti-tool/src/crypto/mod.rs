//! Tool key material and random token generation.
//!
//! [`KeyManager`] owns the tool's RS256 signing keypair for the lifetime of
//! the process. It is built once at startup and only read afterwards, so it
//! is shared behind an `Arc` without locking.

use crate::errors::LtiError;
use crate::models::{JsonWebKey, Jwks};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::jwt::encode_jwk_uint;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::rand::{SecureRandom, SystemRandom};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use std::fmt;
use tracing::instrument;

/// RSA modulus size for generated keys.
pub const RSA_KEY_BITS: usize = 2048;

/// Number of random bytes behind each `state` / `nonce` value.
pub const RANDOM_TOKEN_BYTES: usize = 32;

/// Owner of the tool's signing keypair.
pub struct KeyManager {
    kid: String,
    private_key: RsaPrivateKey,
    encoding_key: EncodingKey,
    public_jwk: JsonWebKey,
}

impl KeyManager {
    /// Generate a fresh RSA-2048 keypair published under `kid`.
    ///
    /// Key generation is CPU bound (hundreds of milliseconds); async callers
    /// should run it on a blocking thread.
    #[instrument(skip_all, fields(kid = %kid))]
    pub fn generate(kid: &str) -> Result<Self, LtiError> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
            .map_err(|e| LtiError::Crypto(format!("Keypair generation failed: {}", e)))?;

        Self::from_private_key(kid, private_key)
    }

    /// Load a PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1 (`BEGIN RSA PRIVATE KEY`)
    /// PEM document.
    #[instrument(skip_all, fields(kid = %kid))]
    pub fn from_pem(kid: &str, pem: &str) -> Result<Self, LtiError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| LtiError::Crypto(format!("Invalid RSA private key PEM: {}", e)))?;

        Self::from_private_key(kid, private_key)
    }

    /// Wrap an existing private key.
    pub fn from_private_key(kid: &str, private_key: RsaPrivateKey) -> Result<Self, LtiError> {
        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| LtiError::Crypto(format!("Private key encoding failed: {}", e)))?;
        let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

        let public_jwk = JsonWebKey {
            kty: "RSA".to_string(),
            alg: "RS256".to_string(),
            use_: "sig".to_string(),
            kid: kid.to_string(),
            n: encode_jwk_uint(&private_key.n().to_bytes_be()),
            e: encode_jwk_uint(&private_key.e().to_bytes_be()),
        };

        Ok(Self {
            kid: kid.to_string(),
            private_key,
            encoding_key,
            public_jwk,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The public half as a JWK.
    pub fn public_jwk(&self) -> JsonWebKey {
        self.public_jwk.clone()
    }

    /// Single-key JWKS document for `/.well-known/jwks.json`.
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: vec![self.public_jwk()],
        }
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    /// Sign `claims` as an RS256 JWT carrying this key's `kid`.
    #[instrument(skip_all)]
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, LtiError> {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| LtiError::Crypto(format!("JWT signing operation failed: {}", e)))
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("kid", &self.kid)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Generate an unguessable URL-safe token (`state`, `nonce`).
pub fn generate_url_safe_token() -> Result<String, LtiError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; RANDOM_TOKEN_BYTES];
    rng.fill(&mut bytes)
        .map_err(|e| LtiError::Crypto(format!("Random bytes generation failed: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
