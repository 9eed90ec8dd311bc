//! Builder patterns for test launch tokens
//!
//! Defaults describe a valid resource link launch from the test platform to
//! the test tool; each setter breaks or varies one claim.

use crate::crypto_fixtures::platform_private_key;
use crate::test_ids::{TEST_CLIENT_ID, TEST_DEPLOYMENT_ID, TEST_ISSUER, TEST_SUBJECT_STUDENT};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use lti_tool::auth::claims::{
    CLAIM_AUDIENCE, CLAIM_DEPLOYMENT_ID, CLAIM_EXPIRES_AT, CLAIM_ISSUED_AT, CLAIM_ISSUER,
    CLAIM_MESSAGE_TYPE, CLAIM_NONCE, CLAIM_SUBJECT, CLAIM_VERSION,
};
use lti_tool::crypto::KeyManager;
use rsa::pkcs1::EncodeRsaPrivateKey;
use serde_json::{json, Map, Value};

pub const CLAIM_ROLES: &str = "https://purl.imsglobal.org/spec/lti/claim/roles";
pub const CLAIM_CONTEXT: &str = "https://purl.imsglobal.org/spec/lti/claim/context";
pub const CLAIM_RESOURCE_LINK: &str = "https://purl.imsglobal.org/spec/lti/claim/resource_link";

/// Builder for LTI launch identity tokens
///
/// # Example
/// ```rust,ignore
/// let id_token = TestLaunchTokenBuilder::new()
///     .for_subject("student-1")
///     .with_nonce("abc")
///     .sign(platform_key_manager());
/// ```
#[derive(Debug, Clone)]
pub struct TestLaunchTokenBuilder {
    claims: Map<String, Value>,
}

impl TestLaunchTokenBuilder {
    /// Create a builder for a valid launch
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert(CLAIM_ISSUER.into(), json!(TEST_ISSUER));
        claims.insert(CLAIM_SUBJECT.into(), json!(TEST_SUBJECT_STUDENT));
        claims.insert(CLAIM_AUDIENCE.into(), json!(TEST_CLIENT_ID));
        claims.insert(
            CLAIM_EXPIRES_AT.into(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        claims.insert(CLAIM_ISSUED_AT.into(), json!(now.timestamp()));
        claims.insert(CLAIM_NONCE.into(), json!("test-nonce"));
        claims.insert(CLAIM_MESSAGE_TYPE.into(), json!("LtiResourceLinkRequest"));
        claims.insert(CLAIM_VERSION.into(), json!("1.3.0"));
        claims.insert(CLAIM_DEPLOYMENT_ID.into(), json!(TEST_DEPLOYMENT_ID));
        claims.insert(
            CLAIM_ROLES.into(),
            json!(["http://purl.imsglobal.org/vocab/lis/v2/membership#Learner"]),
        );
        claims.insert(
            CLAIM_CONTEXT.into(),
            json!({"id": "course-42", "title": "Intro to Testing"}),
        );
        claims.insert(CLAIM_RESOURCE_LINK.into(), json!({"id": "link-7"}));
        Self { claims }
    }

    /// Set the subject (platform user id)
    pub fn for_subject(self, subject: &str) -> Self {
        self.with_claim(CLAIM_SUBJECT, json!(subject))
    }

    /// Set `aud` to a single client id
    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim(CLAIM_AUDIENCE, json!(audience))
    }

    /// Set `aud` to an array of client ids
    pub fn with_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim(CLAIM_AUDIENCE, json!(audiences))
    }

    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim(CLAIM_ISSUER, json!(issuer))
    }

    pub fn with_nonce(self, nonce: &str) -> Self {
        self.with_claim(CLAIM_NONCE, json!(nonce))
    }

    pub fn with_deployment_id(self, deployment_id: &str) -> Self {
        self.with_claim(CLAIM_DEPLOYMENT_ID, json!(deployment_id))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim(CLAIM_EXPIRES_AT, json!(exp))
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim(CLAIM_ISSUED_AT, json!(timestamp))
    }

    /// Set or replace any claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim entirely
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Sign as RS256 with `key`, carrying its `kid`
    pub fn sign(self, key: &KeyManager) -> String {
        key.sign(&self.claims).expect("Failed to sign test token")
    }

    /// Sign with the platform key but omit `kid` from the header
    pub fn sign_without_kid(self) -> String {
        let der = platform_private_key()
            .to_pkcs1_der()
            .expect("Failed to encode platform key");
        let key = EncodingKey::from_rsa_der(der.as_bytes());
        encode(&Header::new(Algorithm::RS256), &self.claims, &key)
            .expect("Failed to sign test token")
    }

    /// Sign with a shared secret (HS256); the tool must refuse the algorithm
    pub fn sign_hs256(self, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &self.claims,
            &EncodingKey::from_secret(secret),
        )
        .expect("Failed to sign test token")
    }
}

impl Default for TestLaunchTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
