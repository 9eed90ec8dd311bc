//! Mock LTI platform
//!
//! A wiremock server standing in for the platform's JWKS and authorization
//! endpoints. Each `start_*` constructor mounts one JWKS behaviour.

use crate::crypto_fixtures::platform_key_manager;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const MOCK_JWKS_PATH: &str = "/api/lti/security/jwks";
pub const MOCK_AUTH_PATH: &str = "/api/lti/authorize_redirect";

pub struct MockPlatform {
    server: MockServer,
}

impl MockPlatform {
    /// Platform publishing the fixture platform key.
    pub async fn start() -> Self {
        let jwk = serde_json::to_value(platform_key_manager().public_jwk())
            .expect("Failed to serialize platform JWK");
        Self::start_with_keys(vec![jwk]).await
    }

    /// Platform publishing exactly `keys`.
    pub async fn start_with_keys(keys: Vec<Value>) -> Self {
        Self::start_with_response(
            ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })),
        )
        .await
    }

    /// Platform whose JWKS endpoint answers with `status`.
    pub async fn start_failing(status: u16) -> Self {
        Self::start_with_response(ResponseTemplate::new(status)).await
    }

    /// Platform whose JWKS endpoint returns a body that is not a key set.
    pub async fn start_with_garbage() -> Self {
        Self::start_with_response(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>maintenance</html>"),
        )
        .await
    }

    async fn start_with_response(response: ResponseTemplate) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(MOCK_JWKS_PATH))
            .respond_with(response)
            .mount(&server)
            .await;
        Self { server }
    }

    /// Publish `keys` from now on, as a platform does after a key rotation.
    ///
    /// Mounted above the initial response; call at most once per platform.
    /// Fetches already served stay in `jwks_request_count`.
    pub async fn rotate_keys(&self, keys: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(MOCK_JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), MOCK_JWKS_PATH)
    }

    pub fn auth_url(&self) -> String {
        format!("{}{}", self.server.uri(), MOCK_AUTH_PATH)
    }

    /// Number of JWKS fetches the platform has served.
    pub async fn jwks_request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == MOCK_JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }
}

/// The fixture platform JWK with `kid` removed.
pub fn platform_jwk_without_kid() -> Value {
    let mut jwk = serde_json::to_value(platform_key_manager().public_jwk())
        .expect("Failed to serialize platform JWK");
    if let Some(obj) = jwk.as_object_mut() {
        obj.remove("kid");
    }
    jwk
}
