//! Custom test assertions for expressive tests

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use url::Url;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    pub typ: Option<String>,
    #[serde(default)]
    pub kid: Option<String>,
}

/// Custom assertions for signed tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_signed_by("lti-tool-signing-key");
/// ```
pub trait TokenAssertions {
    /// Assert the token is a three-part RS256 JWT
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert the header names `key_id`
    fn assert_signed_by(&self, key_id: &str) -> &Self;
}

fn decode_header(token: &str) -> JwtHeader {
    let header_b64 = token.split('.').next().expect("JWT has no header segment");
    let bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .expect("Failed to base64 decode JWT header");
    serde_json::from_slice(&bytes).expect("Failed to parse JWT header JSON")
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts
        );

        let header = decode_header(self);
        assert_eq!(header.alg, "RS256", "Expected RS256 algorithm");
        assert_eq!(header.typ.as_deref(), Some("JWT"), "Expected JWT type");
        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = decode_header(self);
        assert_eq!(
            header.kid.as_deref(),
            Some(key_id),
            "Token not signed by expected key"
        );
        self
    }
}

/// Assertions on redirect targets
pub trait RedirectAssertions {
    /// Assert the URL has exactly one `name` query parameter equal to `value`
    fn assert_query_param(&self, name: &str, value: &str) -> &Self;

    /// Assert the URL has a non-empty `name` query parameter and return it
    fn query_param(&self, name: &str) -> String;
}

impl RedirectAssertions for Url {
    fn assert_query_param(&self, name: &str, value: &str) -> &Self {
        let values: Vec<String> = self
            .query_pairs()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(values, vec![value.to_string()], "query parameter {}", name);
        self
    }

    fn query_param(&self, name: &str) -> String {
        let value = self
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| panic!("missing query parameter {}", name));
        assert!(!value.is_empty(), "query parameter {} is empty", name);
        value
    }
}
