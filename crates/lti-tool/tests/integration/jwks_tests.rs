//! The tool's published key set.

use common::jwt::decode_jwk_uint;
use lti_test_utils::{MockPlatform, TestToolServer, TokenAssertions, TEST_TOOL_KID};
use lti_tool::auth::jwks::JwksClient;
use lti_tool::auth::jwt::verify_token;
use lti_tool::models::Jwks;
use reqwest::header::CACHE_CONTROL;
use reqwest::StatusCode;
use rsa::traits::PublicKeyParts;
use serde_json::json;
use sqlx::SqlitePool;
use std::time::Duration;

#[sqlx::test(migrations = "../../migrations")]
async fn test_jwks_endpoint_publishes_tool_key(pool: SqlitePool) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    let response = server
        .client()
        .get(format!("{}/.well-known/jwks.json", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CACHE_CONTROL).unwrap(),
        "max-age=3600"
    );

    let jwks: Jwks = response.json().await?;
    assert_eq!(jwks.keys.len(), 1);
    let jwk = &jwks.keys[0];
    assert_eq!(jwk.kid, TEST_TOOL_KID);
    assert_eq!(jwk.kty, "RSA");
    assert_eq!(jwk.alg, "RS256");
    assert_eq!(jwk.use_, "sig");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_published_components_reassemble_signing_key(
    pool: SqlitePool,
) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    let jwks: Jwks = server
        .client()
        .get(format!("{}/.well-known/jwks.json", server.url()))
        .send()
        .await?
        .json()
        .await?;
    let jwk = &jwks.keys[0];

    let public_key = server.key_manager().public_key();
    assert_eq!(decode_jwk_uint(&jwk.n)?, public_key.n().to_bytes_be());
    assert_eq!(decode_jwk_uint(&jwk.e)?, public_key.e().to_bytes_be());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_token_signed_by_tool_verifies_against_published_set(
    pool: SqlitePool,
) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    let now = chrono::Utc::now().timestamp();
    let token = server.key_manager().sign(&json!({
        "iss": "tool",
        "sub": "service-account",
        "aud": "platform",
        "iat": now,
        "exp": now + 300,
    }))?;
    token.assert_valid_jwt().assert_signed_by(TEST_TOOL_KID);

    let client = JwksClient::new(
        format!("{}/.well-known/jwks.json", server.url()),
        Duration::from_secs(300),
        Duration::from_secs(2),
    );
    let keys = client.get_keys(Some(TEST_TOOL_KID)).await?;
    let claims = verify_token(&token, &keys, "platform", Duration::from_secs(60))?;
    assert_eq!(claims.subject(), Some("service-account"));

    Ok(())
}
