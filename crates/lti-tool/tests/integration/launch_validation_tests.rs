//! Launch token validation against a mock platform key set.
//!
//! Drives `LaunchValidator` directly so each failure cause can be asserted.

use lti_test_utils::{
    other_key_manager, platform_jwk_without_kid, platform_key_manager, MockPlatform,
    TestLaunchTokenBuilder, TEST_CLIENT_ID, TEST_SUBJECT_INSTRUCTOR, TEST_SUBJECT_STUDENT,
};
use lti_tool::auth::claims::{CLAIM_DEPLOYMENT_ID, CLAIM_ISSUED_AT, CLAIM_NONCE, CLAIM_SUBJECT};
use lti_tool::auth::jwks::JwksClient;
use lti_tool::errors::{LaunchFailure, LtiError};
use lti_tool::services::launch_service::LaunchValidator;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn validator_for(jwks_url: String) -> LaunchValidator {
    let client = JwksClient::new(jwks_url, Duration::from_secs(300), Duration::from_secs(2));
    LaunchValidator::new(
        Arc::new(client),
        TEST_CLIENT_ID.to_string(),
        Duration::from_secs(300),
    )
}

fn launch_form(id_token: String) -> HashMap<String, String> {
    HashMap::from([
        ("id_token".to_string(), id_token),
        ("state".to_string(), "test-state".to_string()),
    ])
}

fn assert_launch_failure(result: Result<impl std::fmt::Debug, LtiError>, expected: &str) {
    let err = result.expect_err("launch should be rejected");
    let cause = err
        .launch_failure()
        .unwrap_or_else(|| panic!("expected InvalidLaunch, got {:?}", err));
    assert_eq!(cause.as_label(), expected, "unexpected cause {:?}", cause);
}

// ============================================================================
// Accepted launches
// ============================================================================

#[tokio::test]
async fn test_valid_launch_returns_claims_with_subject() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new().sign(platform_key_manager());
    let claims = validator.validate_launch(&launch_form(token)).await.unwrap();

    assert_eq!(claims.subject(), Some(TEST_SUBJECT_STUDENT));
    assert_eq!(claims.message_type(), Some("LtiResourceLinkRequest"));
    // Claims the tool does not interpret are still returned
    assert!(claims.contains("https://purl.imsglobal.org/spec/lti/claim/context"));
}

#[tokio::test]
async fn test_audience_array_containing_client_id_is_accepted() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new()
        .with_audiences(&["some-other-tool", TEST_CLIENT_ID])
        .sign(platform_key_manager());

    assert!(validator.validate_launch(&launch_form(token)).await.is_ok());
}

#[tokio::test]
async fn test_token_without_kid_matches_any_rsa_key() {
    let platform = MockPlatform::start_with_keys(vec![platform_jwk_without_kid()]).await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new().sign_without_kid();

    assert!(validator.validate_launch(&launch_form(token)).await.is_ok());
}

#[tokio::test]
async fn test_expired_within_clock_skew_is_accepted() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new()
        .expires_in(-60)
        .sign(platform_key_manager());

    assert!(validator.validate_launch(&launch_form(token)).await.is_ok());
}

#[tokio::test]
async fn test_key_set_is_cached_between_launches() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    for subject in [TEST_SUBJECT_STUDENT, TEST_SUBJECT_INSTRUCTOR] {
        let token = TestLaunchTokenBuilder::new()
            .for_subject(subject)
            .sign(platform_key_manager());
        let claims = validator.validate_launch(&launch_form(token)).await.unwrap();
        assert_eq!(claims.subject(), Some(subject));
    }

    assert_eq!(platform.jwks_request_count().await, 1);
}

#[tokio::test]
async fn test_kid_bearing_token_verifies_against_unnamed_key() {
    let platform = MockPlatform::start_with_keys(vec![platform_jwk_without_kid()]).await;
    let validator = validator_for(platform.jwks_url());

    for _ in 0..2 {
        let token = TestLaunchTokenBuilder::new().sign(platform_key_manager());
        assert!(validator.validate_launch(&launch_form(token)).await.is_ok());
    }

    // A set naming no keys is served from the cache like any other
    assert_eq!(platform.jwks_request_count().await, 1);
}

#[tokio::test]
async fn test_rotated_kid_refreshes_cache_once() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new().sign(platform_key_manager());
    assert!(validator.validate_launch(&launch_form(token)).await.is_ok());
    assert_eq!(platform.jwks_request_count().await, 1);

    let rotated = vec![
        serde_json::to_value(platform_key_manager().public_jwk()).unwrap(),
        serde_json::to_value(other_key_manager().public_jwk()).unwrap(),
    ];
    platform.rotate_keys(rotated).await;

    // Cache is still valid but lacks the new kid
    let token = TestLaunchTokenBuilder::new().sign(other_key_manager());
    assert!(validator.validate_launch(&launch_form(token)).await.is_ok());
    assert_eq!(platform.jwks_request_count().await, 2);

    for key_manager in [other_key_manager(), platform_key_manager()] {
        let token = TestLaunchTokenBuilder::new().sign(key_manager);
        assert!(validator.validate_launch(&launch_form(token)).await.is_ok());
    }
    assert_eq!(platform.jwks_request_count().await, 2);
}

#[tokio::test]
async fn test_zero_cache_ttl_fetches_every_launch() {
    let platform = MockPlatform::start().await;
    let client = JwksClient::new(platform.jwks_url(), Duration::ZERO, Duration::from_secs(2));
    let validator = LaunchValidator::new(
        Arc::new(client),
        TEST_CLIENT_ID.to_string(),
        Duration::from_secs(300),
    );

    for _ in 0..2 {
        let token = TestLaunchTokenBuilder::new().sign(platform_key_manager());
        assert!(validator.validate_launch(&launch_form(token)).await.is_ok());
    }

    assert_eq!(platform.jwks_request_count().await, 2);
}

// ============================================================================
// Rejected launches
// ============================================================================

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new()
        .with_audience("another-client")
        .sign(platform_key_manager());

    assert_launch_failure(
        validator.validate_launch(&launch_form(token)).await,
        "invalid_audience",
    );
}

#[tokio::test]
async fn test_missing_deployment_id_claim_is_named() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new()
        .without_claim(CLAIM_DEPLOYMENT_ID)
        .sign(platform_key_manager());

    let err = validator
        .validate_launch(&launch_form(token))
        .await
        .unwrap_err();
    match err {
        LtiError::MissingClaim(name) => assert_eq!(
            name,
            "https://purl.imsglobal.org/spec/lti/claim/deployment_id"
        ),
        other => panic!("expected MissingClaim, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_nonce_claim_is_named() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new()
        .without_claim(CLAIM_NONCE)
        .sign(platform_key_manager());

    let err = validator
        .validate_launch(&launch_form(token))
        .await
        .unwrap_err();
    assert!(matches!(err, LtiError::MissingClaim("nonce")), "{:?}", err);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new()
        .expires_in(-3600)
        .sign(platform_key_manager());

    assert_launch_failure(validator.validate_launch(&launch_form(token)).await, "expired");
}

#[tokio::test]
async fn test_token_issued_in_future_is_rejected() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new()
        .issued_at(chrono::Utc::now().timestamp() + 3600)
        .expires_in(7200)
        .sign(platform_key_manager());

    assert_launch_failure(
        validator.validate_launch(&launch_form(token)).await,
        "issued_in_future",
    );
}

#[tokio::test]
async fn test_fractional_iat_in_future_is_rejected() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let a_year_ahead = (chrono::Utc::now().timestamp() + 31_536_000) as f64 + 0.5;
    let token = TestLaunchTokenBuilder::new()
        .with_claim(CLAIM_ISSUED_AT, json!(a_year_ahead))
        .sign(platform_key_manager());

    assert_launch_failure(
        validator.validate_launch(&launch_form(token)).await,
        "issued_in_future",
    );
}

#[tokio::test]
async fn test_fractional_iat_in_past_is_accepted() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let a_minute_ago = (chrono::Utc::now().timestamp() - 60) as f64 + 0.25;
    let token = TestLaunchTokenBuilder::new()
        .with_claim(CLAIM_ISSUED_AT, json!(a_minute_ago))
        .sign(platform_key_manager());

    assert!(validator.validate_launch(&launch_form(token)).await.is_ok());
}

#[tokio::test]
async fn test_non_numeric_iat_is_rejected() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new()
        .with_claim(CLAIM_ISSUED_AT, json!("not-a-time"))
        .sign(platform_key_manager());

    assert_launch_failure(
        validator.validate_launch(&launch_form(token)).await,
        "verification",
    );
}

#[tokio::test]
async fn test_tampered_payload_fails_signature() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let genuine = TestLaunchTokenBuilder::new().sign(platform_key_manager());
    let forged_claims = TestLaunchTokenBuilder::new()
        .for_subject(TEST_SUBJECT_INSTRUCTOR)
        .sign(platform_key_manager());

    let genuine_parts: Vec<&str> = genuine.split('.').collect();
    let forged_parts: Vec<&str> = forged_claims.split('.').collect();
    let tampered = format!(
        "{}.{}.{}",
        genuine_parts[0], forged_parts[1], genuine_parts[2]
    );

    assert_launch_failure(
        validator.validate_launch(&launch_form(tampered)).await,
        "invalid_signature",
    );
}

#[tokio::test]
async fn test_unpublished_key_is_not_found() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new().sign(other_key_manager());

    assert_launch_failure(
        validator.validate_launch(&launch_form(token)).await,
        "key_not_found",
    );
}

#[tokio::test]
async fn test_symmetric_algorithm_is_refused() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new().sign_hs256(b"shared-secret");

    assert_launch_failure(
        validator.validate_launch(&launch_form(token)).await,
        "unsupported_key",
    );
    assert_eq!(platform.jwks_request_count().await, 0);
}

#[tokio::test]
async fn test_missing_subject_is_named() {
    let platform = MockPlatform::start().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new()
        .without_claim(CLAIM_SUBJECT)
        .sign(platform_key_manager());

    let err = validator
        .validate_launch(&launch_form(token))
        .await
        .unwrap_err();
    assert!(matches!(err, LtiError::MissingClaim("sub")), "{:?}", err);
}

// ============================================================================
// Platform key set failures
// ============================================================================

#[tokio::test]
async fn test_key_set_server_error_is_unavailable() {
    let platform = MockPlatform::start_failing(500).await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new().sign(platform_key_manager());

    assert_launch_failure(
        validator.validate_launch(&launch_form(token)).await,
        "key_set_unavailable",
    );
}

#[tokio::test]
async fn test_key_set_non_json_is_unavailable() {
    let platform = MockPlatform::start_with_garbage().await;
    let validator = validator_for(platform.jwks_url());

    let token = TestLaunchTokenBuilder::new().sign(platform_key_manager());

    assert_launch_failure(
        validator.validate_launch(&launch_form(token)).await,
        "key_set_unavailable",
    );
}

#[tokio::test]
async fn test_unreachable_key_set_is_unavailable() {
    // Nothing listens on the discard port
    let validator = validator_for("http://127.0.0.1:9/jwks".to_string());

    let token = TestLaunchTokenBuilder::new().sign(platform_key_manager());

    let err = validator
        .validate_launch(&launch_form(token))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            LtiError::InvalidLaunch(LaunchFailure::KeySetUnavailable(_))
        ),
        "{:?}",
        err
    );
}
