//! OIDC login initiation over HTTP.

use lti_test_utils::{
    MockPlatform, RedirectAssertions, TestToolServer, TEST_CLIENT_ID, TEST_ISSUER,
    TEST_TOOL_LAUNCH_URL,
};
use reqwest::header::LOCATION;
use reqwest::StatusCode;
use serde_json::Value;
use sqlx::SqlitePool;
use url::Url;

const LOGIN_PARAMS: [&str; 5] = [
    "iss",
    "target_link_uri",
    "login_hint",
    "lti_message_hint",
    "client_id",
];

fn login_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("iss", TEST_ISSUER),
        ("target_link_uri", TEST_TOOL_LAUNCH_URL),
        ("login_hint", "user-hint-123"),
        ("lti_message_hint", "message-hint-456"),
        ("client_id", TEST_CLIENT_ID),
    ]
}

fn location(response: &reqwest::Response) -> Url {
    let header = response
        .headers()
        .get(LOCATION)
        .expect("redirect must carry Location")
        .to_str()
        .unwrap();
    Url::parse(header).unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_post_redirects_to_platform(pool: SqlitePool) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    let response = server
        .client()
        .post(format!("{}/lti/login", server.url()))
        .form(&login_form())
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.as_str().starts_with(&platform.auth_url()));

    target
        .assert_query_param("scope", "openid")
        .assert_query_param("response_type", "id_token")
        .assert_query_param("response_mode", "form_post")
        .assert_query_param("prompt", "none")
        .assert_query_param("client_id", TEST_CLIENT_ID)
        .assert_query_param("login_hint", "user-hint-123")
        .assert_query_param("lti_message_hint", "message-hint-456")
        .assert_query_param("redirect_uri", TEST_TOOL_LAUNCH_URL);
    target.query_param("state");
    target.query_param("nonce");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_get_accepts_query_parameters(pool: SqlitePool) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    let response = server
        .client()
        .get(format!("{}/lti/login", server.url()))
        .query(&login_form())
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    location(&response).assert_query_param("login_hint", "user-hint-123");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_missing_each_parameter_is_named(pool: SqlitePool) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    for missing in LOGIN_PARAMS {
        let form: Vec<_> = login_form()
            .into_iter()
            .filter(|(name, _)| *name != missing)
            .collect();

        let response = server
            .client()
            .post(format!("{}/lti/login", server.url()))
            .form(&form)
            .send()
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "without {}", missing);
        let body: Value = response.json().await?;
        assert_eq!(body["error"]["code"], "MISSING_PARAMETER");
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .ends_with(missing),
            "message should name {}: {}",
            missing,
            body["error"]["message"]
        );
    }

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_consecutive_logins_get_fresh_state_and_nonce(
    pool: SqlitePool,
) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    let mut seen = Vec::new();
    for _ in 0..2 {
        let response = server
            .client()
            .post(format!("{}/lti/login", server.url()))
            .form(&login_form())
            .send()
            .await?;
        let target = location(&response);
        seen.push((target.query_param("state"), target.query_param("nonce")));
    }

    assert_ne!(seen[0].0, seen[1].0, "state must be fresh per login");
    assert_ne!(seen[0].1, seen[1].1, "nonce must be fresh per login");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_records_nonce_when_enforced(pool: SqlitePool) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server =
        TestToolServer::spawn_with(pool, &platform, &[("LTI_ENFORCE_NONCE", "true")]).await?;

    let response = server
        .client()
        .post(format!("{}/lti/login", server.url()))
        .form(&login_form())
        .send()
        .await?;
    let target = location(&response);

    let stored: Option<String> =
        sqlx::query_scalar("SELECT state FROM lti_nonces WHERE nonce = ?1")
            .bind(target.query_param("nonce"))
            .fetch_optional(server.pool())
            .await?;
    assert_eq!(stored, Some(target.query_param("state")));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_does_not_store_nonce_by_default(pool: SqlitePool) -> Result<(), anyhow::Error> {
    let platform = MockPlatform::start().await;
    let server = TestToolServer::spawn(pool, &platform).await?;

    server
        .client()
        .post(format!("{}/lti/login", server.url()))
        .form(&login_form())
        .send()
        .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lti_nonces")
        .fetch_one(server.pool())
        .await?;
    assert_eq!(count, 0);

    Ok(())
}
