//! Test server harness for E2E testing
//!
//! Provides TestToolServer for spawning real LTI tool instances in tests.

use crate::crypto_fixtures::test_rsa_key;
use crate::mock_platform::MockPlatform;
use crate::test_ids::*;
use lti_tool::config::Config;
use lti_tool::crypto::KeyManager;
use lti_tool::observability::metrics::init_metrics_recorder;
use lti_tool::routes::{self, AppState};
use lti_tool::services::launch_service::LaunchValidator;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Key id the test tool publishes.
pub const TEST_TOOL_KID: &str = "lti-tool-test-key";

static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static TOOL_KEY: OnceLock<Arc<KeyManager>> = OnceLock::new();

/// Shared metrics handle; falls back to an uninstalled recorder when another
/// recorder already owns the process.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder().unwrap_or_else(|_| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle()
            })
        })
        .clone()
}

fn tool_key_manager() -> Arc<KeyManager> {
    TOOL_KEY
        .get_or_init(|| {
            let key = test_rsa_key(10).expect("tool fixture key");
            Arc::new(KeyManager::from_private_key(TEST_TOOL_KID, key).expect("tool key manager"))
        })
        .clone()
}

/// Environment a test tool is configured from, pointed at `platform`.
pub fn test_config_vars(platform: &MockPlatform) -> HashMap<String, String> {
    [
        ("APP_NAME", "Test Tool".to_string()),
        ("TOOL_DESCRIPTION", "Tool under test".to_string()),
        ("DATABASE_URL", "sqlite::memory:".to_string()),
        ("BIND_ADDRESS", "127.0.0.1:0".to_string()),
        ("LTI_CLIENT_ID", TEST_CLIENT_ID.to_string()),
        ("LTI_DEPLOYMENT_ID", TEST_DEPLOYMENT_ID.to_string()),
        ("LTI_ISSUER", TEST_ISSUER.to_string()),
        ("LTI_AUTH_TOKEN_URL", platform.auth_url()),
        ("LTI_JWK_URL", platform.jwks_url()),
        ("TOOL_URL", TEST_TOOL_URL.to_string()),
        ("TOOL_LOGIN_URL", format!("{}/lti/login", TEST_TOOL_URL)),
        ("TOOL_LAUNCH_URL", TEST_TOOL_LAUNCH_URL.to_string()),
        ("TOOL_REDIRECT_URL", TEST_TOOL_REDIRECT_URL.to_string()),
        ("TOOL_CODE", "test_tool".to_string()),
        ("TOOL_KEY_ID", TEST_TOOL_KID.to_string()),
        ("SECRET_KEY", TEST_SECRET_KEY.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Test harness for spawning the LTI tool in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_launch_e2e(pool: SqlitePool) -> Result<()> {
///     let platform = MockPlatform::start().await;
///     let server = TestToolServer::spawn(pool, &platform).await?;
///
///     let response = server
///         .client()
///         .post(format!("{}/lti/launch", server.url()))
///         .form(&[("id_token", token)])
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 303);
///     Ok(())
/// }
/// ```
pub struct TestToolServer {
    addr: SocketAddr,
    pool: SqlitePool,
    config: Config,
    key_manager: Arc<KeyManager>,
    handle: JoinHandle<()>,
}

impl TestToolServer {
    /// Spawn a tool with default settings against `platform`.
    pub async fn spawn(pool: SqlitePool, platform: &MockPlatform) -> Result<Self, anyhow::Error> {
        Self::spawn_with(pool, platform, &[]).await
    }

    /// Spawn a tool with extra environment settings layered over the defaults,
    /// e.g. `[("LTI_ENFORCE_NONCE", "true")]`.
    pub async fn spawn_with(
        pool: SqlitePool,
        platform: &MockPlatform,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = test_config_vars(platform);
        for (name, value) in overrides {
            vars.insert((*name).to_string(), (*value).to_string());
        }
        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let key_manager = tool_key_manager();
        let state = Arc::new(AppState {
            pool: pool.clone(),
            config: config.clone(),
            key_manager: key_manager.clone(),
            launch_validator: Arc::new(LaunchValidator::from_config(&config)),
        });

        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            config,
            key_manager,
            handle,
        })
    }

    /// Get reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get reference to the server configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The tool's own signing key
    pub fn key_manager(&self) -> &KeyManager {
        &self.key_manager
    }

    /// HTTP client that does not follow redirects, so tests can inspect them.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build test HTTP client")
    }
}

impl Drop for TestToolServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
