//! LTI Tool
//!
//! Entry point for the LTI 1.3 tool provider.

use lti_tool::config::Config;
use lti_tool::observability::metrics::init_metrics_recorder;
use lti_tool::routes::{self, AppState};
use lti_tool::services::key_management_service;
use lti_tool::services::launch_service::LaunchValidator;
use lti_tool::tasks::start_nonce_cleanup;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first; the log level depends on DEBUG_MODE
    let config = Config::from_env().inspect_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
    })?;

    init_tracing(config.debug_mode);

    info!("Starting LTI tool");
    info!(
        app_name = %config.app_name,
        bind_address = %config.bind_address,
        issuer = %config.lti_issuer,
        enforce_nonce = config.enforce_nonce,
        enforce_deployment = config.enforce_deployment,
        "Configuration loaded successfully"
    );

    // Metrics recorder must be installed before any metric is emitted
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    info!("Connecting to database...");
    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            e
        })?;

    info!("Database connection established");

    info!("Initializing signing key...");
    let key_manager = key_management_service::initialize_key_manager(&config)
        .await
        .map_err(|e| {
            error!("Failed to initialize signing key: {}", e);
            e
        })?;
    info!(kid = %key_manager.kid(), "Signing key ready");

    let launch_validator = LaunchValidator::from_config(&config);

    // Parse bind address before moving config
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let shutdown_token = CancellationToken::new();
    let nonce_ttl = Duration::from_secs(config.nonce_ttl_seconds);
    let cleanup_handle = tokio::spawn(start_nonce_cleanup(
        db_pool.clone(),
        nonce_ttl,
        nonce_ttl,
        shutdown_token.child_token(),
    ));

    let state = Arc::new(AppState {
        pool: db_pool.clone(),
        config,
        key_manager: Arc::new(key_manager),
        launch_validator: Arc::new(launch_validator),
    });

    let app = routes::build_routes(state, metrics_handle);

    info!("LTI tool listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_token.cancel();
    if let Err(e) = cleanup_handle.await {
        error!("Nonce cleanup task ended abnormally: {}", e);
    }
    db_pool.close().await;

    info!("LTI tool shutdown complete");

    Ok(())
}

/// Console logging, JSON when `LOG_FORMAT=json`. `RUST_LOG` overrides the
/// default filter.
fn init_tracing(debug_mode: bool) {
    let default_filter = if debug_mode {
        "lti_tool=debug,tower_http=debug"
    } else {
        "lti_tool=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
