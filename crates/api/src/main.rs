use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tollgate_api::assets::{AssetUploader, HttpAssetUploader};
use tollgate_api::auth::jwt::TokenIssuer;
use tollgate_api::auth::session::SessionManager;
use tollgate_api::config::{ServerConfig, StoreBackend};
use tollgate_api::router::build_app_router;
use tollgate_api::state::AppState;
use tollgate_db::{CredentialStore, MemoryCredentialStore, PgCredentialStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tollgate_api=debug,tollgate_db=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(
        host = %config.host,
        port = %config.port,
        tokens = ?config.tokens,
        "Loaded server configuration"
    );

    // --- Credential store ---
    let store: Arc<dyn CredentialStore> = match &config.store {
        StoreBackend::Postgres { database_url } => {
            let pool = tollgate_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            tollgate_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            tollgate_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgCredentialStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory credential store; accounts are lost on restart");
            Arc::new(MemoryCredentialStore::new())
        }
    };

    // --- Upload staging ---
    tokio::fs::create_dir_all(&config.uploads.staging_dir)
        .await
        .expect("Failed to create upload staging directory");
    let uploader: Arc<dyn AssetUploader> = Arc::new(HttpAssetUploader::new(&config.uploads));

    // --- Session manager ---
    let issuer = TokenIssuer::new(config.tokens.clone());
    let sessions = Arc::new(SessionManager::new(store, uploader, issuer));

    // --- App state & router ---
    let config = Arc::new(config);
    let state = AppState {
        config: Arc::clone(&config),
        sessions,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let shutdown = Arc::new(Notify::new());
    let server = tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.notified().await })
                .await
        }
    });

    shutdown_signal().await;
    shutdown.notify_one();

    // --- Drain in-flight requests ---
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(grace, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("Graceful shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task failed"),
        Err(_) => tracing::warn!(
            grace_secs = config.shutdown_timeout_secs,
            "Shutdown grace period elapsed, dropping remaining connections"
        ),
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
