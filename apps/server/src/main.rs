//! # Tally Server
//!
//! ```text
//! tracing ──► AppConfig::load ──► Database (pool + migrations)
//!         ──► bootstrap admin ──► axum::serve ──► shutdown ──► db.close()
//! ```

use std::sync::Arc;

use anyhow::Context;
use tally_db::{Database, DbConfig};
use tally_server::{build_router, ensure_bootstrap_admin, AppConfig, AppState};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,tally_server=debug,tally_db=debug,tower_http=info")
            }),
        )
        .with_target(true)
        .init();

    info!("Starting Tally server...");

    // Load configuration
    let config = AppConfig::load().context("loading configuration")?;
    info!(
        port = config.server.port,
        api_root = %config.server.api_root,
        db_path = %config.database.path.display(),
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("Using the development JWT secret, set TALLY__AUTH__JWT_SECRET in production");
    }

    // Open database (runs migrations)
    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await
    .context("opening database")?;

    if ensure_bootstrap_admin(&db, &config).await? {
        warn!("Created 'admin' with the configured bootstrap password, change it after first login");
    }

    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(db.clone(), config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
