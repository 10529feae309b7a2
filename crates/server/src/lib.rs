//! Portfolio API Server Library
//!
//! JWT-authenticated project CRUD with embedded images, a contact form
//! relayed over SMTP, and a portfolio-aware chat assistant.

pub mod chat;
pub mod contact;
pub mod core;
pub mod projects;

use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::config::{AppState, ServerConfig};

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// `info` level. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("=== Portfolio API ===");

    let config = ServerConfig::from_env();
    let port = config.port;
    let admin = config.admin.clone();
    info!("Database: {}", config.database_url);
    info!(
        "Mode: {}",
        if config.development { "development" } else { "production" }
    );

    let state = AppState::from_config(config).await?;

    // Warm the pool; a failure here is retried on the first request.
    if let Err(e) = state.db.pool().await {
        warn!("[Db] Initial connection failed: {}", e);
    }

    if let Some(admin) = admin {
        match state
            .auth
            .ensure_admin(&admin.name, &admin.email, &admin.password)
            .await
        {
            Ok(true) => info!("[Auth] Admin account {} created", admin.email),
            Ok(false) => info!("[Auth] Admin account {} already present", admin.email),
            Err(e) => warn!("[Auth] Admin bootstrap failed: {}", e),
        }
    }

    info!(
        "Contact relay: {} | Chat relay: {}",
        if state.contact.is_configured() { "on" } else { "off" },
        if state.chat.is_configured() { "on" } else { "off" },
    );

    let app = crate::core::router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.db.close().await;
    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
