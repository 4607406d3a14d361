//! taskdeck HTTP service
//!
//! A personal task manager: accounts with cookie sessions, owner-scoped
//! tasks with statistics, and a persistent log of internal errors.

pub mod config;
pub mod error_log;
pub mod web;

use accounts::{Mailer, SessionKeys};
use anyhow::{Context, Result};
use db::Database;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Config;
pub use crate::web::{build_router, AppState, WebSettings};

/// Open the database, bind the listener and serve until shutdown
pub async fn serve(cfg: Config) -> Result<()> {
    let secret = cfg
        .auth
        .jwt_secret
        .clone()
        .filter(|s| !s.is_empty())
        .context("No JWT secret configured. Set auth.jwt_secret or JWT_SECRET")?;

    let db_path = config::get_db_path(&cfg)?;
    let db = Database::connect(&cfg.database, Some(db_path)).await?;

    let mailer = match cfg.email.smtp_settings() {
        Some(settings) => Mailer::smtp(&settings)?,
        None => {
            warn!("Email credentials not configured, reset emails will only be logged");
            Mailer::Log
        }
    };

    let settings = WebSettings {
        production: cfg.server.production,
        frontend_url: cfg.server.frontend_url.clone(),
    };
    let state = AppState::new(db, SessionKeys::new(&secret), mailer, settings);
    let app = build_router(state);

    let address = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    info!("Server running on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
