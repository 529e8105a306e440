//! esds-portal: ESDS membership card portal
//!
//! Long-running service that:
//! - Serves the card dashboard behind a shared password
//! - Renders card faces and N-up duplex print sheets
//! - Emails new cards to members (with Pass2U wallet passes)
//! - Tracks QR code redirects

mod api;
mod auth;
mod config;
mod dancecloud;
mod db;
mod email;
mod error;
mod issuer;
mod pass2u;
mod state;
mod templates;

#[cfg(test)]
mod test_support;

use config::Config;
use issuer::CardIssuer;
use state::AppState;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_LOG_FILTER: &str = "esds_portal=info,card_printer=info,tower_http=info";

/// Console logging, plus a daily rolling file when `log_dir` is set
fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
    };

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "esds-portal");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter()).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("esds-portal: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(config.log_dir.as_deref());
    tracing::info!(
        dc_host = %config.dc_host,
        email = config.smtp.is_some(),
        wallet_passes = config.pass2u.is_some(),
        door_team = config.door_volunteers_team_id.is_some(),
        cors_origins = ?config.cors_origins,
        "Starting esds-portal"
    );

    let http_port = config.http_port;
    let poll_interval = Duration::from_secs(config.dc_poll_interval_secs);
    let state = AppState::new(config).await?;

    // Periodic login-attempt cleanup (every 5 minutes)
    let login_attempts = state.login_attempts.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            login_attempts.cleanup();
            tracing::debug!(records = login_attempts.len(), "login attempt records swept");
        }
    });

    match CardIssuer::from_state(&state) {
        Some(issuer) => {
            issuer.spawn(poll_interval);
        }
        None => tracing::warn!("SMTP not configured; new cards will not be emailed"),
    }

    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("esds-portal HTTP listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
