//! Therapist web binary entry point.
//!
//! Loads configuration, wires the Gemini client into the turn handler, and
//! serves the chat page with graceful shutdown on ctrl-c.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use therapist_core::config::{self, Config, Settings};
use therapist_core::{AgentConfig, GeminiClient, TurnHandler};
use therapist_web::AppState;
use tokio::signal;
use tracing_subscriber::EnvFilter;

const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` may carry RUST_LOG, so it is read before the subscriber exists
    let env_file = config::load_env_file();

    // Initialize tracing from RUST_LOG (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    if let Some(path) = env_file {
        tracing::debug!("loaded environment from {}", path.display());
    }

    let settings = Settings::load();
    let bind = settings
        .as_ref()
        .map(Settings::bind_address)
        .unwrap_or_else(|_| Settings::default().bind_address());

    let app = match settings.and_then(|s| Config::resolve(s, config::env_var)) {
        Ok(config) => {
            tracing::info!(?config, "configuration loaded");
            let client = GeminiClient::from_config(&config)?;
            let agent = AgentConfig::therapist(&config, Arc::new(client));
            let state = AppState::new(TurnHandler::new(agent));
            spawn_session_sweeper(&state);
            therapist_web::router(state)
        }
        Err(e) => {
            // Stay up so the browser shows what is missing, but never chat
            tracing::error!("chat disabled: {e}");
            therapist_web::config_error_router(&e.to_string())
        }
    };

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("therapist chat listening on http://{bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

fn spawn_session_sweeper(state: &AppState) {
    let sessions = Arc::clone(&state.sessions);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sessions.cleanup_idle(SESSION_IDLE_TIMEOUT);
        }
    });
}

/// Wait for ctrl-c signal for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
