use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use therapist_core::config::load_env_file;
use therapist_core::{AgentConfig, Config, GeminiClient, TurnHandler};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

const TICK_RATE: Duration = Duration::from_millis(300);

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` may carry RUST_LOG, so it is read before the subscriber exists
    let env_file = load_env_file();
    init_logging()?;
    if let Some(path) = env_file {
        tracing::debug!("loaded environment from {}", path.display());
    }

    // Refuse to open the chat without credentials
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("startup aborted: {e}");
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(?config, "starting terminal chat");

    let client = GeminiClient::from_config(&config)?;
    let agent = AgentConfig::therapist(&config, Arc::new(client));
    let mut app = App::new(TurnHandler::new(agent));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(TICK_RATE);

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    tracing::info!(messages = app.transcript.len(), "terminal chat closed");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
        app.poll_turn().await;
    }
    Ok(())
}

/// The terminal owns stderr, so logs go to `<cache_dir>/therapist/therapist.log`.
fn init_logging() -> Result<()> {
    let Some(dir) = dirs::cache_dir().map(|d| d.join("therapist")) else {
        return Ok(());
    };
    fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("therapist.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
