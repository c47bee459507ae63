use std::fs::{self, File};
use std::sync::Mutex;

use anyhow::Result;
use copilot_core::Config;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

/// Send tracing output to `<cache_dir>/copilot/copilot.log`; the terminal belongs to the UI
fn init_logging() -> Result<()> {
    let dir = dirs::cache_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?
        .join("copilot");
    fs::create_dir_all(&dir)?;
    let file = File::options()
        .create(true)
        .append(true)
        .open(dir.join("copilot.log"))?;

    let filter = EnvFilter::try_from_env("COPILOT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {}", e);
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "could not read config file, using defaults");
            Config::new()
        }
    }
    .from_env();

    let mut app = App::new(&config)?;
    info!(base_url = %app.base_url, "starting copilot");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut app, &mut terminal).await;
    tui::restore()?;

    result
}

async fn run(app: &mut App, terminal: &mut tui::Tui) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event)?;
        app.poll_request().await;
    }

    if let Some(task) = app.request_task.take() {
        task.abort();
    }
    Ok(())
}
