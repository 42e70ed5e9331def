mod config;
mod controller;
mod error;
mod logging;
mod model;
mod view;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use config::AppConfig;
use controller::AppController;
use model::{FavoriteCity, LocalStore, WeatherApi};
use view::AppView;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;

    if let Err(e) = logging::init_logging(&config.log_dir) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== weather-tui starting ===");

    if config.api_key.is_empty() {
        tracing::warn!("No API key configured, weather requests will be rejected");
    }

    let store: Arc<LocalStore<FavoriteCity>> = Arc::new(
        LocalStore::open(&config.data_file)
            .with_context(|| format!("opening favourites at {}", config.data_file.display()))?,
    );
    let api = Arc::new(WeatherApi::new(&config)?);

    let controller = AppController::new(store, api.clone(), api, config.search.settings())
        .context("opening favourites view")?;

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, controller);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("weather-tui shutting down");
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut controller: AppController,
) -> io::Result<()> {
    loop {
        // Apply store notifications and finished requests
        controller.tick();

        terminal.draw(|f| {
            AppView::render(f, &controller);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                controller.handle_key_event(key);
            }
        }

        if controller.should_quit() {
            break;
        }
    }

    Ok(())
}
