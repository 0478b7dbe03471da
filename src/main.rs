//! dimedia-tui - a terminal client for the DiMediaNet media API.
//!
//! Log in against the auth endpoint, download and preview the remote
//! image fitted to the display limit, and run a stopwatch, all inside a
//! ratatui terminal UI.

mod api;
mod app;
mod auth;
mod config;
mod texture;
mod timer;
mod ui;
mod utils;

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name under the cache directory
const LOG_FILE: &str = "dimedia.log";

fn env_filter() -> EnvFilter {
    // RUST_LOG controls the log level (e.g. RUST_LOG=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize tracing for the TUI. The alternate screen owns the
/// terminal, so logs go to a file; the guard must stay alive for the
/// writer to flush.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dimedia-tui");
    std::fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();

    Ok(guard)
}

/// Initialize tracing for CLI utility paths, which own stderr.
fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--fetch-once" {
        return fetch_once().await;
    }

    let _guard = init_tracing()?;
    info!("dimedia-tui starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app; nothing is persisted, so every start needs a login
    let mut app = App::new(config::Config::from_env())?;
    app.start_login();

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("dimedia-tui shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut last_frame = Instant::now();

    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout so the loop keeps ticking
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Frame clock for the stopwatch
        let now = Instant::now();
        let delta = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;
        app.tick(delta);

        // Fold in completed downloads
        app.poll_downloads();
    }
}

/// CLI utility path: log in from the environment, fetch the image once
/// with the thread-blocking variant, fit it, and report what happened.
async fn fetch_once() -> Result<()> {
    use api::ApiClient;
    use auth::{Credentials, Session};
    use texture::{DeviceCaps, TextureFitter};
    use utils::format_bytes;

    init_cli_tracing();

    let config = config::Config::from_env();
    let api = ApiClient::new(&config)?;
    let mut session = Session::new();

    let username = std::env::var("DIMEDIA_USERNAME").unwrap_or_default();
    let password = std::env::var("DIMEDIA_PASSWORD").unwrap_or_default();
    if !username.is_empty() && !password.is_empty() {
        eprintln!("Logging in as {}...", username);
        let result = api.login(&Credentials::new(&username, &password)).await;
        match result.token {
            Some(token) => session.establish(token, &username),
            None => eprintln!(
                "No token in login response (status {:?}); fetching unauthenticated",
                result.status_code
            ),
        }
    } else {
        eprintln!("DIMEDIA_USERNAME/DIMEDIA_PASSWORD not set; fetching unauthenticated");
    }

    // The blocking variant must not run on a runtime worker thread
    let handle = tokio::runtime::Handle::current();
    let bytes =
        tokio::task::spawn_blocking(move || api.fetch_image_blocking(&handle, &session)).await??;
    eprintln!("Downloaded {}", format_bytes(bytes.len()));

    let fitter = TextureFitter::new(DeviceCaps::detect(), config.max_texture_dim);
    let fitted = fitter.fit(&bytes)?;
    let (width, height) = fitted.dimensions();
    println!("{}x{} ({:?})", width, height, fitted.outcome);

    Ok(())
}
