use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mrag_core::{Config, EventReceiver, RagClient, Session};

mod app;
mod handler;
mod logging;
mod theme;
mod tui;
mod ui;

use app::App;
use theme::Theme;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "mrag")]
#[command(version)]
#[command(about = "Upload PDF documents and ask questions about them through a RAG backend")]
struct Cli {
    /// Backend base URL (overrides MRAG_API_URL and the config file)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,
    /// Color theme: neon, classic or light
    #[arg(long)]
    theme: Option<String>,
    /// Log filter written to the log file, e.g. "debug" or "mrag_core=trace"
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(cli.log_level.as_deref());

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read config, using defaults");
        Config::new()
    });
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    let theme_name = cli.theme.or_else(|| config.theme.clone());
    tracing::info!(api = %config.api_base_url, "starting");

    let client = RagClient::with_timeouts(&config.api_base_url, config.timeouts());
    let (session, mut session_events) = Session::new(Arc::new(client), config.timings());
    let mut app = App::new(session, Theme::named(theme_name.as_deref()), config.api_base_url.clone());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events, &mut session_events).await;

    tui::restore()?;
    if let Err(e) = &result {
        tracing::error!(error = %e, "exited with error");
    }
    result
}

/// Draw, then wait for either terminal input or a session completion
async fn run(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
    session_events: &mut EventReceiver,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event).await?,
            Some(event) = session_events.recv() => app.apply_session_event(event),
            else => break,
        }
    }
    Ok(())
}
