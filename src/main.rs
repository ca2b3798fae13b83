pub mod agent;
pub mod app;
pub mod cli;
pub mod definitions;
pub mod event;
pub mod logging;
pub mod plain;
pub mod tui;
pub mod ui;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{Event as CrosstermEvent, EventStream};
use futures_util::StreamExt;
use log::{error, info};

use agent::{AgentBuilder, ChatSession, McpAgentBuilder};
use app::App;
use cli::Cli;
use event::Event;
use tui::Tui;
use ui::render;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_file = load_env(cli.env_file.as_deref())?;

    if cli.plain {
        logging::init_stderr_logging(cli.verbose);
    } else {
        logging::init_file_logging(&cli.log_file, cli.verbose)?;
    }
    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }

    let builder: Arc<dyn AgentBuilder> = Arc::new(McpAgentBuilder::default());
    let mut session = ChatSession::open(&cli.config);
    info!(
        "Starting with {} models from {}",
        session.models().len(),
        cli.config.display()
    );

    if cli.plain {
        let result = plain::run(&mut session, builder.as_ref()).await;
        session.shutdown().await;
        return result;
    }
    run_tui(session, builder).await
}

/// Loads `path`, or `.env` when no path is given and one exists.
fn load_env(path: Option<&Path>) -> Result<Option<PathBuf>> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).context("failed to load .env"),
        },
    }
}

async fn run_tui(session: ChatSession, builder: Arc<dyn AgentBuilder>) -> Result<()> {
    let mut terminal = tui::init()?;
    let mut app = App::new(session, builder);

    let result = event_loop(&mut terminal, &mut app).await;
    if let Err(err) = &result {
        error!("Event loop failed: {:#}", err);
    }
    // Runs on every exit path, including loop errors.
    app.shutdown().await;
    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut stream = EventStream::new();
    let mut interval = tokio::time::interval(app.tick_rate());

    while !app.should_quit {
        terminal.draw(|frame| render(frame, app))?;

        // Drawn once with the "Initializing agent..." indicator first.
        if app.needs_initialization() {
            app.initialize_agent_runtime().await;
            continue;
        }

        let event = tokio::select! {
            _ = interval.tick() => Event::Tick,
            maybe_event = stream.next() => {
                match maybe_event {
                    Some(Ok(CrosstermEvent::Key(key))) => Event::Key(key),
                    Some(Ok(CrosstermEvent::Mouse(mouse))) => Event::Mouse(mouse),
                    Some(Ok(CrosstermEvent::Resize(_, _))) => Event::Resize,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => return Err(err).context("terminal event stream failed"),
                    None => break,
                }
            }
        };

        match event {
            Event::Tick => app.on_tick(),
            Event::Key(key) => app.handle_key(key).await,
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            Event::Resize => {}
        }
    }
    Ok(())
}
