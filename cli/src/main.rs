use anyhow::{anyhow, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs::OpenOptions, io, sync::Arc};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

mod api;
mod app;
mod config;
mod controller;
mod download;
mod error;
mod fallback;
mod media;
mod payload;
mod playback;
mod types;
mod ui;

use app::AppState;
use config::AppConfig;
use controller::{Collaborators, StoryController};
use download::DirectorySink;
use playback::{AudioOutput, CommandSpeech, RodioOutput, SpeechEngine, UnavailableOutput};

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing()?;
    info!("starting storyreel");

    let config = AppConfig::load()?;
    let client = api::Client::new(
        Some(config.backend_url()),
        config.generate_path(),
        config.request_timeout(),
    )?;
    info!(url = %client.generate_url(), "story backend configured");

    let audio: Arc<dyn AudioOutput> = match RodioOutput::spawn(client.http().clone()) {
        Ok(output) => Arc::new(output),
        Err(err) => {
            warn!(error = %err, "audio output unavailable; narration falls back to speech");
            Arc::new(UnavailableOutput::new(format!("audio output unavailable: {err}")))
        }
    };
    let speech: Arc<dyn SpeechEngine> = Arc::new(CommandSpeech::detect(config.speech_command()));
    let artifacts =
        Arc::new(DirectorySink::new(client.http().clone(), config.download_dir().clone()));

    let (event_tx, mut event_rx) = unbounded_channel();
    let (command_tx, command_rx) = unbounded_channel();

    let controller = StoryController::new(
        Collaborators { backend: Arc::new(client.clone()), audio, speech, artifacts },
        event_tx,
    );
    controller.spawn(command_rx);

    let mut app_state = AppState::new(&config);
    app_state.push_status_line(format!("Backend: {}", client.base_url()));

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    enable_raw_mode()?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let ui_result = ui::run(&mut terminal, &mut app_state, &mut event_rx, command_tx);

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    ui_result
}

fn setup_tracing() -> Result<()> {
    // The terminal belongs to the UI, so logs go to a file.
    let writer = match AppConfig::log_path()
        .and_then(|path| Ok(OpenOptions::new().create(true).append(true).open(path)?))
    {
        Ok(file) => BoxMakeWriter::new(Arc::new(file)),
        Err(_) => BoxMakeWriter::new(io::sink),
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .compact()
        .try_init()
        .map_err(|err: Box<dyn std::error::Error + Send + Sync>| {
            anyhow!("failed to initialise tracing: {err}")
        })?;
    Ok(())
}
