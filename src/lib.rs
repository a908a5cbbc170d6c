mod utils;

pub mod adjust;
pub mod app;
pub mod audio;
pub mod catalog;
pub mod countdown;
pub mod navigation;
pub mod session;
pub mod settings;

use std::{env, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

use app::{MeditationApp, Screen};
use audio::RodioBackend;
use catalog::BundledCatalog;
use session::{ScreenCommand, SessionEvent};
use settings::{SettingsStore, SETTINGS_FILE};

fn data_dir() -> Result<PathBuf> {
    match env::var_os("STILLPOINT_DATA_DIR") {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => env::current_dir().context("Failed to resolve the working directory"),
    }
}

fn init_logging() {
    let debug_mode = env::var("STILLPOINT_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let _ = env_logger::Builder::from_default_env()
        .filter_level(if debug_mode {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .try_init();
}

/// Terminal front end: reads commands from stdin, prints the current screen
/// after each one and the countdown while a meditation runs.
pub async fn run() -> Result<()> {
    init_logging();
    log::info!("Stillpoint starting up...");

    let data_dir = data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let settings_store = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
    let settings = settings_store.settings();
    log::info!("Loaded settings from {}", settings_store.path().display());

    let catalog = Arc::new(BundledCatalog::with_overrides(
        settings.audio_overrides.clone(),
    ));
    let mut app = MeditationApp::new(&settings, Arc::new(RodioBackend::new()), catalog);
    let mut events = app.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", app.render().await);
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let outcome = match line.parse::<ScreenCommand>() {
                    Ok(command) => app.handle(command).await,
                    Err(err) => Err(err),
                };
                match outcome {
                    Ok(Some(text)) => println!("{text}"),
                    Ok(None) => {}
                    Err(err) => println!("{err:#}"),
                }
                if app.should_quit() {
                    break;
                }
                println!("{}", app.render().await);
            }
            event = events.recv() => match event {
                Ok(SessionEvent::StateChanged { phase, display, .. })
                    if phase.is_active() && app.screen() == Screen::Meditate =>
                {
                    println!("  {display}");
                }
                Ok(SessionEvent::Completed { .. }) => {
                    println!("Session complete.");
                    println!("{}", app.render().await);
                }
                Ok(SessionEvent::StateChanged { .. }) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    app.shutdown().await;
    log::info!("Stillpoint shut down");
    Ok(())
}
