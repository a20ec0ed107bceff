//! # Weather Ticker Application Entry Point
//!
//! This binary wires the library together: it loads preferences, starts the ticker
//! session on a tokio runtime, and forwards terminal input and signals to it as
//! session events. It supports a long-running ticker mode and a one-shot
//! development mode (`--once`) that prints every display mode and exits.


use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use weather_ticker_lib::config::{Preferences, SettingsStore, DEFAULT_PATH};
use weather_ticker_lib::display::{self, draw_ascii};
use weather_ticker_lib::feed::FeedFetcher;
use weather_ticker_lib::session::{Event, Session, StatusSurface};
use weather_ticker_lib::DisplayMode;

/// Status-line weather ticker for OpenWeather
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Preferences file (TOML)
    #[arg(short, long, default_value = DEFAULT_PATH)]
    config: PathBuf,

    /// Fetch once, print every display mode and the hourly menu, then exit
    #[arg(long)]
    once: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Terminal status surface: status lines on stdout, menu as an ASCII box.
#[derive(Default)]
struct ConsoleSurface {
    status: String,
}

impl StatusSurface for ConsoleSurface {
    fn show_status(&mut self, text: &str) {
        if self.status != text {
            self.status = text.to_string();
            println!("{}", self.status);
        }
    }

    fn show_menu(&mut self, entries: &[String]) {
        draw_ascii(&self.status, entries);
    }
}

fn load_preferences(path: &Path) -> Preferences {
    Preferences::load_from_path(path).with_env_overrides()
}

/// Development mode: one fetch, every mode rendered to stdout.
async fn run_once(prefs: &Preferences) -> anyhow::Result<()> {
    let fetcher = FeedFetcher::new().context("building HTTP client")?;
    let feed = match fetcher.fetch(prefs).await {
        Ok(feed) => feed,
        Err(err) => {
            println!("{}", err.user_message());
            return Err(err).context("fetching weather feed");
        }
    };

    for mode in DisplayMode::ALL {
        println!("{}", display::render(&feed, mode));
    }
    draw_ascii(
        &display::render(&feed, DisplayMode::Summary),
        &display::hourly_menu_local(&feed),
    );
    Ok(())
}

/// Ticker mode: run the session until Ctrl-C.
async fn run_ticker(config_path: PathBuf, prefs: Preferences) -> anyhow::Result<()> {
    let store = Arc::new(SettingsStore::new(prefs));
    let fetcher = FeedFetcher::new().context("building HTTP client")?;
    let (session, rx) = Session::new(store.current(), fetcher, ConsoleSurface::default());
    let events = session.sender();

    let settings_events = events.clone();
    let _subscription = store.subscribe(move |prefs| {
        let _ = settings_events.send(Event::SettingsChanged(prefs.clone()));
    });

    let shutdown = CancellationToken::new();
    let session_task = tokio::spawn(session.run(rx, shutdown.clone()));
    events.send(Event::Launch)?;

    spawn_reload_on_hangup(Arc::clone(&store), config_path, shutdown.clone());
    spawn_cycle_on_enter(events.clone(), shutdown.clone());

    info!("Press Enter to cycle the display, Ctrl-C to quit");
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Shutting down.");

    shutdown.cancel();
    session_task.await?;
    Ok(())
}

/// Reload the preferences file on SIGHUP and publish it through the store.
#[cfg(unix)]
fn spawn_reload_on_hangup(store: Arc<SettingsStore>, path: PathBuf, shutdown: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!("SIGHUP reload unavailable: {}", e);
            return;
        }
    };

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    info!("SIGHUP received. Reloading {}", path.display());
                    store.update(load_preferences(&path));
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_store: Arc<SettingsStore>, _path: PathBuf, _shutdown: CancellationToken) {}

/// Each line on stdin asks the session to show the next mode.
fn spawn_cycle_on_enter(events: mpsc::UnboundedSender<Event>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                line = lines.next_line() => match line {
                    Ok(Some(_)) => {
                        if events.send(Event::UserCycleRequest).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("stdin read failed: {}", e);
                        break;
                    }
                }
            }
        }
    });
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(if cli.debug {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp_secs()
    .init();

    info!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let prefs = load_preferences(&cli.config);

    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;

    let result = if cli.once {
        rt.block_on(run_once(&prefs))
    } else {
        rt.block_on(run_ticker(cli.config, prefs))
    };

    // The stdin reader may still be parked in a blocking read
    rt.shutdown_background();
    result
}
