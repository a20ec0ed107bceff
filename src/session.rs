//! # Ticker Session
//!
//! The session is the single owner of mutable ticker state: the cached feed, the
//! current display mode, and the timers that drive them. Everything reaches it as
//! an [`Event`] on one channel and is handled in order on one task, so no locking
//! is needed around the feed.
//!
//! ## Triggers
//! - **Launch / settings change**: fetch, then reset rotation per the new settings
//! - **Auto-rotate tick**: advance the mode and re-render (auto-rotate only)
//! - **User cycle request**: advance the mode and re-render
//! - **Refresh tick**: fetch
//!
//! ## Fetch Lifecycle
//! A fetch runs on a spawned worker task and reports back with
//! [`Event::FetchCompleted`]. At most one fetch is in flight; a trigger that arrives
//! meanwhile is remembered and runs exactly one follow-up fetch once the current one
//! completes, so the newest settings always win.
//!
//! On failure the short error text replaces the status line but the last good feed
//! is kept. The next render (a rotation tick, say) brings back the last good
//! display rather than leaving the ticker blank.

use crate::config::{Preferences, Rotation};
use crate::display::{self, ERROR_TEXT};
use crate::feed::{FeedFetcher, FeedTransport, FetchError};
use crate::scheduler::Ticker;
use crate::{DisplayMode, WeatherFeed};
use log::{debug, info, warn};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Status text shown before the first fetch completes.
pub const FETCHING_TEXT: &str = "Fetching...";

/// Inputs to the session state machine.
#[derive(Debug)]
pub enum Event {
    Launch,
    SettingsChanged(Preferences),
    /// Carries the rotation generation of the ticker that sent it
    AutoRotateTick(u64),
    UserCycleRequest,
    RefreshTick,
    FetchCompleted(Result<WeatherFeed, FetchError>),
}

/// Where rendered output goes.
pub trait StatusSurface: Send + 'static {
    /// Replace the one-line status.
    fn show_status(&mut self, text: &str);

    /// Replace the hourly forecast menu (at most [`display::MENU_LIMIT`] lines).
    fn show_menu(&mut self, entries: &[String]);
}

/// Owner of the feed, the display mode and the periodic triggers.
pub struct Session<T: FeedTransport, S: StatusSurface> {
    prefs: Preferences,
    feed: Option<WeatherFeed>,
    /// `None` when pinned to an out-of-range selector
    mode: Option<DisplayMode>,
    fetcher: Arc<FeedFetcher<T>>,
    surface: S,
    events: mpsc::UnboundedSender<Event>,
    rotation: Option<Ticker>,
    /// Bumped whenever the rotation ticker is replaced or stopped
    rotation_generation: u64,
    refresh: Option<Ticker>,
    in_flight: bool,
    refetch_pending: bool,
}

impl<T: FeedTransport, S: StatusSurface> Session<T, S> {
    /// Create a session and the receiving end of its event channel.
    pub fn new(
        prefs: Preferences,
        fetcher: FeedFetcher<T>,
        surface: S,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Session {
            prefs,
            feed: None,
            mode: Some(DisplayMode::Summary),
            fetcher: Arc::new(fetcher),
            surface,
            events,
            rotation: None,
            rotation_generation: 0,
            refresh: None,
            in_flight: false,
            refetch_pending: false,
        };
        (session, rx)
    }

    /// Sender for delivering external triggers to this session.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.events.clone()
    }

    pub fn feed(&self) -> Option<&WeatherFeed> {
        self.feed.as_ref()
    }

    pub fn mode(&self) -> Option<DisplayMode> {
        self.mode
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Generation that current auto-rotate ticks must carry.
    pub fn rotation_generation(&self) -> u64 {
        self.rotation_generation
    }

    pub fn is_fetch_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_rotating(&self) -> bool {
        self.rotation.as_ref().is_some_and(|ticker| !ticker.is_stopped())
    }

    /// Process events until `shutdown` is cancelled.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Event>, shutdown: CancellationToken) {
        info!("Ticker session starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Ticker session shutting down");
                    break;
                }
                event = rx.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                }
            }
        }
    }

    /// Apply one event.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Launch => {
                self.surface.show_status(FETCHING_TEXT);
                self.apply_settings();
            }
            Event::SettingsChanged(prefs) => {
                info!("Settings changed");
                self.prefs = prefs;
                self.apply_settings();
            }
            Event::AutoRotateTick(generation) => {
                // Ticks queued by a replaced or stopped ticker are stale
                if generation == self.rotation_generation
                    && self.prefs.rotation() == Rotation::Auto
                {
                    self.advance_mode();
                    self.update_display();
                }
            }
            Event::UserCycleRequest => {
                self.advance_mode();
                self.update_display();
            }
            Event::RefreshTick => self.request_fetch(),
            Event::FetchCompleted(result) => self.complete_fetch(result),
        }
    }

    fn apply_settings(&mut self) {
        self.request_fetch();

        self.rotation_generation = self.rotation_generation.wrapping_add(1);
        match self.prefs.rotation() {
            Rotation::Auto => {
                self.mode = Some(DisplayMode::Summary);
                // Replacing the old ticker drops and cancels it
                let generation = self.rotation_generation;
                self.rotation = Some(self.spawn_ticker(self.prefs.rotate_interval(), move || {
                    Event::AutoRotateTick(generation)
                }));
            }
            Rotation::Pinned(mode) => {
                if mode.is_none() {
                    warn!(
                        "status_bar_option {} is not a display mode",
                        self.prefs.display.status_bar_option
                    );
                }
                self.rotation = None;
                self.mode = mode;
            }
        }

        self.refresh = self
            .prefs
            .refresh_interval()
            .map(|period| self.spawn_ticker(period, || Event::RefreshTick));
    }

    fn spawn_ticker<F>(&self, period: std::time::Duration, event: F) -> Ticker
    where
        F: Fn() -> Event + Send + 'static,
    {
        let events = self.events.clone();
        Ticker::spawn(period, move || match events.send(event()) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        })
    }

    fn advance_mode(&mut self) {
        self.mode = Some(self.mode.map_or(DisplayMode::Summary, DisplayMode::advance));
    }

    fn request_fetch(&mut self) {
        if self.in_flight {
            debug!("Fetch already in flight, queueing one more");
            self.refetch_pending = true;
            return;
        }
        self.in_flight = true;

        let fetcher = Arc::clone(&self.fetcher);
        let prefs = self.prefs.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch(&prefs).await;
            if events.send(Event::FetchCompleted(result)).is_err() {
                debug!("Session closed before fetch completed");
            }
        });
    }

    fn complete_fetch(&mut self, result: Result<WeatherFeed, FetchError>) {
        self.in_flight = false;

        match result {
            Ok(feed) => {
                self.feed = Some(feed);
                self.update_display();
                self.refresh_menu();
            }
            Err(err) => {
                warn!("Feed fetch failed: {}", err);
                self.surface.show_status(err.user_message());
            }
        }

        if self.refetch_pending {
            self.refetch_pending = false;
            self.request_fetch();
        }
    }

    /// Render the status line; a no-op until a feed has arrived.
    fn update_display(&mut self) {
        let Some(feed) = &self.feed else {
            return;
        };
        let text = match self.mode {
            Some(mode) => display::render(feed, mode),
            None => ERROR_TEXT.to_string(),
        };
        debug!("Status: {}", text);
        self.surface.show_status(&text);
    }

    fn refresh_menu(&mut self) {
        if let Some(feed) = &self.feed {
            let entries = display::hourly_menu_local(feed);
            self.surface.show_menu(&entries);
        }
    }
}
