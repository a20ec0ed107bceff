//! # Preferences Management
//!
//! This module handles loading and parsing preferences from the weather-ticker.toml file,
//! and publishes changes to interested parties through [`SettingsStore`].
//!
//! A missing or malformed file is never fatal: the ticker falls back to the default
//! location (Mobile, AL) with no API key, which renders "No API key" until one is set.

use crate::{DisplayMode, Units};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

/// Default preferences file, relative to the working directory.
pub const DEFAULT_PATH: &str = "weather-ticker.toml";

/// Environment variable consulted when the configured API key is empty.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Selector value meaning "rotate through every mode".
pub const AUTO_ROTATE: i32 = -1;

/// Longest accepted rotation period, in seconds.
pub const MAX_ROTATE_INTERVAL_SECS: u64 = 60 * 60;

/// Longest accepted refresh period, in minutes (one week).
pub const MAX_REFRESH_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// User preferences loaded from weather-ticker.toml
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Preferences {
    /// Where to fetch the forecast for
    pub location: LocationConfig,
    /// OpenWeather credentials and endpoint
    pub api: ApiConfig,
    /// Status line behaviour
    pub display: DisplayConfig,
}

/// Forecast coordinates in decimal degrees
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

/// OpenWeather API access
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// OpenWeather API key; empty means "not configured"
    pub key: String,
    /// Scheme and host of the API, without a trailing slash
    pub base_url: String,
}

/// Status line configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// -1 rotates through every mode; 0..=3 pins a single mode
    pub status_bar_option: i32,
    /// Unit system requested from the API
    pub units: Units,
    /// Seconds between mode changes while rotating
    pub rotate_interval_secs: u64,
    /// Minutes between background refreshes, 0 disables
    pub refresh_interval_minutes: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig {
            latitude: 30.808114,
            longitude: -88.071143,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            key: String::new(),
            base_url: "https://api.openweathermap.org".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            status_bar_option: AUTO_ROTATE,
            units: Units::Imperial,
            rotate_interval_secs: 2,
            refresh_interval_minutes: 30,
        }
    }
}

/// How the display mode is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    /// Cycle through every mode on a timer, starting from [`DisplayMode::Summary`]
    Auto,
    /// Show one mode. `None` when the stored selector is out of range, which
    /// renders as "Error".
    Pinned(Option<DisplayMode>),
}

impl Preferences {
    /// Load preferences from specified path
    /// Falls back to default preferences if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Preferences>(&contents) {
                Ok(prefs) => {
                    info!(
                        "Loaded preferences from {} ({}, {})",
                        path.display(),
                        prefs.location.latitude,
                        prefs.location.longitude
                    );
                    prefs
                }
                Err(e) => {
                    warn!("Invalid preferences file {}: {}", path.display(), e);
                    warn!("Using default preferences");
                    Self::default()
                }
            },
            Err(_) => {
                info!(
                    "No preferences file at {}, using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Fill an empty API key from `OPENWEATHER_API_KEY`.
    pub fn with_env_overrides(mut self) -> Self {
        if self.api.key.is_empty() {
            if let Ok(key) = env::var(API_KEY_ENV) {
                if !key.is_empty() {
                    info!("Using API key from {}", API_KEY_ENV);
                    self.api.key = key;
                }
            }
        }
        self
    }

    /// Save preferences to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!("Preferences saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn rotation(&self) -> Rotation {
        match self.display.status_bar_option {
            AUTO_ROTATE => Rotation::Auto,
            pinned => Rotation::Pinned(DisplayMode::from_index(pinned.into())),
        }
    }

    /// Rotation period, clamped to `1..=MAX_ROTATE_INTERVAL_SECS` seconds.
    pub fn rotate_interval(&self) -> Duration {
        Duration::from_secs(
            self.display
                .rotate_interval_secs
                .clamp(1, MAX_ROTATE_INTERVAL_SECS),
        )
    }

    /// Background refresh period, `None` when disabled.
    ///
    /// Capped at [`MAX_REFRESH_INTERVAL_MINUTES`].
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.display.refresh_interval_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(
                minutes.min(MAX_REFRESH_INTERVAL_MINUTES).saturating_mul(60),
            )),
        }
    }
}

type Callback = Arc<dyn Fn(&Preferences) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

/// Current preferences plus change notification.
///
/// Subscribers are called synchronously, in registration order, from whichever
/// thread calls [`SettingsStore::update`].
pub struct SettingsStore {
    current: Mutex<Preferences>,
    subscribers: Arc<Mutex<Subscribers>>,
}

/// Keeps a subscription alive; dropping it unsubscribes.
#[must_use = "dropping the handle unsubscribes immediately"]
pub struct SubscriptionHandle {
    id: u64,
    subscribers: Weak<Mutex<Subscribers>>,
}

impl SettingsStore {
    pub fn new(prefs: Preferences) -> Self {
        SettingsStore {
            current: Mutex::new(prefs),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
        }
    }

    pub fn current(&self) -> Preferences {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the stored preferences and notify every subscriber.
    pub fn update(&self, prefs: Preferences) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = prefs.clone();

        // Snapshot so callbacks may subscribe or unsubscribe without deadlocking
        let callbacks: Vec<Callback> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(&prefs);
        }
    }

    pub fn subscribe<F>(&self, on_change: F) -> SubscriptionHandle
    where
        F: Fn(&Preferences) + Send + Sync + 'static,
    {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.callbacks.push((id, Arc::new(on_change)));

        SubscriptionHandle {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .callbacks
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_preferences() {
        let prefs = Preferences::default();
        assert_eq!(prefs.location.latitude, 30.808114);
        assert_eq!(prefs.location.longitude, -88.071143);
        assert!(prefs.api.key.is_empty());
        assert_eq!(prefs.display.status_bar_option, -1);
        assert_eq!(prefs.display.units, Units::Imperial);
        assert_eq!(prefs.rotation(), Rotation::Auto);
        assert_eq!(prefs.rotate_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_preferences_roundtrip() {
        let mut prefs = Preferences::default();
        prefs.api.key = "abc123".to_string();
        prefs.display.units = Units::Metric;

        let toml_str = toml::to_string(&prefs).unwrap();
        let parsed: Preferences = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, prefs);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: Preferences = toml::from_str(
            r#"
            [api]
            key = "k"

            [display]
            status_bar_option = 2
            units = "metric"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.api.key, "k");
        assert_eq!(parsed.api.base_url, "https://api.openweathermap.org");
        assert_eq!(parsed.location, LocationConfig::default());
        assert_eq!(parsed.rotation(), Rotation::Pinned(Some(DisplayMode::Wind)));
        assert_eq!(parsed.display.units, Units::Metric);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let prefs = Preferences::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_load_invalid_file_falls_back() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "this is = = not toml").unwrap();
        assert_eq!(Preferences::load_from_path(file.path()), Preferences::default());
    }

    #[test]
    fn test_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let mut prefs = Preferences::default();
        prefs.location.latitude = 51.5;
        prefs.display.refresh_interval_minutes = 0;

        prefs.save_to_path(file.path()).unwrap();
        let loaded = Preferences::load_from_path(file.path());

        assert_eq!(loaded, prefs);
        assert_eq!(loaded.refresh_interval(), None);
    }

    #[test]
    fn test_huge_intervals_are_capped() {
        let mut prefs = Preferences::default();
        prefs.display.refresh_interval_minutes = u64::MAX;
        prefs.display.rotate_interval_secs = u64::MAX;

        assert_eq!(
            prefs.refresh_interval(),
            Some(Duration::from_secs(MAX_REFRESH_INTERVAL_MINUTES * 60))
        );
        assert_eq!(
            prefs.rotate_interval(),
            Duration::from_secs(MAX_ROTATE_INTERVAL_SECS)
        );

        prefs.display.rotate_interval_secs = 0;
        assert_eq!(prefs.rotate_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_out_of_range_selector_is_pinned_error() {
        let mut prefs = Preferences::default();
        prefs.display.status_bar_option = 7;
        assert_eq!(prefs.rotation(), Rotation::Pinned(None));
        prefs.display.status_bar_option = -2;
        assert_eq!(prefs.rotation(), Rotation::Pinned(None));
    }

    #[test]
    fn test_subscribers_notified_until_dropped() {
        let store = SettingsStore::new(Preferences::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let handle = store.subscribe(move |prefs| {
            assert_eq!(prefs.api.key, "new");
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut prefs = Preferences::default();
        prefs.api.key = "new".to_string();
        store.update(prefs.clone());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.current(), prefs);

        drop(handle);
        store.update(prefs);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
