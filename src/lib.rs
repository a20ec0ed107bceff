//! # Weather Ticker Core Library
//!
//! This library provides the data structures and state machine behind the weather
//! ticker: a small status-line applet that periodically fetches an OpenWeather
//! "One Call" feed and rotates a one-line summary through four display modes.
//!
//! ## Design Philosophy
//!
//! ### One Owner, One Feed
//! - **Single owner**: all mutable state (cached feed, current mode) lives in
//!   [`session::Session`], driven by one event loop
//! - **Worker fetches**: the HTTP request runs on a separate tokio task and its
//!   result is sent back to the owner as an event
//! - **Pure rendering**: the status text is a function of `(feed, mode)` only
//!
//! ### Opaque Feed, Explicit Access
//! The response document is kept as a generic JSON tree. Nothing is validated up
//! front; each display mode reads the handful of fields it needs through typed
//! accessors that return `None` for anything absent or of the wrong type.
//!
//! ### Data Flow
//! 1. **Trigger**: launch, settings change or periodic refresh asks for a fetch
//! 2. **Fetch**: worker task performs one GET and parses the JSON body
//! 3. **Apply**: owner replaces the cached feed, renders status, rebuilds the menu
//! 4. **Rotate**: a ticker advances the display mode and re-renders
//!
//! ## Core Types
//! - [`WeatherFeed`]: the parsed response document
//! - [`DisplayMode`]: which of the four summaries is shown
//! - [`Units`]: unit system requested from the API

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// Module declarations
pub mod config;
pub mod display;
pub mod feed;
pub mod scheduler;
pub mod session;

/// Parsed weather response document.
///
/// The tree is treated as opaque apart from the paths the display modes read.
/// Paths are JSON pointers (RFC 6901), e.g. `/current/weather/0/description`.
///
/// # Example
/// ```
/// use weather_ticker_lib::WeatherFeed;
///
/// let feed = WeatherFeed::from_json(r#"{"current": {"temp": 72.6, "clouds": 40}}"#).unwrap();
///
/// assert_eq!(feed.int_at("/current/temp"), Some(72));
/// assert_eq!(feed.int_at("/current/clouds"), Some(40));
/// assert_eq!(feed.str_at("/current/temp"), None);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherFeed(Value);

impl WeatherFeed {
    /// Parse a response body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body).map(Self)
    }

    /// Borrow the document root as a [`FeedNode`].
    pub fn root(&self) -> FeedNode<'_> {
        FeedNode(&self.0)
    }

    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.root().str_at(pointer)
    }

    pub fn int_at(&self, pointer: &str) -> Option<i64> {
        self.root().int_at(pointer)
    }

    pub fn float_at(&self, pointer: &str) -> Option<f64> {
        self.root().float_at(pointer)
    }

    /// Elements of the array at `pointer`, empty if absent or not an array.
    pub fn items_at(&self, pointer: &str) -> Vec<FeedNode<'_>> {
        self.root().items_at(pointer)
    }
}

impl From<Value> for WeatherFeed {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Borrowed view of one subtree of a [`WeatherFeed`].
#[derive(Clone, Copy, Debug)]
pub struct FeedNode<'a>(&'a Value);

impl<'a> FeedNode<'a> {
    fn at(self, pointer: &str) -> Option<&'a Value> {
        self.0.pointer(pointer)
    }

    /// String value at `pointer`; numbers are not coerced.
    pub fn str_at(self, pointer: &str) -> Option<&'a str> {
        self.at(pointer)?.as_str()
    }

    /// Integer value at `pointer`.
    ///
    /// Any JSON number is accepted and truncated toward zero, so a temperature
    /// of `72.6` reads as `72`.
    pub fn int_at(self, pointer: &str) -> Option<i64> {
        let value = self.at(pointer)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.trunc() as i64))
    }

    pub fn float_at(self, pointer: &str) -> Option<f64> {
        self.at(pointer)?.as_f64()
    }

    pub fn items_at(self, pointer: &str) -> Vec<FeedNode<'a>> {
        self.at(pointer)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(FeedNode).collect())
            .unwrap_or_default()
    }
}

/// Which summary the status line shows.
///
/// Modes cycle `Summary → Temperature → Wind → Cloud → Summary`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// `current.weather[0].description`
    #[default]
    Summary = 0,
    /// `current.temp`
    Temperature = 1,
    /// `current.wind_deg` and `current.wind_speed`
    Wind = 2,
    /// `current.clouds`
    Cloud = 3,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 4] = [
        DisplayMode::Summary,
        DisplayMode::Temperature,
        DisplayMode::Wind,
        DisplayMode::Cloud,
    ];

    /// Mode for a stored selector index, `None` outside `0..=3`.
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .copied()
    }

    /// Next mode in the rotation, wrapping `Cloud` back to `Summary`.
    pub fn advance(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }
}

/// Unit system requested from the API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Metric,
    #[default]
    Imperial,
}

impl Units {
    /// Value of the `units` query parameter.
    pub fn query_value(self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_value())
    }
}
