//! # OpenWeather Feed Fetching
//!
//! This module performs the single network operation of the ticker: one HTTP GET
//! against the OpenWeather "One Call" endpoint, parsed into a [`WeatherFeed`].
//!
//! ## Request
//! - **URL**: `{base_url}/data/2.5/onecall?lat={lat}&lon={lon}&appid={key}&units={units}`
//! - **Units**: `metric` or `imperial`, from the stored preference
//! - **Timeout**: whatever the HTTP client defaults to
//!
//! ## Failure Policy
//! Fetching is best effort. There is no retry and no backoff; a failed attempt is
//! reported to the caller, which shows a short message and waits for the next
//! trigger. An empty API key fails before any network I/O.
//!
//! The transport sits behind [`FeedTransport`] so the request path can be exercised
//! without a network.

use crate::config::Preferences;
use crate::WeatherFeed;
use log::{debug, warn};
use reqwest::Client;
use std::future::Future;
use thiserror::Error;

/// Path of the One Call endpoint below the configured base URL.
const ONECALL_PATH: &str = "/data/2.5/onecall";

/// Errors that can occur while fetching the feed.
///
/// Every variant other than [`FetchError::MissingApiKey`] is a network-class
/// failure and is shown to the user as "Bad API call".
#[derive(Error, Debug)]
pub enum FetchError {
    /// No API key configured; no request was made
    #[error("no API key configured")]
    MissingApiKey,

    /// Transport failure (DNS, connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Body was not valid JSON
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Short text for the status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::MissingApiKey => "No API key",
            _ => "Bad API call",
        }
    }
}

/// The HTTP boundary: fetch a URL and return its body as text.
pub trait FeedTransport: Send + Sync + 'static {
    fn get(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// [`FeedTransport`] backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl FeedTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// Build the request URL for the given preferences.
///
/// ```
/// use weather_ticker_lib::config::Preferences;
/// use weather_ticker_lib::feed::request_url;
///
/// let mut prefs = Preferences::default();
/// prefs.api.key = "KEY".to_string();
///
/// assert_eq!(
///     request_url(&prefs),
///     "https://api.openweathermap.org/data/2.5/onecall?lat=30.808114&lon=-88.071143&appid=KEY&units=imperial"
/// );
/// ```
pub fn request_url(prefs: &Preferences) -> String {
    format!(
        "{}{}?lat={}&lon={}&appid={}&units={}",
        prefs.api.base_url.trim_end_matches('/'),
        ONECALL_PATH,
        prefs.location.latitude,
        prefs.location.longitude,
        prefs.api.key,
        prefs.display.units.query_value()
    )
}

/// Fetches and parses the feed through a [`FeedTransport`].
#[derive(Clone, Debug)]
pub struct FeedFetcher<T = HttpTransport> {
    transport: T,
}

impl FeedFetcher<HttpTransport> {
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self::with_transport(HttpTransport::new()?))
    }
}

impl<T: FeedTransport> FeedFetcher<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the current feed.
    ///
    /// # Returns
    /// - `Ok(WeatherFeed)`: the parsed document, not validated beyond being JSON
    /// - `Err(FetchError::MissingApiKey)`: key empty, transport untouched
    /// - `Err(_)`: transport, status or decode failure
    pub async fn fetch(&self, prefs: &Preferences) -> Result<WeatherFeed, FetchError> {
        if prefs.api.key.is_empty() {
            warn!("Skipping fetch: no API key configured");
            return Err(FetchError::MissingApiKey);
        }

        debug!(
            "Fetching feed for ({}, {}) in {} units",
            prefs.location.latitude, prefs.location.longitude, prefs.display.units
        );
        let body = self.transport.get(&request_url(prefs)).await?;
        let feed = WeatherFeed::from_json(&body)?;
        debug!("Feed parsed ({} bytes)", body.len());

        Ok(feed)
    }
}
