//! # Status Line Rendering
//!
//! This module turns a [`WeatherFeed`] into the text the ticker shows: a one-line
//! status for the current [`DisplayMode`] and the hourly forecast menu. It also has
//! an ASCII box renderer for the terminal development mode.
//!
//! Rendering is pure. The same feed and mode always give the same string, and a
//! field that is missing or has the wrong type turns the line into `"Error"`
//! (or, for wind, a partial line) instead of failing.

use crate::{DisplayMode, FeedNode, WeatherFeed};
use chrono::{DateTime, Local, TimeZone};
use std::fmt;

/// Text shown when the fields for a mode are absent.
pub const ERROR_TEXT: &str = "Error";

/// Most hourly forecasts listed in the menu.
pub const MENU_LIMIT: usize = 10;

/// Map a wind bearing in degrees to a 16-point compass label.
///
/// Buckets are half-open and not evenly rounded: north covers both `[0, 12)` and
/// `[349, 361)`. Values outside `[0, 361)` give an empty label.
///
/// ```
/// use weather_ticker_lib::display::compass;
///
/// assert_eq!(compass(10), "N");
/// assert_eq!(compass(12), "NNE");
/// assert_eq!(compass(355), "N");
/// assert_eq!(compass(400), "");
/// ```
pub fn compass(degrees: i64) -> &'static str {
    match degrees {
        0..=11 => "N",
        12..=33 => "NNE",
        34..=55 => "NE",
        56..=78 => "ENE",
        79..=100 => "E",
        101..=123 => "ESE",
        124..=145 => "SE",
        146..=168 => "SSE",
        169..=190 => "S",
        191..=213 => "SSW",
        214..=235 => "SW",
        236..=258 => "WSW",
        259..=280 => "W",
        281..=303 => "WNW",
        304..=325 => "NW",
        326..=348 => "NNW",
        349..=360 => "N",
        _ => "",
    }
}

/// Render the status line for one display mode.
pub fn render(feed: &WeatherFeed, mode: DisplayMode) -> String {
    let text = match mode {
        DisplayMode::Summary => feed
            .str_at("/current/weather/0/description")
            .map(|summary| format!("Summary: {summary}")),
        DisplayMode::Temperature => feed
            .int_at("/current/temp")
            .map(|temperature| format!("Temp: {temperature}°")),
        DisplayMode::Wind => Some(render_wind(feed)),
        DisplayMode::Cloud => feed
            .int_at("/current/clouds")
            .map(|cloud| format!("Cloud: {cloud}%")),
    };
    text.unwrap_or_else(|| ERROR_TEXT.to_string())
}

/// `"Winds: {compass} @ {speed}"`, degrading to `"Winds: "` without a bearing.
fn render_wind(feed: &WeatherFeed) -> String {
    let mut text = String::from("Winds: ");
    if let Some(degrees) = feed.int_at("/current/wind_deg") {
        text.push_str(compass(degrees));
        if let Some(speed) = feed.float_at("/current/wind_speed") {
            // Debug formatting keeps the decimal point on whole numbers (5.0)
            text.push_str(&format!(" @ {speed:?}"));
        }
    }
    text
}

/// Menu lines for the first [`MENU_LIMIT`] hourly forecasts, times in `tz`.
///
/// Each line reads `"{time}: {description} ({temp}°)"`. Missing fields fall back to
/// an empty description, a temperature of 0 and the Unix epoch.
pub fn hourly_menu<Tz>(feed: &WeatherFeed, tz: &Tz) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    feed.items_at("/hourly")
        .into_iter()
        .take(MENU_LIMIT)
        .map(|forecast| menu_entry(forecast, tz))
        .collect()
}

/// [`hourly_menu`] in the machine's local time zone.
pub fn hourly_menu_local(feed: &WeatherFeed) -> Vec<String> {
    hourly_menu(feed, &Local)
}

fn menu_entry<Tz>(forecast: FeedNode<'_>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let time = DateTime::from_timestamp(forecast.int_at("/dt").unwrap_or(0), 0)
        .unwrap_or_default()
        .with_timezone(tz);
    let summary = forecast.str_at("/weather/0/description").unwrap_or("");
    let temperature = forecast.int_at("/temp").unwrap_or(0);

    format!(
        "{}: {} ({}°)",
        time.format("%-I:%M %p"),
        summary,
        temperature
    )
}

/// Box the status line and menu for terminal output.
pub fn format_ascii(status: &str, menu: &[String]) -> String {
    let width = std::iter::once(status)
        .chain(menu.iter().map(String::as_str))
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);

    let rule = "─".repeat(width + 2);
    let row = |line: &str| {
        let pad = width - line.chars().count();
        format!("│ {}{} │\n", line, " ".repeat(pad))
    };

    let mut out = format!("┌{rule}┐\n");
    out.push_str(&row(status));
    if !menu.is_empty() {
        out.push_str(&format!("├{rule}┤\n"));
        for line in menu {
            out.push_str(&row(line));
        }
    }
    out.push_str(&format!("└{rule}┘"));
    out
}

/// Print the status line and menu to stdout (development mode).
pub fn draw_ascii(status: &str, menu: &[String]) {
    println!("{}", format_ascii(status, menu));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn test_feed() -> WeatherFeed {
        WeatherFeed::from(json!({
            "current": {
                "temp": 72,
                "wind_deg": 10,
                "wind_speed": 5.5,
                "clouds": 40,
                "weather": [{"description": "clear sky"}]
            }
        }))
    }

    #[test]
    fn test_compass_bucket_edges() {
        let edges = [
            (0, "N"),
            (11, "N"),
            (12, "NNE"),
            (33, "NNE"),
            (34, "NE"),
            (55, "NE"),
            (56, "ENE"),
            (78, "ENE"),
            (79, "E"),
            (100, "E"),
            (101, "ESE"),
            (123, "ESE"),
            (124, "SE"),
            (145, "SE"),
            (146, "SSE"),
            (168, "SSE"),
            (169, "S"),
            (190, "S"),
            (191, "SSW"),
            (213, "SSW"),
            (214, "SW"),
            (235, "SW"),
            (236, "WSW"),
            (258, "WSW"),
            (259, "W"),
            (280, "W"),
            (281, "WNW"),
            (303, "WNW"),
            (304, "NW"),
            (325, "NW"),
            (326, "NNW"),
            (348, "NNW"),
            (349, "N"),
            (359, "N"),
            (360, "N"),
        ];
        for (degrees, label) in edges {
            assert_eq!(compass(degrees), label, "bearing {degrees}");
        }
    }

    #[test]
    fn test_compass_out_of_domain() {
        assert_eq!(compass(-1), "");
        assert_eq!(compass(361), "");
    }

    #[test]
    fn test_compass_covers_every_degree() {
        const LABELS: [&str; 16] = [
            "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W",
            "WNW", "NW", "NNW",
        ];
        for degrees in 0..360 {
            assert!(LABELS.contains(&compass(degrees)), "bearing {degrees}");
        }
    }

    #[test]
    fn test_render_each_mode() {
        let feed = test_feed();
        assert_eq!(render(&feed, DisplayMode::Summary), "Summary: clear sky");
        assert_eq!(render(&feed, DisplayMode::Temperature), "Temp: 72°");
        assert_eq!(render(&feed, DisplayMode::Wind), "Winds: N @ 5.5");
        assert_eq!(render(&feed, DisplayMode::Cloud), "Cloud: 40%");
    }

    #[test]
    fn test_render_is_repeatable() {
        let feed = test_feed();
        for mode in DisplayMode::ALL {
            assert_eq!(render(&feed, mode), render(&feed, mode));
        }
    }

    #[test]
    fn test_render_missing_fields() {
        let feed = WeatherFeed::from(json!({"current": {}}));
        assert_eq!(render(&feed, DisplayMode::Summary), "Error");
        assert_eq!(render(&feed, DisplayMode::Temperature), "Error");
        assert_eq!(render(&feed, DisplayMode::Wind), "Winds: ");
        assert_eq!(render(&feed, DisplayMode::Cloud), "Error");
    }

    #[test]
    fn test_render_wind_without_speed() {
        let feed = WeatherFeed::from(json!({"current": {"wind_deg": 200}}));
        assert_eq!(render(&feed, DisplayMode::Wind), "Winds: SSW");
    }

    #[test]
    fn test_render_wind_whole_speed_keeps_decimal() {
        let feed = WeatherFeed::from(json!({"current": {"wind_deg": 90, "wind_speed": 7.0}}));
        assert_eq!(render(&feed, DisplayMode::Wind), "Winds: E @ 7.0");
    }

    #[test]
    fn test_render_truncates_float_temperature() {
        let feed = WeatherFeed::from(json!({"current": {"temp": 72.6}}));
        assert_eq!(render(&feed, DisplayMode::Temperature), "Temp: 72°");
    }

    #[test]
    fn test_hourly_menu_limits_and_orders() {
        let hourly: Vec<_> = (0..15)
            .map(|i| {
                json!({
                    "dt": 1_600_000_000 + i * 3600,
                    "temp": 60 + i,
                    "weather": [{"description": format!("hour {i}")}]
                })
            })
            .collect();
        let feed = WeatherFeed::from(json!({ "hourly": hourly }));

        let menu = hourly_menu(&feed, &Utc);

        assert_eq!(menu.len(), MENU_LIMIT);
        for (i, line) in menu.iter().enumerate() {
            assert!(line.ends_with(&format!(": hour {i} ({}°)", 60 + i)), "{line}");
        }
    }

    #[test]
    fn test_hourly_menu_time_label() {
        // 2020-09-13 12:26:40 UTC
        let feed = WeatherFeed::from(json!({
            "hourly": [
                {"dt": 1_600_000_000, "temp": 71.4, "weather": [{"description": "light rain"}]},
                {"dt": 1_600_045_200}
            ]
        }));

        let menu = hourly_menu(&feed, &Utc);

        assert_eq!(menu, vec!["12:26 PM: light rain (71°)", "1:00 AM:  (0°)"]);
    }

    #[test]
    fn test_hourly_menu_without_hourly() {
        assert!(hourly_menu(&test_feed(), &Utc).is_empty());
    }

    #[test]
    fn test_ascii_rendering() {
        let out = format_ascii("Temp: 72°", &["1:00 PM: sun (70°)".to_string()]);
        let lines: Vec<_> = out.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "│ Temp: 72°          │");
        assert_eq!(lines[3], "│ 1:00 PM: sun (70°) │");
        // Every row has the same visible width
        let widths: Vec<_> = lines.iter().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{widths:?}");
    }
}
