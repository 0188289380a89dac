//! Display helpers shared by the view-state projection and the widget.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::weather::WeatherSnapshot;

pub const UNKNOWN_ICON: &str = "unknown";

const HOUR_FORMAT: &str = "%-I %p";
const NOT_AVAILABLE: &str = "N/A";

/// "2 PM"-style hour label at a fixed UTC offset
pub fn time_label(unix_timestamp: i64, offset_seconds: i32) -> String {
    let offset = FixedOffset::east_opt(offset_seconds).unwrap_or_else(|| Utc.fix());
    format_hour(unix_timestamp, &offset)
}

/// Hour label in a named IANA zone, falling back to the fixed offset if the
/// name is unknown
pub fn zoned_time_label(unix_timestamp: i64, timezone: &str, offset_seconds: i32) -> String {
    match timezone.parse::<Tz>() {
        Ok(tz) => format_hour(unix_timestamp, &tz),
        Err(_) => time_label(unix_timestamp, offset_seconds),
    }
}

/// Hour label in the snapshot's own location time
pub fn snapshot_time_label(snapshot: &WeatherSnapshot, unix_timestamp: i64) -> String {
    zoned_time_label(unix_timestamp, &snapshot.timezone, snapshot.timezone_offset)
}

fn format_hour<Z: TimeZone>(unix_timestamp: i64, zone: &Z) -> String
where
    Z::Offset: std::fmt::Display,
{
    match DateTime::from_timestamp(unix_timestamp, 0) {
        Some(utc) => utc.with_timezone(zone).format(HOUR_FORMAT).to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Map an OpenWeatherMap icon code to a symbolic icon name
pub fn icon_key(condition_code: &str) -> &'static str {
    match condition_code {
        "01d" => "sun",
        "01n" => "moon",
        "02d" => "partly-cloudy-day",
        "02n" => "partly-cloudy-night",
        "03d" | "03n" => "cloud",
        "09d" | "09n" | "10d" | "10n" => "rain",
        "11d" | "11n" => "thunderstorm",
        "13d" | "13n" => "snow",
        "50d" | "50n" => "fog",
        _ => UNKNOWN_ICON,
    }
}

/// Whole-degree Celsius label, truncated toward zero ("20°C")
pub fn temperature_label(temp: f64) -> String {
    format!("{}°C", temp.trunc() as i64)
}
