use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Request side
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Optional groupings of the One Call response that can be excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastSection {
    Current,
    Minutely,
    Hourly,
    Daily,
    Alerts,
}

impl ForecastSection {
    /// `current` and `hourly` feed every view, so they are always requested
    pub fn is_excludable(&self) -> bool {
        matches!(self, Self::Minutely | Self::Daily | Self::Alerts)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Minutely => "minutely",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Alerts => "alerts",
        }
    }
}

impl FromStr for ForecastSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "minutely" => Ok(Self::Minutely),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "alerts" => Ok(Self::Alerts),
            other => Err(format!("unknown forecast section `{other}`")),
        }
    }
}

impl fmt::Display for ForecastSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherQuery {
    pub coordinate: Coordinate,
    pub excluded_sections: BTreeSet<ForecastSection>,
}

impl WeatherQuery {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            excluded_sections: BTreeSet::new(),
        }
    }

    pub fn excluding(mut self, sections: impl IntoIterator<Item = ForecastSection>) -> Self {
        self.excluded_sections.extend(sections);
        self
    }

    /// Comma-joined value for the `exclude` query parameter
    pub fn exclude_param(&self) -> String {
        self.excluded_sections
            .iter()
            .map(ForecastSection::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

// ============================================================================
// One Call API 3.0 response
// Unknown fields are ignored; absent sections decode to None
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    pub timezone_offset: i32,
    pub current: CurrentConditions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutely: Option<Vec<MinutelyPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly: Option<Vec<HourlyPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily: Option<Vec<DailyPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
}

impl WeatherSnapshot {
    /// Checks the invariants serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.current.weather.is_empty() {
            return Err("current.weather must contain at least one condition".to_string());
        }

        if let Some(hourly) = &self.hourly {
            if let Some(pair) = hourly.windows(2).find(|pair| pair[1].dt <= pair[0].dt) {
                return Err(format!(
                    "hourly timestamps must be strictly increasing ({} followed by {})",
                    pair[0].dt, pair[1].dt
                ));
            }
        }

        Ok(())
    }

    /// Hourly points from the start of the current hour onwards
    pub fn upcoming_hours(&self, limit: usize) -> &[HourlyPoint] {
        let hourly = self.hourly.as_deref().unwrap_or_default();
        let hour_start = self.current.dt - self.current.dt.rem_euclid(3600);
        let first = hourly.partition_point(|h| h.dt < hour_start);
        let rest = &hourly[first..];
        &rest[..rest.len().min(limit)]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub dt: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset: Option<i64>,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: u32,
    pub humidity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dew_point: Option<f64>,
    pub uvi: f64,
    pub clouds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<u32>,
    pub wind_speed: f64,
    pub wind_deg: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,
    pub weather: Vec<WeatherCondition>,
}

impl CurrentConditions {
    /// First reported condition, used for icon and description
    pub fn primary_condition(&self) -> Option<&WeatherCondition> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinutelyPoint {
    pub dt: i64,
    pub precipitation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub dt: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: u32,
    pub humidity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dew_point: Option<f64>,
    pub uvi: f64,
    pub clouds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<u32>,
    pub wind_speed: f64,
    pub wind_deg: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,
    /// Probability of precipitation
    #[serde(default)]
    pub pop: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<PrecipitationVolume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow: Option<PrecipitationVolume>,
    pub weather: Vec<WeatherCondition>,
}

impl HourlyPoint {
    pub fn primary_condition(&self) -> Option<&WeatherCondition> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecipitationVolume {
    #[serde(rename = "1h", default, skip_serializing_if = "Option::is_none")]
    pub one_hour: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPoint {
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub moonrise: i64,
    pub moonset: i64,
    pub moon_phase: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub temp: DailyTemperature,
    pub feels_like: DailyFeelsLike,
    pub pressure: u32,
    pub humidity: u32,
    pub dew_point: f64,
    pub wind_speed: f64,
    pub wind_deg: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,
    pub clouds: u32,
    #[serde(default)]
    pub pop: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow: Option<f64>,
    pub uvi: f64,
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub day: f64,
    pub min: f64,
    pub max: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyFeelsLike {
    pub day: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub sender_name: String,
    pub event: String,
    pub start: i64,
    pub end: i64,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Alert {
    /// Whether `ts` falls inside the validity window `[start, end]`
    pub fn is_active_at(&self, ts: i64) -> bool {
        (self.start..=self.end).contains(&ts)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    pub fn condition(icon: &str) -> Value {
        json!({ "id": 800, "main": "Clear", "description": "clear sky", "icon": icon })
    }

    pub fn current(dt: i64, temp: f64) -> Value {
        json!({
            "dt": dt,
            "sunrise": dt - 20000,
            "sunset": dt + 20000,
            "temp": temp,
            "feels_like": temp - 1.5,
            "pressure": 1013,
            "humidity": 65,
            "dew_point": 14.0,
            "uvi": 3.5,
            "clouds": 40,
            "visibility": 10000,
            "wind_speed": 5.5,
            "wind_deg": 180,
            "weather": [condition("01d")]
        })
    }

    pub fn hour(dt: i64, temp: f64, icon: &str) -> Value {
        json!({
            "dt": dt,
            "temp": temp,
            "feels_like": temp,
            "pressure": 1012,
            "humidity": 70,
            "dew_point": 12.0,
            "uvi": 1.0,
            "clouds": 20,
            "wind_speed": 3.2,
            "wind_deg": 90,
            "pop": 0.2,
            "weather": [condition(icon)]
        })
    }

    /// A One Call body with `count` hourly points starting at the current hour
    pub fn onecall_body(dt: i64, temp: f64, count: usize) -> Value {
        let hour_start = dt - dt.rem_euclid(3600);
        let hourly: Vec<Value> = (0..count)
            .map(|i| hour(hour_start + 3600 * i as i64, temp + i as f64, "02d"))
            .collect();

        json!({
            "lat": 43.6532,
            "lon": -79.3832,
            "timezone": "America/Toronto",
            "timezone_offset": -18000,
            "current": current(dt, temp),
            "hourly": hourly
        })
    }
}
