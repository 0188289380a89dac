use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::format::{icon_key, snapshot_time_label, temperature_label, UNKNOWN_ICON};
use super::state::{ForecastViewState, Phase};
use crate::weather::{Alert, HourlyPoint, WeatherSnapshot};

/// Number of cards in the hourly strip
pub const HOURLY_STRIP_LEN: usize = 7;

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CityQueryRequest {
    pub city: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CoordinatesRequest {
    pub lat: f64,
    pub lon: f64,
}

// ============================================================================
// View-state projection
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct ViewStateResponse {
    pub phase: Phase,
    pub is_loading: bool,
    pub last_queried_city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentCard>,
    pub hourly: Vec<HourlyCard>,
    /// Alerts whose window covers the current observation time
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub active_alerts: Vec<AlertCard>,
    /// Full decoded One Call response of the last successful fetch
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub snapshot: Option<WeatherSnapshot>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentCard {
    pub temperature: String,
    pub feels_like: String,
    pub description: String,
    pub icon: String,
    pub humidity: u32,
    pub wind_speed: f64,
}

/// One card of the horizontally scrolling hourly strip
#[derive(Debug, Serialize, ToSchema)]
pub struct HourlyCard {
    pub timestamp: i64,
    pub hour: String,
    pub icon: String,
    pub temperature: String,
    pub wind_speed: f64,
    pub humidity: u32,
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertCard {
    pub event: String,
    pub sender_name: String,
    pub start: i64,
    pub end: i64,
}

impl From<&Alert> for AlertCard {
    fn from(alert: &Alert) -> Self {
        Self {
            event: alert.event.clone(),
            sender_name: alert.sender_name.clone(),
            start: alert.start,
            end: alert.end,
        }
    }
}

impl HourlyCard {
    fn from_point(snapshot: &WeatherSnapshot, point: &HourlyPoint) -> Self {
        let condition = point.primary_condition();
        Self {
            timestamp: point.dt,
            hour: snapshot_time_label(snapshot, point.dt),
            icon: condition
                .map_or(UNKNOWN_ICON, |c| icon_key(&c.icon))
                .to_string(),
            temperature: temperature_label(point.temp),
            wind_speed: point.wind_speed,
            humidity: point.humidity,
            description: condition.map(|c| c.description.clone()).unwrap_or_default(),
        }
    }
}

impl From<&ForecastViewState> for ViewStateResponse {
    fn from(state: &ForecastViewState) -> Self {
        let snapshot = state.snapshot.as_deref();

        let current = snapshot.map(|s| {
            let condition = s.current.primary_condition();
            CurrentCard {
                temperature: temperature_label(s.current.temp),
                feels_like: temperature_label(s.current.feels_like),
                description: condition.map(|c| c.description.clone()).unwrap_or_default(),
                icon: condition
                    .map_or(UNKNOWN_ICON, |c| icon_key(&c.icon))
                    .to_string(),
                humidity: s.current.humidity,
                wind_speed: s.current.wind_speed,
            }
        });

        let hourly = snapshot
            .map(|s| {
                s.upcoming_hours(HOURLY_STRIP_LEN)
                    .iter()
                    .map(|h| HourlyCard::from_point(s, h))
                    .collect()
            })
            .unwrap_or_default();

        let active_alerts: Vec<AlertCard> = snapshot
            .and_then(|s| {
                s.alerts.as_ref().map(|alerts| {
                    alerts
                        .iter()
                        .filter(|a| a.is_active_at(s.current.dt))
                        .map(AlertCard::from)
                        .collect()
                })
            })
            .unwrap_or_default();

        Self {
            phase: state.phase,
            is_loading: state.is_loading,
            last_queried_city: state.last_queried_city.clone(),
            error: state.error.clone(),
            current,
            hourly,
            active_alerts,
            snapshot: snapshot.cloned(),
        }
    }
}
