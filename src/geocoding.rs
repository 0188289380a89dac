use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::weather::Coordinate;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("Place name cannot be empty")]
    InvalidInput,

    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Geocoding failed: {0}")]
    Provider(String),
}

/// Resolves free-text place names to coordinates.
///
/// Implementations perform exactly one lookup per call and leave matching
/// (case, locale, abbreviations) to the underlying provider.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, place_name: &str) -> Result<Coordinate, GeocodeError>;
}

/// Rejects empty and whitespace-only names; anything else passes through untouched
pub fn validate_place_name(place_name: &str) -> Result<&str, GeocodeError> {
    if place_name.trim().is_empty() {
        Err(GeocodeError::InvalidInput)
    } else {
        Ok(place_name)
    }
}

#[derive(Debug, Deserialize)]
struct GeoLocation {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: Option<String>,
}

/// OpenWeatherMap direct geocoding
pub struct OpenWeatherGeocoder {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl OpenWeatherGeocoder {
    pub fn new(client: Client, api_key: &str, endpoint: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for OpenWeatherGeocoder {
    async fn resolve(&self, place_name: &str) -> Result<Coordinate, GeocodeError> {
        let place_name = validate_place_name(place_name)?;

        tracing::debug!(city = %place_name, "Geocoding city");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", place_name), ("limit", "1"), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeError::Provider(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Provider(format!("HTTP {}", status)));
        }

        let locations: Vec<GeoLocation> = response
            .json()
            .await
            .map_err(|e| GeocodeError::Provider(e.without_url().to_string()))?;

        let location = locations
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(place_name.to_string()))?;

        tracing::debug!(
            city = %location.name,
            country = ?location.country,
            lat = %location.lat,
            lon = %location.lon,
            "Resolved location"
        );

        Ok(Coordinate::new(location.lat, location.lon))
    }
}
