use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

use super::models::{WeatherQuery, WeatherSnapshot};

/// Units are fixed; every temperature label assumes Celsius.
const UNITS: &str = "metric";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: Status Code {0}")]
    HttpStatus(u16),

    #[error("Failed to decode weather data: {0}")]
    Decode(String),

    #[error("Failed to fetch weather data: {0}")]
    Transport(reqwest::Error),
}

// reqwest embeds the request URL in its errors, and the URL carries the API key.
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }
}

/// Anything that can turn a `WeatherQuery` into a snapshot
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherSnapshot, FetchError>;
}

/// One Call API 3.0 client
pub struct WeatherClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl WeatherClient {
    pub fn new(client: Client, api_key: &str, endpoint: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Build the request URL. Contains the API key: never log the result.
    pub fn build_url(&self, query: &WeatherQuery) -> Result<Url, FetchError> {
        if !query.coordinate.is_finite() {
            return Err(FetchError::InvalidRequest(
                "coordinates must be finite numbers".to_string(),
            ));
        }

        Url::parse_with_params(
            &self.endpoint,
            &[
                ("lat", query.coordinate.latitude.to_string()),
                ("lon", query.coordinate.longitude.to_string()),
                ("exclude", query.exclude_param()),
                ("appid", self.api_key.clone()),
                ("units", UNITS.to_string()),
            ],
        )
        .map_err(|e| FetchError::InvalidRequest(e.to_string()))
    }

    fn decode(body: &str) -> Result<WeatherSnapshot, FetchError> {
        let snapshot: WeatherSnapshot =
            serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
        snapshot.validate().map_err(FetchError::Decode)?;
        Ok(snapshot)
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherSnapshot, FetchError> {
        let url = self.build_url(query)?;

        tracing::debug!(
            lat = %query.coordinate.latitude,
            lon = %query.coordinate.longitude,
            exclude = %query.exclude_param(),
            "Fetching One Call forecast"
        );

        let response = self.client.get(url).send().await?;

        let status = response.status();
        tracing::debug!(status = %status, "Received One Call API response");

        if status != StatusCode::OK {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        let snapshot = Self::decode(&body)?;

        tracing::debug!(
            timezone = %snapshot.timezone,
            temp = %snapshot.current.temp,
            hourly = snapshot.hourly.as_ref().map_or(0, Vec::len),
            "Decoded One Call forecast"
        );

        Ok(snapshot)
    }
}
