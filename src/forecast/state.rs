use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::error::HttpError;
use crate::geocoding::{validate_place_name, GeocodeError, Geocoder};
use crate::impl_into_response;
use crate::weather::{
    Coordinate, FetchError, ForecastSection, WeatherQuery, WeatherSnapshot, WeatherSource,
};

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("City name cannot be empty.")]
    InvalidInput,

    #[error("Could not find location for {0}.")]
    CityNotFound(String),

    #[error("Could not look up {city}: {reason}")]
    Geocoding { city: String, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Request for {0} was superseded by a newer request")]
    Superseded(String),
}

impl ForecastError {
    fn from_geocode(city: &str, err: GeocodeError) -> Self {
        match err {
            GeocodeError::InvalidInput => Self::InvalidInput,
            GeocodeError::NotFound(_) => Self::CityNotFound(city.to_string()),
            GeocodeError::Provider(reason) => Self::Geocoding {
                city: city.to_string(),
                reason,
            },
        }
    }
}

impl HttpError for ForecastError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::CityNotFound(_) => StatusCode::NOT_FOUND,
            Self::Geocoding { .. } | Self::Fetch(_) => StatusCode::BAD_GATEWAY,
            Self::Superseded(_) => StatusCode::CONFLICT,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidInput => Some("INVALID_INPUT"),
            Self::CityNotFound(_) => Some("CITY_NOT_FOUND"),
            Self::Geocoding { .. } => Some("GEOCODING_ERROR"),
            Self::Fetch(FetchError::InvalidRequest(_)) => Some("INVALID_REQUEST"),
            Self::Fetch(FetchError::HttpStatus(_)) => Some("UPSTREAM_STATUS"),
            Self::Fetch(FetchError::Decode(_)) => Some("INVALID_RESPONSE"),
            Self::Fetch(FetchError::Transport(_)) => Some("REQUEST_ERROR"),
            Self::Superseded(_) => Some("SUPERSEDED"),
        }
    }
}

impl_into_response!(ForecastError);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// What the UI renders. Replaced only through `ForecastController::apply`.
#[derive(Debug, Clone, Default)]
pub struct ForecastViewState {
    pub snapshot: Option<Arc<WeatherSnapshot>>,
    pub last_queried_city: String,
    pub is_loading: bool,
    pub error: Option<String>,
    pub phase: Phase,
    /// Generation of the request that owns the state
    pub generation: u64,
}

enum Mutation {
    Begin {
        generation: u64,
        city: String,
    },
    Succeed {
        generation: u64,
        snapshot: Arc<WeatherSnapshot>,
    },
    Fail {
        generation: u64,
        message: String,
    },
}

/// Runs geocode -> fetch for one UI session and owns its view-state.
///
/// Every submit takes a new generation; completions from older generations
/// are dropped, so a slow stale response never overwrites a fresher one.
pub struct ForecastController {
    geocoder: Arc<dyn Geocoder>,
    weather: Arc<dyn WeatherSource>,
    excluded_sections: BTreeSet<ForecastSection>,
    state: RwLock<ForecastViewState>,
    next_generation: AtomicU64,
}

impl ForecastController {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        weather: Arc<dyn WeatherSource>,
        excluded_sections: BTreeSet<ForecastSection>,
    ) -> Self {
        Self {
            geocoder,
            weather,
            excluded_sections,
            state: RwLock::new(ForecastViewState::default()),
            next_generation: AtomicU64::new(0),
        }
    }

    pub async fn state(&self) -> ForecastViewState {
        self.state.read().await.clone()
    }

    /// Geocode `city_name`, fetch its forecast and publish the outcome
    pub async fn submit_query(
        &self,
        city_name: &str,
    ) -> Result<Arc<WeatherSnapshot>, ForecastError> {
        validate_place_name(city_name).map_err(|_| ForecastError::InvalidInput)?;

        let generation = self.begin(city_name).await?;

        let outcome = match self.geocoder.resolve(city_name).await {
            Ok(coordinate) => self.fetch(coordinate).await,
            Err(e) => Err(ForecastError::from_geocode(city_name, e)),
        };

        self.finish(generation, city_name, outcome).await
    }

    /// Fetch the forecast for known coordinates, skipping geocoding
    pub async fn submit_coordinates(
        &self,
        coordinate: Coordinate,
    ) -> Result<Arc<WeatherSnapshot>, ForecastError> {
        let label = format!("{:.4}, {:.4}", coordinate.latitude, coordinate.longitude);

        let generation = self.begin(&label).await?;
        let outcome = self.fetch(coordinate).await;
        self.finish(generation, &label, outcome).await
    }

    async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, ForecastError> {
        let query =
            WeatherQuery::new(coordinate).excluding(self.excluded_sections.iter().copied());
        Ok(self.weather.fetch(&query).await?)
    }

    async fn begin(&self, city: &str) -> Result<u64, ForecastError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(city = %city, generation, "Starting forecast request");

        if self
            .apply(Mutation::Begin {
                generation,
                city: city.to_string(),
            })
            .await
        {
            Ok(generation)
        } else {
            Err(ForecastError::Superseded(city.to_string()))
        }
    }

    async fn finish(
        &self,
        generation: u64,
        city: &str,
        outcome: Result<WeatherSnapshot, ForecastError>,
    ) -> Result<Arc<WeatherSnapshot>, ForecastError> {
        match outcome {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let applied = self
                    .apply(Mutation::Succeed {
                        generation,
                        snapshot: Arc::clone(&snapshot),
                    })
                    .await;

                if !applied {
                    return Err(ForecastError::Superseded(city.to_string()));
                }

                tracing::info!(
                    city = %city,
                    temp = %snapshot.current.temp,
                    "Forecast published"
                );
                Ok(snapshot)
            }
            Err(e) => {
                let applied = self
                    .apply(Mutation::Fail {
                        generation,
                        message: e.to_string(),
                    })
                    .await;

                if !applied {
                    return Err(ForecastError::Superseded(city.to_string()));
                }

                tracing::warn!(city = %city, error = %e, "Forecast request failed");
                Err(e)
            }
        }
    }

    /// Single mutation entry point. Returns false when the mutation belongs to
    /// a superseded generation and was discarded.
    async fn apply(&self, mutation: Mutation) -> bool {
        let mut state = self.state.write().await;

        match mutation {
            Mutation::Begin { generation, city } => {
                if generation <= state.generation {
                    return false;
                }
                state.generation = generation;
                state.last_queried_city = city;
                state.is_loading = true;
                state.phase = Phase::Loading;
            }
            Mutation::Succeed {
                generation,
                snapshot,
            } => {
                if generation != state.generation {
                    tracing::debug!(generation, current = state.generation, "Dropping stale forecast");
                    return false;
                }
                state.snapshot = Some(snapshot);
                state.error = None;
                state.is_loading = false;
                state.phase = Phase::Ready;
            }
            Mutation::Fail {
                generation,
                message,
            } => {
                if generation != state.generation {
                    tracing::debug!(generation, current = state.generation, "Dropping stale failure");
                    return false;
                }
                state.error = Some(message);
                state.is_loading = false;
                state.phase = Phase::Failed;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::models::fixtures::onecall_body;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    const SLOW_LAT: f64 = 1.0;

    struct StubGeocoder {
        known: HashMap<&'static str, Coordinate>,
        provider_down: bool,
        calls: AtomicUsize,
    }

    impl StubGeocoder {
        fn new() -> Self {
            Self {
                known: HashMap::from([
                    ("Toronto", Coordinate::new(43.65, -79.38)),
                    ("Slowtown", Coordinate::new(SLOW_LAT, 1.0)),
                    ("Fasttown", Coordinate::new(2.0, 2.0)),
                ]),
                provider_down: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn resolve(&self, place_name: &str) -> Result<Coordinate, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.provider_down {
                return Err(GeocodeError::Provider("network unreachable".to_string()));
            }
            self.known
                .get(place_name)
                .copied()
                .ok_or_else(|| GeocodeError::NotFound(place_name.to_string()))
        }
    }

    /// Returns a snapshot whose current temperature equals the latitude
    #[derive(Default)]
    struct StubWeather {
        status: Mutex<Option<u16>>,
        gate: Option<Arc<Notify>>,
        last_query: Mutex<Option<WeatherQuery>>,
    }

    #[async_trait]
    impl WeatherSource for StubWeather {
        async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherSnapshot, FetchError> {
            *self.last_query.lock().unwrap() = Some(query.clone());

            if let Some(gate) = &self.gate {
                if query.coordinate.latitude == SLOW_LAT {
                    gate.notified().await;
                }
            }

            if let Some(code) = *self.status.lock().unwrap() {
                return Err(FetchError::HttpStatus(code));
            }

            let body = onecall_body(1_700_000_000, query.coordinate.latitude, 12);
            Ok(serde_json::from_value(body).unwrap())
        }
    }

    fn controller(geocoder: Arc<StubGeocoder>, weather: Arc<StubWeather>) -> ForecastController {
        ForecastController::new(
            geocoder,
            weather,
            BTreeSet::from([ForecastSection::Minutely]),
        )
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let c = controller(Arc::new(StubGeocoder::new()), Arc::new(StubWeather::default()));
        let state = c.state().await;

        assert_eq!(state.phase, Phase::Idle);
        assert!(!state.is_loading);
        assert!(state.snapshot.is_none());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_without_state_change() {
        let geocoder = Arc::new(StubGeocoder::new());
        let c = controller(Arc::clone(&geocoder), Arc::new(StubWeather::default()));

        for input in ["", "   "] {
            let err = c.submit_query(input).await.unwrap_err();
            assert!(matches!(err, ForecastError::InvalidInput));
        }

        let state = c.state().await;
        assert!(!state.is_loading);
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.generation, 0);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_query_publishes_snapshot() {
        let weather = Arc::new(StubWeather::default());
        let c = controller(Arc::new(StubGeocoder::new()), Arc::clone(&weather));

        let snapshot = c.submit_query("Toronto").await.unwrap();
        assert_eq!(snapshot.current.temp, 43.65);

        let state = c.state().await;
        assert_eq!(state.phase, Phase::Ready);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert_eq!(state.last_queried_city, "Toronto");
        assert_eq!(state.snapshot.unwrap().current.temp, 43.65);

        let query = weather.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.exclude_param(), "minutely");
    }

    #[tokio::test]
    async fn test_unknown_city_fails_with_city_in_message() {
        let c = controller(Arc::new(StubGeocoder::new()), Arc::new(StubWeather::default()));

        let err = c.submit_query("Zzzzzxxqq").await.unwrap_err();
        assert!(matches!(err, ForecastError::CityNotFound(_)));

        let state = c.state().await;
        assert_eq!(state.phase, Phase::Failed);
        assert!(!state.is_loading);
        assert!(state.error.unwrap().contains("Zzzzzxxqq"));
    }

    #[tokio::test]
    async fn test_geocoding_provider_error_names_city() {
        let mut geocoder = StubGeocoder::new();
        geocoder.provider_down = true;
        let c = controller(Arc::new(geocoder), Arc::new(StubWeather::default()));

        let err = c.submit_query("Toronto").await.unwrap_err();
        assert!(matches!(err, ForecastError::Geocoding { .. }));
        assert!(c.state().await.error.unwrap().contains("Toronto"));
    }

    #[tokio::test]
    async fn test_http_401_reflected_in_error() {
        let weather = Arc::new(StubWeather::default());
        *weather.status.lock().unwrap() = Some(401);
        let c = controller(Arc::new(StubGeocoder::new()), weather);

        let err = c.submit_query("Toronto").await.unwrap_err();
        assert!(matches!(err, ForecastError::Fetch(FetchError::HttpStatus(401))));

        let state = c.state().await;
        assert_eq!(state.phase, Phase::Failed);
        assert!(!state.is_loading);
        assert!(state.error.unwrap().contains("401"));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_snapshot_and_success_clears_error() {
        let weather = Arc::new(StubWeather::default());
        let c = controller(Arc::new(StubGeocoder::new()), Arc::clone(&weather));

        c.submit_query("Toronto").await.unwrap();
        c.submit_query("Zzzzzxxqq").await.unwrap_err();

        let state = c.state().await;
        assert_eq!(state.phase, Phase::Failed);
        assert!(state.error.is_some());
        assert_eq!(state.snapshot.unwrap().current.temp, 43.65);

        c.submit_query("Fasttown").await.unwrap();
        let state = c.state().await;
        assert_eq!(state.phase, Phase::Ready);
        assert!(state.error.is_none());
        assert_eq!(state.snapshot.unwrap().current.temp, 2.0);
    }

    #[tokio::test]
    async fn test_submit_coordinates_skips_geocoding() {
        let geocoder = Arc::new(StubGeocoder::new());
        let c = controller(Arc::clone(&geocoder), Arc::new(StubWeather::default()));

        let snapshot = c.submit_coordinates(Coordinate::new(51.5074, -0.1278)).await.unwrap();
        assert_eq!(snapshot.current.temp, 51.5074);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(c.state().await.last_queried_city, "51.5074, -0.1278");
    }

    #[tokio::test]
    async fn test_stale_response_cannot_overwrite_newer_one() {
        let gate = Arc::new(Notify::new());
        let weather = Arc::new(StubWeather {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        });
        let c = Arc::new(controller(Arc::new(StubGeocoder::new()), weather));

        let slow_controller = Arc::clone(&c);
        let slow = tokio::spawn(async move { slow_controller.submit_query("Slowtown").await });

        while c.state().await.generation == 0 {
            tokio::task::yield_now().await;
        }
        let pending = c.state().await;
        assert!(pending.is_loading);
        assert_eq!(pending.phase, Phase::Loading);

        let fresh = c.submit_query("Fasttown").await.unwrap();
        assert_eq!(fresh.current.temp, 2.0);

        gate.notify_one();
        let stale = slow.await.unwrap();
        assert!(matches!(stale, Err(ForecastError::Superseded(_))));

        let state = c.state().await;
        assert_eq!(state.phase, Phase::Ready);
        assert!(!state.is_loading);
        assert_eq!(state.last_queried_city, "Fasttown");
        assert_eq!(state.snapshot.unwrap().current.temp, 2.0);
    }

    #[tokio::test]
    async fn test_stale_failure_is_dropped() {
        let c = controller(Arc::new(StubGeocoder::new()), Arc::new(StubWeather::default()));

        let first = c.begin("Slowtown").await.unwrap();
        let second = c.begin("Fasttown").await.unwrap();
        assert!(second > first);

        let stale = c
            .finish(
                first,
                "Slowtown",
                Err(ForecastError::Fetch(FetchError::HttpStatus(500))),
            )
            .await;
        assert!(matches!(stale, Err(ForecastError::Superseded(_))));

        let state = c.state().await;
        assert_eq!(state.phase, Phase::Loading);
        assert!(state.is_loading);
        assert!(state.error.is_none());
        assert_eq!(state.generation, second);
        assert_eq!(state.last_queried_city, "Fasttown");
    }

    #[tokio::test]
    async fn test_late_begin_is_rejected() {
        let c = controller(Arc::new(StubGeocoder::new()), Arc::new(StubWeather::default()));
        c.submit_query("Toronto").await.unwrap();
        let current = c.state().await.generation;

        for generation in [current, current - 1] {
            let applied = c
                .apply(Mutation::Begin {
                    generation,
                    city: "Fasttown".to_string(),
                })
                .await;
            assert!(!applied);
        }

        let state = c.state().await;
        assert_eq!(state.phase, Phase::Ready);
        assert!(!state.is_loading);
        assert_eq!(state.last_queried_city, "Toronto");
        assert_eq!(state.generation, current);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ForecastError::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ForecastError::CityNotFound("X".into()).error_code(),
            Some("CITY_NOT_FOUND")
        );
        assert_eq!(
            ForecastError::Fetch(FetchError::HttpStatus(401)).error_code(),
            Some("UPSTREAM_STATUS")
        );
    }
}
