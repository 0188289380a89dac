mod config;
mod error;
mod forecast;
mod geocoding;
mod openapi;
mod routes;
mod sessions;
mod weather;
mod widget;

use axum::{error_handling::HandleErrorLayer, http::StatusCode, BoxError, Router};
use reqwest::Client;
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AppConfig, HttpClientConfig};
use crate::forecast::ForecastPipeline;
use crate::geocoding::OpenWeatherGeocoder;
use crate::sessions::SessionStore;
use crate::weather::WeatherClient;
use crate::widget::WidgetTimelineProvider;

const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionStore>,
    pub widget: Arc<WidgetTimelineProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: ForecastPipeline) -> Self {
        let widget = WidgetTimelineProvider::new(pipeline.clone(), config.widget.max_entries);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionStore::new(pipeline)),
            widget: Arc::new(widget),
        }
    }
}

/// Create shared HTTP client with connection pooling
fn create_http_client(http: &HttpClientConfig) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs))
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .pool_max_idle_per_host(10)
        .build()
}

/// Wire the OpenWeatherMap geocoder and One Call client into a pipeline
fn build_pipeline(config: &AppConfig, client: Client) -> ForecastPipeline {
    let geocoder = OpenWeatherGeocoder::new(
        client.clone(),
        &config.openweathermap_api_key,
        &config.geocoding_url,
    );
    let weather = WeatherClient::new(client, &config.openweathermap_api_key, &config.onecall_url);

    ForecastPipeline::new(
        Arc::new(geocoder),
        Arc::new(weather),
        config.excluded_sections.clone(),
    )
}

/// Handle request timeout errors
async fn handle_timeout_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", err),
        )
    }
}

fn build_app(state: AppState) -> Router {
    routes::build_router()
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hourcast=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!(
        default_city = %config.default_city,
        excluded = ?config.excluded_sections,
        "Configuration loaded successfully"
    );

    let http_client = create_http_client(&config.http)?;
    tracing::debug!("Shared HTTP client created");

    let pipeline = build_pipeline(&config, http_client);
    let addr = format!("{}:{}", config.host, config.port);
    let app = build_app(AppState::new(config, pipeline));

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
