use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::forecast::handlers as forecast_handlers;
use crate::openapi::swagger_ui;
use crate::widget::handlers as widget_handlers;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the forecast session routes
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(forecast_handlers::create_session))
        .route(
            "/sessions/{id}",
            get(forecast_handlers::get_session).delete(forecast_handlers::delete_session),
        )
        .route(
            "/sessions/{id}/query",
            post(forecast_handlers::submit_query),
        )
        .route(
            "/sessions/{id}/coordinates",
            post(forecast_handlers::submit_coordinates),
        )
}

/// Build the widget timeline routes
fn widget_routes() -> Router<AppState> {
    Router::new()
        .route("/widget/timeline", get(widget_handlers::get_timeline))
        .route("/widget/placeholder", get(widget_handlers::get_placeholder))
}

/// Build all API v1 routes
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(session_routes())
        .merge(widget_routes())
}

/// Build the complete application router
pub fn build_router() -> Router<AppState> {
    Router::new()
        // Health check at root level
        .route("/", get(health))
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes())
        // Swagger UI for API documentation
        .merge(swagger_ui())
}
