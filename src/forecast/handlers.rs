use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::models::{CityQueryRequest, CoordinatesRequest, ViewStateResponse};
use super::ForecastError;
use crate::sessions::SessionError;
use crate::weather::Coordinate;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionCreated {
    pub id: Uuid,
}

/// Create a new forecast session
///
/// POST /api/v1/sessions
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionCreated>) {
    let id = state.sessions.create();
    (StatusCode::CREATED, Json(SessionCreated { id }))
}

/// Current view-state of a session
///
/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewStateResponse>, SessionError> {
    let controller = state.sessions.get(id)?;
    let view = controller.state().await;
    Ok(Json(ViewStateResponse::from(&view)))
}

/// DELETE /api/v1/sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, SessionError> {
    state.sessions.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Search by city name
///
/// POST /api/v1/sessions/{id}/query {"city": "Toronto"}
///
/// Pipeline failures are part of the view-state (phase `failed`), so only
/// rejected input turns into an error status.
pub async fn submit_query(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CityQueryRequest>,
) -> Result<Json<ViewStateResponse>, SessionError> {
    let controller = state.sessions.get(id)?;

    // Detached so the view-state leaves Loading even if this request is dropped
    let task = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit_query(&request.city).await })
    };

    match task.await? {
        Err(ForecastError::InvalidInput) => Err(ForecastError::InvalidInput.into()),
        _ => {
            let view = controller.state().await;
            Ok(Json(ViewStateResponse::from(&view)))
        }
    }
}

/// Search by coordinates
///
/// POST /api/v1/sessions/{id}/coordinates {"lat": 43.65, "lon": -79.38}
pub async fn submit_coordinates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CoordinatesRequest>,
) -> Result<Json<ViewStateResponse>, SessionError> {
    let controller = state.sessions.get(id)?;
    let coordinate = Coordinate::new(request.lat, request.lon);

    let task = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit_coordinates(coordinate).await })
    };

    // Failures are recorded in the view-state
    let _ = task.await?;

    let view = controller.state().await;
    Ok(Json(ViewStateResponse::from(&view)))
}
