use std::sync::Arc;

use axum::http::StatusCode;
use dashmap::DashMap;
use thiserror::Error;
use tokio::task::JoinError;
use uuid::Uuid;

use crate::error::HttpError;
use crate::forecast::{ForecastController, ForecastError, ForecastPipeline};
use crate::impl_into_response;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Rejected(#[from] ForecastError),

    #[error("Forecast task failed: {0}")]
    Task(#[from] JoinError),
}

impl HttpError for SessionError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Rejected(e) => e.status_code(),
            Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::NotFound(_) => Some("SESSION_NOT_FOUND"),
            Self::Rejected(e) => e.error_code(),
            Self::Task(_) => Some("TASK_FAILED"),
        }
    }
}

impl_into_response!(SessionError);

/// In-memory view-state sessions, one controller each. Nothing is persisted.
pub struct SessionStore {
    pipeline: ForecastPipeline,
    sessions: DashMap<Uuid, Arc<ForecastController>>,
}

impl SessionStore {
    pub fn new(pipeline: ForecastPipeline) -> Self {
        Self {
            pipeline,
            sessions: DashMap::new(),
        }
    }

    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .insert(id, Arc::new(self.pipeline.controller()));
        tracing::debug!(session = %id, total = self.sessions.len(), "Session created");
        id
    }

    pub fn get(&self, id: Uuid) -> Result<Arc<ForecastController>, SessionError> {
        self.sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SessionError::NotFound(id))
    }

    pub fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        self.sessions
            .remove(&id)
            .map(|_| tracing::debug!(session = %id, "Session removed"))
            .ok_or(SessionError::NotFound(id))
    }
}
