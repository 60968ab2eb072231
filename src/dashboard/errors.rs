use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("A run is already in progress")]
    RunInProgress,
    #[error("API token is not configured")]
    MissingToken,
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Internal error: {0}")]
    Internal(String)
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match self {
            DashboardError::RunInProgress => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR
        };

        error!("Dashboard request failed: {self}");

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
