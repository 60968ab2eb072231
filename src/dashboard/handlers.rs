use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio::task::spawn_blocking;
use tracing::{error, info};

use crate::client::Transport;
use crate::dashboard::connection::check_connection;
use crate::dashboard::logs::tail_lines;
use crate::dashboard::{AppState, DashboardError, LOG_TAIL_LINES};
use crate::engine::compute_status;
use crate::models::{ProcessingStatus, RunSummary};

pub async fn index() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

pub async fn status<T: Transport>(State(state): State<AppState<T>>) -> Json<ProcessingStatus> {
    let source = state.settings().source();
    let ledger = state.ledger();

    let status = spawn_blocking(move || compute_status(&source, ledger.as_ref()))
        .await
        .unwrap_or_else(|error| ProcessingStatus::failed(error.to_string()));

    Json(status)
}

pub async fn process<T: Transport>(State(state): State<AppState<T>>) -> Result<Json<RunSummary>, DashboardError> {
    let _guard = state.run_guard.try_lock().map_err(|_| DashboardError::RunInProgress)?;
    let orchestrator = state.orchestrator().ok_or(DashboardError::MissingToken)?;

    info!("Starting vehicle processing from dashboard");

    let summary = orchestrator.run_all().await?;

    Ok(Json(summary))
}

pub async fn logs<T: Transport>(State(state): State<AppState<T>>) -> Response {
    let path = state.settings().log_file.clone();

    let lines = spawn_blocking(move || tail_lines(&path, LOG_TAIL_LINES))
        .await
        .map_err(|error| DashboardError::Internal(error.to_string()));

    match lines {
        Ok(Ok(lines)) => Json(json!({ "logs": lines })).into_response(),
        Ok(Err(read_error)) => {
            error!("Error loading logs: {read_error}");
            Json(json!({ "logs": [format!("Error loading logs: {read_error}")] })).into_response()
        }
        Err(dashboard_error) => dashboard_error.into_response()
    }
}

pub async fn test_connection<T: Transport>(State(state): State<AppState<T>>) -> Response {
    let report = check_connection(state.submitter()).await;
    let status = if report.connection_test { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };

    (status, Json(report)).into_response()
}
