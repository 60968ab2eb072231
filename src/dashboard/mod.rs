//! Minimal web dashboard for triggering and observing synchronization runs.
//!
//! - `GET /` - HTML page driving the JSON endpoints
//! - `GET /api/status` - progress of the CSV against the processed ledger
//! - `POST /api/process` - runs a full synchronization and returns its summary (blocks for the whole run)
//! - `GET /api/logs` - tail of the log file
//! - `GET /api/test-connection` - probes the remote API with a synthetic record

mod connection;
mod errors;
mod handlers;
mod logs;
mod state;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::client::Transport;

pub use connection::{check_connection, ConnectionReport};
pub use errors::DashboardError;
pub use state::AppState;

pub const LOG_TAIL_LINES: usize = 50;

pub fn router<T: Transport>(state: AppState<T>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::status::<T>))
        .route("/api/process", post(handlers::process::<T>))
        .route("/api/logs", get(handlers::logs::<T>))
        .route("/api/test-connection", get(handlers::test_connection::<T>))
        .with_state(state)
}

/// Serves the dashboard until Ctrl+C or SIGTERM.
pub async fn serve<T: Transport>(state: AppState<T>) -> anyhow::Result<()> {
    let address = state.settings().bind_address;
    let listener = TcpListener::bind(address)
        .await
        .map_err(|error| anyhow::anyhow!("Failed to bind dashboard to {address}: {error}"))?;

    info!("Dashboard listening on http://{address}/");
    info!("API token configured: {}", state.settings().token_configured());
    info!("CSV file: {}", state.settings().csv_path.display());

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| anyhow::anyhow!("Dashboard server error: {error}"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!("Failed to listen for SIGTERM: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {}
    }

    info!("Shutting down dashboard");
}
