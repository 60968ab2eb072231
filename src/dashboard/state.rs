use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::client::{HttpTransport, RemoteSubmitter, Transport, TransportSetupError};
use crate::config::Settings;
use crate::engine::BatchOrchestrator;
use crate::storage::JsonLedger;

/// Shared by all handlers. Services are built once at startup and passed in explicitly.
pub struct AppState<T: Transport> {
    settings: Arc<Settings>,
    ledger: Arc<JsonLedger>,
    submitter: Option<Arc<RemoteSubmitter<T>>>,
    pub(crate) run_guard: Arc<Mutex<()>>
}

impl<T: Transport> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            settings: self.settings.clone(),
            ledger: self.ledger.clone(),
            submitter: self.submitter.clone(),
            run_guard: self.run_guard.clone()
        }
    }
}

impl<T: Transport> AppState<T> {
    /// `submitter` is `None` when no API token is configured; runs and probes are then refused.
    pub fn new(settings: Settings, submitter: Option<RemoteSubmitter<T>>) -> Self {
        Self {
            ledger: Arc::new(settings.ledger()),
            settings: Arc::new(settings),
            submitter: submitter.map(Arc::new),
            run_guard: Arc::new(Mutex::new(()))
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ledger(&self) -> Arc<JsonLedger> {
        self.ledger.clone()
    }

    pub fn submitter(&self) -> Option<&RemoteSubmitter<T>> {
        self.submitter.as_deref()
    }

    pub fn orchestrator(&self) -> Option<BatchOrchestrator<JsonLedger, T>> {
        self.submitter.as_ref()
            .map(|submitter| BatchOrchestrator::configured(&self.settings, self.ledger.clone(), submitter.clone()))
    }
}

impl AppState<HttpTransport> {
    pub fn from_settings(settings: Settings) -> Result<Self, TransportSetupError> {
        let submitter = match HttpTransport::from_settings(&settings) {
            Ok(transport) => Some(RemoteSubmitter::new(transport, settings.retry_policy())),
            Err(TransportSetupError::MissingToken) => {
                warn!("API token is not configured; processing is disabled");
                None
            }
            Err(error) => return Err(error)
        };

        Ok(Self::new(settings, submitter))
    }
}
