use thiserror::Error;
use tokio::task::JoinError;

use crate::source::DataSourceError;
use crate::storage::LedgerError;

/// Conditions that stop a run before any record is submitted, or a ledger update during one.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Background task failed: {0}")]
    Background(#[from] JoinError)
}
