use tracing::error;

use crate::engine::{filter_unprocessed, EngineError};
use crate::models::ProcessingStatus;
use crate::source::CsvSource;
use crate::storage::Ledger;

/// Progress of the CSV against the processed ledger.
///
/// Pending is recomputed by filtering the CSV, so it can differ from `total - processed` when the ledger
/// holds ids that are no longer in the file. Failures are reported inside the status, never returned.
pub fn compute_status<L: Ledger + ?Sized>(source: &CsvSource, ledger: &L) -> ProcessingStatus {
    match try_compute_status(source, ledger) {
        Ok(status) => status,
        Err(engine_error) => {
            error!("Error computing status: {engine_error}");
            ProcessingStatus::failed(engine_error.to_string())
        }
    }
}

fn try_compute_status<L: Ledger + ?Sized>(source: &CsvSource, ledger: &L) -> Result<ProcessingStatus, EngineError> {
    let records = source.load()?;
    let processed = ledger.processed_ids()?;
    let total = records.len();
    let pending = filter_unprocessed(records, &processed).len();

    Ok(ProcessingStatus::from_counts(total, processed.len(), pending))
}
