mod errors;
mod orchestrator;
mod status;
#[cfg(test)]
mod tests;

pub use errors::EngineError;
pub use orchestrator::BatchOrchestrator;
pub use status::compute_status;

use std::collections::HashSet;

use tracing::debug;

use crate::models::VehicleRecord;
use crate::types::RecordId;

/// Pairs each row with its identity, dropping ids already in `processed` and repeats of an id seen
/// earlier in the same load. File order is preserved and the first occurrence of an id wins.
pub(crate) fn filter_unprocessed(records: Vec<VehicleRecord>, processed: &HashSet<RecordId>) -> Vec<(RecordId, VehicleRecord)> {
    let mut seen = HashSet::new();
    let mut unprocessed = Vec::new();

    for record in records {
        let record_id = record.record_id();

        if processed.contains(&record_id) {
            continue;
        }

        if !seen.insert(record_id.clone()) {
            debug!("Dropping repeated row for record [{record_id}]");
            continue;
        }

        unprocessed.push((record_id, record));
    }

    unprocessed
}
