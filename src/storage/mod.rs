mod errors;
mod json_ledger;

use std::collections::HashSet;

use crate::models::VehicleRecord;
use crate::types::RecordId;

pub use errors::LedgerError;
pub use json_ledger::JsonLedger;

/// Persistent record of which identities were submitted (a set) and which failed (a history log).
pub trait Ledger: Send + Sync + 'static {
    fn is_processed(&self, record_id: &RecordId) -> Result<bool, LedgerError>;
    fn processed_ids(&self) -> Result<HashSet<RecordId>, LedgerError>;
    /// Idempotent: marking an id that is already present leaves the ledger untouched.
    fn mark_processed(&self, record_id: &RecordId, record: &VehicleRecord) -> Result<(), LedgerError>;
    /// Always appends, even for ids that failed or succeeded before.
    fn mark_failed(&self, record_id: &RecordId, record: &VehicleRecord, message: &str) -> Result<(), LedgerError>;
}
