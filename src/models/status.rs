use serde::Serialize;

use crate::models::round_two_places;

/// Progress snapshot served to the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingStatus {
    /// Valid rows in the current CSV.
    pub total_records: usize,
    /// Ids held by the processed ledger, including ids no longer present in the CSV.
    pub processed_records: usize,
    pub pending_records: usize,
    pub completion_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>
}

impl ProcessingStatus {
    pub fn from_counts(total_records: usize, processed_records: usize, pending_records: usize) -> Self {
        let completion_percentage = if total_records > 0 {
            round_two_places(processed_records as f64 / total_records as f64 * 100.0)
        } else {
            0.0
        };

        Self {
            total_records,
            processed_records,
            pending_records,
            completion_percentage,
            error: None
        }
    }

    /// Zeroed snapshot carrying the failure message instead of propagating it.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}
