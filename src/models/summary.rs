use serde::Serialize;

use crate::models::round_two_places;
use crate::types::RecordId;

/// Terminal classification of one record within a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Succeeded,
    /// The remote side already holds the record.
    Duplicate,
    Failed(String)
}

/// Counters for one batch. Failed records contribute a descriptive line to `errors`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub processed_successfully: usize,
    pub failed_records: usize,
    pub skipped_duplicates: usize,
    pub errors: Vec<String>
}

impl BatchSummary {
    pub fn record(&mut self, record_id: &RecordId, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Succeeded => self.processed_successfully += 1,
            RecordOutcome::Duplicate => self.skipped_duplicates += 1,
            RecordOutcome::Failed(message) => {
                self.failed_records += 1;
                self.errors.push(format!("Error processing {record_id}: {message}"));
            }
        }
    }
}

/// Aggregate returned to the caller of a run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Number of unprocessed records picked up by the run.
    pub total_records: usize,
    pub processed_successfully: usize,
    pub failed_records: usize,
    pub skipped_duplicates: usize,
    pub errors: Vec<String>,
    /// Wall clock time of the run, rounded to two decimals.
    pub processing_time_seconds: f64
}

impl RunSummary {
    pub fn new(total_records: usize) -> Self {
        Self {
            total_records,
            ..Self::default()
        }
    }

    pub fn absorb(&mut self, batch: BatchSummary) {
        self.processed_successfully += batch.processed_successfully;
        self.failed_records += batch.failed_records;
        self.skipped_duplicates += batch.skipped_duplicates;
        self.errors.extend(batch.errors);
    }

    pub fn finish(&mut self, elapsed_seconds: f64) {
        self.processing_time_seconds = round_two_places(elapsed_seconds);
    }
}
