use std::sync::Arc;
use std::time::Duration;

use tokio::task::spawn_blocking;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::client::{RemoteSubmitter, SubmitOutcome, Transport};
use crate::config::Settings;
use crate::engine::{filter_unprocessed, EngineError};
use crate::models::{BatchSummary, RecordOutcome, RunSummary, VehicleRecord};
use crate::source::CsvSource;
use crate::storage::{Ledger, LedgerError};
use crate::types::RecordId;

const DUPLICATE_MARKERS: [&str; 3] = ["duplicate", "conflict", "409"];

/// Drives one-way synchronization of CSV rows to the remote API.
///
/// Batches and the records inside them are processed strictly one after another. Pauses separate
/// consecutive batches and consecutive records, never trailing the last one.
pub struct BatchOrchestrator<L: Ledger, T: Transport> {
    source: CsvSource,
    ledger: Arc<L>,
    submitter: Arc<RemoteSubmitter<T>>,
    batch_size: usize,
    batch_pause: Duration,
    record_pause: Duration
}

impl<L: Ledger, T: Transport> BatchOrchestrator<L, T> {
    pub fn new(source: CsvSource, ledger: Arc<L>, submitter: Arc<RemoteSubmitter<T>>) -> Self {
        Self {
            source,
            ledger,
            submitter,
            batch_size: 10,
            batch_pause: Duration::from_secs(1),
            record_pause: Duration::from_millis(100)
        }
    }

    /// Orchestrator over the configured CSV with the configured batch size and pacing.
    pub fn configured(settings: &Settings, ledger: Arc<L>, submitter: Arc<RemoteSubmitter<T>>) -> Self {
        Self::new(settings.source(), ledger, submitter)
            .with_batch_size(settings.batch_size)
            .with_batch_pause(settings.batch_pause)
            .with_record_pause(settings.record_pause)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_batch_pause(mut self, batch_pause: Duration) -> Self {
        self.batch_pause = batch_pause;
        self
    }

    pub fn with_record_pause(mut self, record_pause: Duration) -> Self {
        self.record_pause = record_pause;
        self
    }

    /// CSV rows whose identity is not yet in the processed ledger, in file order.
    ///
    /// # Errors
    /// Returns `EngineError` if the CSV cannot be loaded or the processed ledger cannot be read.
    pub async fn load_unprocessed(&self) -> Result<Vec<(RecordId, VehicleRecord)>, EngineError> {
        let source = self.source.clone();
        let ledger = self.ledger.clone();

        //NOTE: CSV parsing and ledger reads are blocking file I/O, so they run on the blocking pool
        let unprocessed = spawn_blocking(move || -> Result<Vec<(RecordId, VehicleRecord)>, EngineError> {
            let records = source.load()?;
            let processed = ledger.processed_ids()?;
            Ok(filter_unprocessed(records, &processed))
        }).await??;

        info!("Unprocessed records: {}", unprocessed.len());

        Ok(unprocessed)
    }

    /// Submits every unprocessed record once and reports the aggregate.
    ///
    /// Per-record failures are recorded in the summary and the failed ledger; they never stop the run.
    ///
    /// # Errors
    /// Only loading failures abort, before anything is submitted.
    pub async fn run_all(&self) -> Result<RunSummary, EngineError> {
        info!("Starting vehicle processing");

        let started = Instant::now();
        let unprocessed = self.load_unprocessed().await?;
        let mut summary = RunSummary::new(unprocessed.len());

        if unprocessed.is_empty() {
            info!("No new records to process");
            summary.finish(started.elapsed().as_secs_f64());
            return Ok(summary);
        }

        let total_batches = unprocessed.len().div_ceil(self.batch_size);

        info!("Processing {} records in batches of {}", unprocessed.len(), self.batch_size);

        for (index, batch) in unprocessed.chunks(self.batch_size).enumerate() {
            info!("Processing batch {}/{} ({} records)", index + 1, total_batches, batch.len());

            summary.absorb(self.process_batch(batch).await);

            if index + 1 < total_batches {
                pause(self.batch_pause).await;
            }
        }

        summary.finish(started.elapsed().as_secs_f64());

        info!("Processing finished in {} seconds", summary.processing_time_seconds);
        info!(
            "Succeeded: {}, Failed: {}, Duplicates: {}",
            summary.processed_successfully,
            summary.failed_records,
            summary.skipped_duplicates
        );

        Ok(summary)
    }

    async fn process_batch(&self, batch: &[(RecordId, VehicleRecord)]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for (position, (record_id, record)) in batch.iter().enumerate() {
            let outcome = self.process_record(record_id, record).await;
            summary.record(record_id, outcome);

            if position + 1 < batch.len() {
                pause(self.record_pause).await;
            }
        }

        summary
    }

    async fn process_record(&self, record_id: &RecordId, record: &VehicleRecord) -> RecordOutcome {
        if self.marked_elsewhere(record_id).await {
            warn!("Record [{record_id}] was marked processed by another run, skipping");
            return RecordOutcome::Duplicate;
        }

        let wire = match self.submitter.format(record) {
            Ok(wire) => wire,
            Err(format_error) => {
                let message = format_error.to_string();
                error!("Error processing {record_id}: {message}");
                self.record_failure(record_id, record, &message).await;
                return RecordOutcome::Failed(message);
            }
        };

        let outcome = self.submitter.submit(&wire).await;

        if outcome.is_success() {
            debug!("Record [{record_id}] processed successfully");
            self.record_success(record_id, record).await;
            return RecordOutcome::Succeeded;
        }

        if is_duplicate_signal(&outcome) {
            warn!("Record [{record_id}] already exists remotely (duplicate)");
            self.record_success(record_id, record).await;
            return RecordOutcome::Duplicate;
        }

        let message = outcome.to_string();
        error!("Error processing {record_id}: {message}");
        self.record_failure(record_id, record, &message).await;

        RecordOutcome::Failed(message)
    }

    /// Whether the ledger gained this id after the run loaded its work, e.g. from a concurrent CLI run.
    /// An unreadable ledger answers no, so the record is still submitted.
    async fn marked_elsewhere(&self, record_id: &RecordId) -> bool {
        let id = record_id.clone();

        match self.on_ledger(move |ledger| ledger.is_processed(&id)).await {
            Ok(processed) => processed,
            Err(engine_error) => {
                warn!("{engine_error}; submitting record [{record_id}] without a ledger check");
                false
            }
        }
    }

    async fn record_success(&self, record_id: &RecordId, record: &VehicleRecord) {
        let (id, data) = (record_id.clone(), record.clone());

        if let Err(engine_error) = self.on_ledger(move |ledger| ledger.mark_processed(&id, &data)).await {
            //NOTE: The record stays pending in the ledger and will be submitted again next run
            error!("{engine_error}; record [{record_id}] was not marked processed");
        }
    }

    async fn record_failure(&self, record_id: &RecordId, record: &VehicleRecord, message: &str) {
        let (id, data, message) = (record_id.clone(), record.clone(), message.to_string());

        if let Err(engine_error) = self.on_ledger(move |ledger| ledger.mark_failed(&id, &data, &message)).await {
            error!("{engine_error}; failure of record [{record_id}] was not logged");
        }
    }

    /// Runs one ledger operation on the blocking pool.
    async fn on_ledger<R, F>(&self, operation: F) -> Result<R, EngineError>
    where
        R: Send + 'static,
        F: FnOnce(&L) -> Result<R, LedgerError> + Send + 'static
    {
        let ledger = self.ledger.clone();

        Ok(spawn_blocking(move || operation(ledger.as_ref())).await??)
    }
}

/// Whether a submission outcome means the record already exists remotely. Only an answer from the
/// remote API can say so; transport failures never do.
pub(crate) fn is_duplicate_signal(outcome: &SubmitOutcome) -> bool {
    match outcome {
        SubmitOutcome::Success(_) | SubmitOutcome::TransportError(_) => false,
        SubmitOutcome::Duplicate(_) => true,
        other => {
            let message = other.to_string().to_lowercase();
            DUPLICATE_MARKERS.iter().any(|marker| message.contains(marker))
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}
