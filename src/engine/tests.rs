use super::orchestrator::is_duplicate_signal;
use super::{compute_status, BatchOrchestrator, EngineError};

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::Instant;

use crate::client::testing::ScriptedTransport;
use crate::client::{HttpReply, HttpTransport, RemoteSubmitter, RetryPolicy, SubmitOutcome, Transport, TransportError};
use crate::models::{VehicleRecord, WireRecord};
use crate::source::{CsvSource, DataSourceError};
use crate::storage::{JsonLedger, Ledger};
use crate::types::RecordId;

const HEADER: &str = "IdVehicleType,Brand,Model,TheoricalConsumption,IdCompany,IdFuelMaster,VolumeLimit";

struct Fixture {
    directory: TempDir,
    csv_path: PathBuf
}

impl Fixture {
    fn new(rows: &[String]) -> Result<Self> {
        let directory = TempDir::new()?;
        let csv_path = directory.path().join("vehicles.csv");
        let mut content = format!("{HEADER}\n");

        for row in rows {
            content.push_str(row);
            content.push('\n');
        }

        fs::write(&csv_path, content)?;

        Ok(Self { directory, csv_path })
    }

    fn with_rows(rows: &[&str]) -> Result<Self> {
        Self::new(&rows.iter().map(|row| row.to_string()).collect::<Vec<_>>())
    }

    fn ledger(&self) -> Arc<JsonLedger> {
        Arc::new(JsonLedger::for_csv(&self.csv_path))
    }

    fn orchestrator(&self, transport: Arc<ScriptedTransport>) -> BatchOrchestrator<JsonLedger, Arc<ScriptedTransport>> {
        self.orchestrator_with_ledger(self.ledger(), transport)
    }

    fn orchestrator_with_ledger(&self, ledger: Arc<JsonLedger>, transport: Arc<ScriptedTransport>) -> BatchOrchestrator<JsonLedger, Arc<ScriptedTransport>> {
        let submitter = Arc::new(RemoteSubmitter::new(transport, RetryPolicy::new(1)));

        BatchOrchestrator::new(CsvSource::new(&self.csv_path), ledger, submitter)
    }

    fn path(&self) -> &Path {
        self.directory.path()
    }
}

fn numbered_rows(count: usize) -> Vec<String> {
    (1..=count).map(|index| format!("T{index},Brand{index},Model,7.5,C1,F1,60")).collect()
}

#[tokio::test]
async fn test_load_unprocessed_collapses_rows_sharing_an_identity() -> Result<()> {
    let fixture = Fixture::with_rows(&[
        "T1,ford,Focus,7.5,C1,F1,60",
        "T1,FORD,FOCUS,8.0,C1,F1,70",
        "T2,Fiat,Uno,6,C1,F2,45"
    ])?;
    let orchestrator = fixture.orchestrator(Arc::new(ScriptedTransport::always(HttpReply::new(201, "{}"))));

    let unprocessed = orchestrator.load_unprocessed().await?;

    assert_eq!(unprocessed.len(), 2);
    assert_eq!(unprocessed[0].0, RecordId::from("T1_FORD_FOCUS_C1_F1"));
    assert_eq!(unprocessed[0].1.theorical_consumption, "7.5");
    assert_eq!(unprocessed[1].0, RecordId::from("T2_FIAT_UNO_C1_F2"));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_second_run_finds_nothing_to_submit() -> Result<()> {
    let fixture = Fixture::with_rows(&["T1,Ford,Focus,7.5,C1,F1,60", "T2,Fiat,Uno,6,C1,F2,45"])?;
    let transport = Arc::new(ScriptedTransport::always(HttpReply::new(201, "{}")));
    let orchestrator = fixture.orchestrator(transport.clone());

    let first = orchestrator.run_all().await?;

    assert_eq!(first.total_records, 2);
    assert_eq!(first.processed_successfully, 2);
    assert!(orchestrator.load_unprocessed().await?.is_empty());

    let second = orchestrator.run_all().await?;

    assert_eq!(second.total_records, 0);
    assert_eq!(second.processed_successfully, 0);
    assert_eq!(transport.call_count(), 2);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_signals_mark_processed_without_counting_as_failures() -> Result<()> {
    let fixture = Fixture::new(&numbered_rows(3))?;
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(HttpReply::new(409, "exists")),
        Ok(HttpReply::new(400, "Conflict with existing vehicle class")),
        Ok(HttpReply::new(500, "upstream answered 409"))
    ]));
    let ledger = fixture.ledger();
    let orchestrator = fixture.orchestrator_with_ledger(ledger.clone(), transport);

    let summary = orchestrator.run_all().await?;

    assert_eq!(summary.skipped_duplicates, 3);
    assert_eq!(summary.failed_records, 0);
    assert_eq!(summary.processed_successfully, 0);
    assert!(summary.errors.is_empty());
    assert_eq!(ledger.processed_ids()?.len(), 3);
    assert_eq!(ledger.failed_count()?, 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_logged_and_do_not_stop_the_run() -> Result<()> {
    let fixture = Fixture::with_rows(&[
        "T1,Ford,Focus,7.5,C1,F1,60",
        "T2,Fiat,Uno,abc,C1,F2,45",
        "T3,Renault,Clio,5,C1,F1,50"
    ])?;
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(HttpReply::new(400, "IdCompany is invalid")),
        Ok(HttpReply::new(201, "{}"))
    ]));
    let ledger = fixture.ledger();
    let orchestrator = fixture.orchestrator_with_ledger(ledger.clone(), transport.clone());

    let summary = orchestrator.run_all().await?;

    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.failed_records, 2);
    assert_eq!(summary.processed_successfully, 1);
    assert_eq!(summary.errors, vec![
        "Error processing T1_FORD_FOCUS_C1_F1: Client error (400): IdCompany is invalid".to_string(),
        "Error processing T2_FIAT_UNO_C1_F2: Format error: field [TheoricalConsumption] has non-numeric value [abc]".to_string()
    ]);
    assert_eq!(transport.submitted_brands(), vec!["Ford".to_string(), "Renault".to_string()]);
    assert!(ledger.is_processed(&RecordId::from("T3_RENAULT_CLIO_C1_F1"))?);
    assert!(!ledger.is_processed(&RecordId::from("T1_FORD_FOCUS_C1_F1"))?);
    assert_eq!(ledger.failed_count()?, 2);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_records_are_retried_next_run_and_logged_again() -> Result<()> {
    let fixture = Fixture::with_rows(&["T1,Ford,Focus,7.5,C1,F1,60"])?;
    let transport = Arc::new(ScriptedTransport::always(HttpReply::new(422, "rejected")));
    let ledger = fixture.ledger();
    let orchestrator = fixture.orchestrator_with_ledger(ledger.clone(), transport.clone());

    orchestrator.run_all().await?;
    let second = orchestrator.run_all().await?;

    assert_eq!(second.total_records, 1);
    assert_eq!(second.failed_records, 1);
    assert_eq!(transport.call_count(), 2);
    assert_eq!(ledger.failed_count()?, 2);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_batches_are_separated_by_pauses_but_not_followed_by_one() -> Result<()> {
    let fixture = Fixture::new(&numbered_rows(25))?;
    let transport = Arc::new(ScriptedTransport::always(HttpReply::new(201, "{}")));
    let orchestrator = fixture.orchestrator(transport.clone())
        .with_batch_size(10)
        .with_batch_pause(Duration::from_secs(1))
        .with_record_pause(Duration::ZERO);

    let started = Instant::now();
    let summary = orchestrator.run_all().await?;
    let elapsed = started.elapsed();
    let times = transport.call_times();

    assert_eq!(summary.processed_successfully, 25);
    assert_eq!(times.len(), 25);
    assert!(times[10] - times[9] >= Duration::from_secs(1));
    assert!(times[20] - times[19] >= Duration::from_secs(1));
    assert!(times[9] - times[0] < Duration::from_secs(1));
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(3));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_records_within_a_batch_are_paced() -> Result<()> {
    let fixture = Fixture::new(&numbered_rows(3))?;
    let transport = Arc::new(ScriptedTransport::always(HttpReply::new(201, "{}")));
    let orchestrator = fixture.orchestrator(transport.clone())
        .with_record_pause(Duration::from_millis(100));

    let started = Instant::now();
    orchestrator.run_all().await?;
    let elapsed = started.elapsed();
    let times = transport.call_times();

    assert!(times[1] - times[0] >= Duration::from_millis(100));
    assert!(times[2] - times[1] >= Duration::from_millis(100));
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(300));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_csv_aborts_before_submitting() -> Result<()> {
    let fixture = Fixture::with_rows(&[])?;
    fs::remove_file(&fixture.csv_path)?;
    let transport = Arc::new(ScriptedTransport::always(HttpReply::new(201, "{}")));

    let result = fixture.orchestrator(transport.clone()).run_all().await;

    assert!(matches!(result, Err(EngineError::DataSource(DataSourceError::NotFound { .. }))));
    assert_eq!(transport.call_count(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_ledger_aborts_before_submitting() -> Result<()> {
    let fixture = Fixture::new(&numbered_rows(2))?;
    let ledger = fixture.ledger();
    fs::write(ledger.processed_path(), "[")?;
    let transport = Arc::new(ScriptedTransport::always(HttpReply::new(201, "{}")));

    let result = fixture.orchestrator_with_ledger(ledger, transport.clone()).run_all().await;

    assert!(matches!(result, Err(EngineError::Ledger(_))));
    assert_eq!(transport.call_count(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_ledger_write_failures_do_not_abort_the_run() -> Result<()> {
    let fixture = Fixture::new(&numbered_rows(2))?;
    let ledger = Arc::new(JsonLedger::for_csv(&fixture.csv_path).with_corruption_tolerance(true));
    fs::create_dir(ledger.processed_path())?;
    let transport = Arc::new(ScriptedTransport::always(HttpReply::new(201, "{}")));

    let summary = fixture.orchestrator_with_ledger(ledger, transport.clone()).run_all().await?;

    assert_eq!(summary.processed_successfully, 2);
    assert_eq!(transport.call_count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_records_even_when_its_url_looks_like_a_conflict() -> Result<()> {
    let fixture = Fixture::with_rows(&["T1,Brand1,Model,7.5,C1,F1,60"])?;
    let ledger = fixture.ledger();
    let transport = HttpTransport::new("http://127.0.0.1:9", "/api/v1/Conflicts/409/VehiclesClass/", "secret-token", Duration::from_secs(2))?;
    let submitter = Arc::new(RemoteSubmitter::new(transport, RetryPolicy::new(1)));
    let orchestrator = BatchOrchestrator::new(CsvSource::new(&fixture.csv_path), ledger.clone(), submitter);

    let summary = orchestrator.run_all().await?;

    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.failed_records, 1);
    assert_eq!(summary.skipped_duplicates, 0);
    assert!(ledger.processed_ids()?.is_empty());
    assert_eq!(ledger.failed_count()?, 1);

    Ok(())
}

/// Marks `target` processed in the ledger the first time anything is posted, as a concurrent run would.
struct ConcurrentRunTransport {
    ledger: Arc<JsonLedger>,
    target: VehicleRecord,
    posted: Mutex<Vec<String>>
}

impl Transport for ConcurrentRunTransport {
    async fn post(&self, record: &WireRecord) -> Result<HttpReply, TransportError> {
        if let Ok(mut posted) = self.posted.lock() {
            posted.push(record.brand.clone());
        }

        let _ = self.ledger.mark_processed(&self.target.record_id(), &self.target);

        Ok(HttpReply::new(201, "{}"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_records_marked_by_a_concurrent_run_are_not_resubmitted() -> Result<()> {
    let fixture = Fixture::new(&numbered_rows(2))?;
    let ledger = fixture.ledger();
    let second = CsvSource::new(&fixture.csv_path).load()?.remove(1);
    let transport = Arc::new(ConcurrentRunTransport {
        ledger: ledger.clone(),
        target: second,
        posted: Mutex::new(Vec::new())
    });
    let submitter = Arc::new(RemoteSubmitter::new(transport.clone(), RetryPolicy::new(1)));
    let orchestrator = BatchOrchestrator::new(CsvSource::new(&fixture.csv_path), ledger.clone(), submitter);

    let summary = orchestrator.run_all().await?;

    assert_eq!(summary.processed_successfully, 1);
    assert_eq!(summary.skipped_duplicates, 1);
    assert_eq!(transport.posted.lock().map(|posted| posted.clone()).unwrap_or_default(), vec!["Brand1".to_string()]);
    assert_eq!(ledger.processed_ids()?.len(), 2);

    Ok(())
}

#[test]
fn test_duplicate_signal_detection() {
    assert!(is_duplicate_signal(&SubmitOutcome::Duplicate("anything".to_string())));
    assert!(is_duplicate_signal(&SubmitOutcome::ClientError("Client error (400): DUPLICATE key".to_string())));
    assert!(is_duplicate_signal(&SubmitOutcome::ServerError("Server error (502): Conflict".to_string())));
    assert!(!is_duplicate_signal(&SubmitOutcome::ClientError("Client error (400): bad".to_string())));
    assert!(!is_duplicate_signal(&SubmitOutcome::TransportError(TransportError::Timeout)));
    assert!(!is_duplicate_signal(&SubmitOutcome::TransportError(TransportError::Connect("409 Conflict duplicate".to_string()))));
    assert!(!is_duplicate_signal(&SubmitOutcome::Success(serde_json::json!({}))));
}

#[test]
fn test_status_reports_completion_against_the_ledger() -> Result<()> {
    let fixture = Fixture::new(&numbered_rows(10))?;
    let ledger = fixture.ledger();
    let records = CsvSource::new(&fixture.csv_path).load()?;

    for record in records.iter().take(4) {
        ledger.mark_processed(&record.record_id(), record)?;
    }

    let status = compute_status(&CsvSource::new(&fixture.csv_path), ledger.as_ref());

    assert_eq!(status.total_records, 10);
    assert_eq!(status.processed_records, 4);
    assert_eq!(status.pending_records, 6);
    assert_eq!(status.completion_percentage, 40.0);
    assert_eq!(status.error, None);

    Ok(())
}

#[test]
fn test_status_recomputes_pending_when_ledger_has_stale_ids() -> Result<()> {
    let fixture = Fixture::new(&numbered_rows(2))?;
    let ledger = fixture.ledger();
    let records = CsvSource::new(&fixture.csv_path).load()?;

    ledger.mark_processed(&records[0].record_id(), &records[0])?;
    ledger.mark_processed(&RecordId::from("T9_GONE_GONE_C1_F1"), &records[0])?;

    let status = compute_status(&CsvSource::new(&fixture.csv_path), ledger.as_ref());

    assert_eq!(status.processed_records, 2);
    assert_eq!(status.pending_records, 1);
    assert_eq!(status.completion_percentage, 100.0);

    Ok(())
}

#[test]
fn test_status_of_empty_csv_is_zero_percent() -> Result<()> {
    let fixture = Fixture::with_rows(&[])?;

    let status = compute_status(&CsvSource::new(&fixture.csv_path), fixture.ledger().as_ref());

    assert_eq!(status.total_records, 0);
    assert_eq!(status.completion_percentage, 0.0);

    Ok(())
}

#[test]
fn test_status_embeds_errors_instead_of_failing() -> Result<()> {
    let fixture = Fixture::with_rows(&[])?;
    let missing = fixture.path().join("missing.csv");

    let status = compute_status(&CsvSource::new(&missing), fixture.ledger().as_ref());

    assert_eq!(status.total_records, 0);
    assert_eq!(status.pending_records, 0);
    assert!(status.error.is_some_and(|message| message.contains("CSV file not found")));

    Ok(())
}
