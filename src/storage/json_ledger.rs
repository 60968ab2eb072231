use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::VehicleRecord;
use crate::storage::{Ledger, LedgerError};
use crate::types::RecordId;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProcessedFile {
    #[serde(default)]
    processed_ids: Vec<RecordId>,
    #[serde(default)]
    records: Vec<ProcessedEntry>
}

#[derive(Debug, Serialize, Deserialize)]
struct ProcessedEntry {
    id: RecordId,
    data: serde_json::Value,
    processed_at: NaiveDateTime
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FailedFile {
    #[serde(default)]
    failed_records: Vec<FailedEntry>
}

#[derive(Debug, Serialize, Deserialize)]
struct FailedEntry {
    id: RecordId,
    data: serde_json::Value,
    error: String,
    failed_at: NaiveDateTime
}

/// Ledger backed by two pretty-printed JSON documents that are rewritten in full on every update.
///
/// A missing file is an empty ledger. Writes go through a temporary sibling and a rename so readers
/// never observe a truncated document. Read-modify-write cycles are serialized within the process
/// only; two processes sharing the same files can still lose updates.
pub struct JsonLedger {
    processed_path: PathBuf,
    failed_path: PathBuf,
    tolerate_corruption: bool,
    lock: Mutex<()>
}

impl JsonLedger {
    pub fn new(processed_path: impl Into<PathBuf>, failed_path: impl Into<PathBuf>) -> Self {
        Self {
            processed_path: processed_path.into(),
            failed_path: failed_path.into(),
            tolerate_corruption: false,
            lock: Mutex::new(())
        }
    }

    /// Places `<stem>_processed.json` and `<stem>_failed.json` next to the CSV file.
    pub fn for_csv(csv_path: &Path) -> Self {
        let stem = csv_path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "records".to_string());

        Self::new(
            csv_path.with_file_name(format!("{stem}_processed.json")),
            csv_path.with_file_name(format!("{stem}_failed.json"))
        )
    }

    /// When enabled, an unreadable processed ledger is reported as empty by the lookup operations
    /// instead of failing them. Writes still refuse to replace a document they could not read.
    pub fn with_corruption_tolerance(mut self, tolerate: bool) -> Self {
        self.tolerate_corruption = tolerate;
        self
    }

    pub fn processed_path(&self) -> &Path {
        &self.processed_path
    }

    pub fn failed_path(&self) -> &Path {
        &self.failed_path
    }

    /// Number of entries in the failure history.
    pub fn failed_count(&self) -> Result<usize, LedgerError> {
        let _guard = self.guard();
        Ok(read_document::<FailedFile>(&self.failed_path)?.failed_records.len())
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Ledger for JsonLedger {
    fn is_processed(&self, record_id: &RecordId) -> Result<bool, LedgerError> {
        Ok(self.processed_ids()?.contains(record_id))
    }

    fn processed_ids(&self) -> Result<HashSet<RecordId>, LedgerError> {
        let _guard = self.guard();

        match read_document::<ProcessedFile>(&self.processed_path) {
            Ok(document) => Ok(document.processed_ids.into_iter().collect()),
            Err(error) if self.tolerate_corruption => {
                warn!("{error}; treating processed ledger as empty");
                Ok(HashSet::new())
            }
            Err(error) => Err(error)
        }
    }

    fn mark_processed(&self, record_id: &RecordId, record: &VehicleRecord) -> Result<(), LedgerError> {
        let _guard = self.guard();
        let mut document = read_document::<ProcessedFile>(&self.processed_path)?;

        if document.processed_ids.contains(record_id) {
            debug!("Record [{record_id}] already in processed ledger");
            return Ok(());
        }

        document.processed_ids.push(record_id.clone());
        document.records.push(ProcessedEntry {
            id: record_id.clone(),
            data: to_payload(&self.processed_path, record)?,
            processed_at: Local::now().naive_local()
        });

        write_document(&self.processed_path, &document)
    }

    fn mark_failed(&self, record_id: &RecordId, record: &VehicleRecord, message: &str) -> Result<(), LedgerError> {
        let _guard = self.guard();
        let mut document = read_document::<FailedFile>(&self.failed_path)?;

        document.failed_records.push(FailedEntry {
            id: record_id.clone(),
            data: to_payload(&self.failed_path, record)?,
            error: message.to_string(),
            failed_at: Local::now().naive_local()
        });

        write_document(&self.failed_path, &document)
    }
}

fn to_payload(path: &Path, record: &VehicleRecord) -> Result<serde_json::Value, LedgerError> {
    serde_json::to_value(record).map_err(|error| LedgerError::write(path, error))
}

fn read_document<T: DeserializeOwned + Default>(path: &Path) -> Result<T, LedgerError> {
    if !path.exists() {
        return Ok(T::default());
    }

    let content = fs::read_to_string(path).map_err(|error| LedgerError::read(path, error))?;

    serde_json::from_str(&content).map_err(|error| LedgerError::read(path, error))
}

fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<(), LedgerError> {
    let content = serde_json::to_string_pretty(document).map_err(|error| LedgerError::write(path, error))?;
    let mut temporary = path.as_os_str().to_owned();
    temporary.push(".tmp");
    let temporary = PathBuf::from(temporary);

    fs::write(&temporary, content).map_err(|error| LedgerError::write(path, error))?;
    fs::rename(&temporary, path).map_err(|error| LedgerError::write(path, error))
}
