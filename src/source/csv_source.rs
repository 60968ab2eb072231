use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use csv::{ReaderBuilder, Trim};
use tracing::{debug, info, warn};

use crate::models::{REQUIRED_COLUMNS, VehicleRecord};
use crate::source::DataSourceError;

/// Reads vehicle-class rows from a CSV file on every call, so edits to the file between runs are seen.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into()
        }
    }

    /// Loads every complete row in file order.
    ///
    /// # Errors
    /// Returns `DataSourceError` if the file is missing, cannot be read, or its header lacks any of the
    /// required columns. Rows with an empty required value, or that cannot be deserialized, are skipped.
    pub fn load(&self) -> Result<Vec<VehicleRecord>, DataSourceError> {
        if !self.path.exists() {
            return Err(DataSourceError::NotFound { path: self.path.clone() });
        }

        let file = File::open(&self.path).map_err(csv::Error::from)?;
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let headers = reader.headers()?.clone();
        let missing: Vec<String> = REQUIRED_COLUMNS.iter()
            .filter(|column| !headers.iter().any(|header| header == **column))
            .map(|column| column.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(DataSourceError::MissingColumns { columns: missing });
        }

        let mut rows = 0usize;
        let mut records = Vec::new();

        for (index, result) in reader.deserialize::<VehicleRecord>().enumerate() {
            rows += 1;

            match result {
                Ok(record) if record.is_complete() => records.push(record),
                Ok(_) => debug!("Dropping CSV row [{}] with empty required values", index + 1),
                Err(error) => warn!("CSV deserialization error on row [{}]: {error}", index + 1)
            }
        }

        info!("Loaded CSV [{}]: {} rows, {} valid", self.path.display(), rows, records.len());

        Ok(records)
    }
}
