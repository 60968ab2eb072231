use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("CSV file not found: {}", path.display())]
    NotFound {
        path: PathBuf
    },
    #[error("CSV file is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        columns: Vec<String>
    },
    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error)
}
