use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger read error for [{}]: {reason}", path.display())]
    Read {
        path: PathBuf,
        reason: String
    },
    #[error("Ledger write error for [{}]: {reason}", path.display())]
    Write {
        path: PathBuf,
        reason: String
    }
}

impl LedgerError {
    pub fn read(path: &Path, reason: impl ToString) -> Self {
        Self::Read { path: path.to_path_buf(), reason: reason.to_string() }
    }

    pub fn write(path: &Path, reason: impl ToString) -> Self {
        Self::Write { path: path.to_path_buf(), reason: reason.to_string() }
    }
}
