use thiserror::Error;

use crate::domain::LedgerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// The ledger rejection behind this error, if it is one.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            AppError::Ledger(err) => Some(err),
            AppError::Database(_) => None,
        }
    }
}
