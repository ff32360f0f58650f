use thiserror::Error;

use crate::domain::{ExpenseId, LedgerError};

#[derive(Error, Debug)]
pub enum AppError {
    /// Bad user input; nothing was written.
    #[error("{0}")]
    Validation(String),

    #[error("Expense not found: {0}")]
    NotFound(ExpenseId),

    /// Read, parse, or write failure on the ledger file.
    /// The cause chain is carried as the error source.
    #[error("Storage error")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::TotalOutOfRange => AppError::Validation(err.to_string()),
            LedgerError::IdsExhausted => AppError::Storage(err.into()),
        }
    }
}
