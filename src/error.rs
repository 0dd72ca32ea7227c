use crate::domain::loan::LoanId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Loan {0} not found")]
    LoanNotFound(LoanId),
    #[error("Transaction error: {0}")]
    TransactionError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
}

impl LoanError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// True for failures raised before any storage was touched.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
