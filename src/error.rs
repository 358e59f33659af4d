//! Error types for the query repair engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepairError>;

#[derive(Error, Debug)]
pub enum RepairError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Configuration-class errors: surfaced before any search work starts
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    // Data-class errors: fatal for the run, reported per run
    #[error("Invalid data: {0}")]
    Data(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Empty tuple set")]
    EmptyDataset,

    /// Only produced inside the membership cache; always downgraded to a miss.
    #[error("Cache corruption: {0}")]
    CacheCorruption(String),
}

impl RepairError {
    /// True for errors caused by the run description rather than the data.
    pub fn is_fatal_config(&self) -> bool {
        matches!(
            self,
            RepairError::Configuration(_) | RepairError::Parse(_) | RepairError::UnknownFunction(_)
        )
    }

    /// True for errors caused by the tuple set itself.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            RepairError::Data(_) | RepairError::ColumnNotFound(_) | RepairError::EmptyDataset
        )
    }
}

impl From<serde_json::Error> for RepairError {
    fn from(err: serde_json::Error) -> Self {
        RepairError::Serialization(err.to_string())
    }
}
