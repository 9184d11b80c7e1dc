//! Dataset errors

use dbfixture_core::FixtureError;
use dbfixture_search::SearchError;
use thiserror::Error;

/// Errors raised while building, filtering, reading or writing datasets
#[derive(Debug, Error)]
pub enum DataSetError {
    /// Two tables with the same name but different columns were added
    #[error("ambiguous table '{table}': {reason}")]
    AmbiguousTable { table: String, reason: String },

    #[error("table '{0}' not found in dataset")]
    NoSuchTable(String),

    #[error("column '{column}' not found in table '{table}'")]
    NoSuchColumn { table: String, column: String },

    #[error("row {row} out of bounds for table '{table}'")]
    RowOutOfBounds { table: String, row: usize },

    #[error("row for table '{table}' has {actual} values, table has {expected} columns")]
    ColumnCount {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("table '{0}' has no primary key")]
    NoPrimaryKey(String),

    /// A fixture file does not have the expected structure
    #[error("invalid {format} fixture: {message}")]
    Format {
        format: &'static str,
        message: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl DataSetError {
    pub(crate) fn xml(err: impl std::fmt::Display) -> Self {
        DataSetError::Xml(err.to_string())
    }

    pub(crate) fn format(format: &'static str, message: impl Into<String>) -> Self {
        DataSetError::Format {
            format,
            message: message.into(),
        }
    }
}

/// Result type for dataset operations
pub type Result<T> = std::result::Result<T, DataSetError>;
