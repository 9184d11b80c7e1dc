//! Search errors

use dbfixture_core::{FixtureError, RowKey};
use thiserror::Error;

/// Errors that abort a graph build or a search
#[derive(Debug, Error)]
pub enum SearchError {
    /// A table or column named by a key relation is absent from the metadata
    #[error("missing metadata: {0}")]
    MissingMetadata(String),

    /// A seed key does not exist in its table
    #[error("seed row {key} not found in table '{table}'")]
    MissingSeedRow { table: String, key: RowKey },

    /// Filtered search tracks rows by primary key
    #[error("table '{0}' has no primary key")]
    NoPrimaryKey(String),

    /// A seed key has the wrong number of values for its table's primary key
    #[error("seed key {key} for table '{table}' has {actual} values, primary key has {expected}")]
    KeyArity {
        table: String,
        key: RowKey,
        expected: usize,
        actual: usize,
    },

    /// The metadata provider or row source failed
    #[error("source error: {0}")]
    Source(FixtureError),
}

impl From<FixtureError> for SearchError {
    fn from(e: FixtureError) -> Self {
        match e {
            FixtureError::TableNotFound(table) => {
                SearchError::MissingMetadata(format!("table '{}'", table))
            }
            FixtureError::ColumnNotFound { table, column } => {
                SearchError::MissingMetadata(format!("column '{}.{}'", table, column))
            }
            other => SearchError::Source(other),
        }
    }
}

/// Result type for search operations
pub(crate) type Result<T> = std::result::Result<T, SearchError>;
