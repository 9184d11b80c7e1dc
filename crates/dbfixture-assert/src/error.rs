//! Assertion errors
//!
//! These abort a comparison before any cell is looked at. Cell mismatches are
//! not errors; they are returned as `Difference`s.

use dbfixture_dataset::DataSetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssertionError {
    /// A column is excluded and also has its own comparer
    #[error("column '{column}' is excluded but has an explicit comparer")]
    ConfigurationConflict { column: String },

    #[error("table '{table}': expected {expected} rows, found {actual}")]
    RowCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("table '{table}': expected columns [{}], found [{}]", expected.join(", "), actual.join(", "))]
    ColumnMismatch {
        table: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("expected tables [{}], found [{}]", expected.join(", "), actual.join(", "))]
    TableMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error(transparent)]
    DataSet(#[from] DataSetError),
}

pub type Result<T> = std::result::Result<T, AssertionError>;
