//! Database errors

use dbfixture_core::FixtureError;
use dbfixture_dataset::DataSetError;
use dbfixture_search::SearchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Update, refresh and delete address rows by primary key
    #[error("table '{0}' has no primary key")]
    NoPrimaryKey(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    DataSet(#[from] DataSetError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl From<DatabaseError> for FixtureError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Fixture(inner) => inner,
            other => FixtureError::Source(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
