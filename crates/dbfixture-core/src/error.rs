//! Error types for dbfixture

use thiserror::Error;

/// Core error type shared by metadata providers, row sources and value parsing
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for dbfixture operations
pub type Result<T> = std::result::Result<T, FixtureError>;
