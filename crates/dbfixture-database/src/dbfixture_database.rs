//! Live databases for dbfixture
//!
//! A blocking `Connection` trait with a SQLite implementation, operations that
//! load datasets into a database in foreign key order, extraction of datasets
//! (whole tables, queries, or only the rows related to a seed), and a
//! `DatabaseSource` that lets the dependency search run against the live
//! schema.

mod connection;
mod error;
mod extract;
mod operation;
mod source;
mod sqlite;
mod statement;

pub use connection::{Connection, QueryResult, in_transaction};
pub use error::{DatabaseError, Result};
pub use extract::{QueryDataSet, extract_all, extract_filtered, extract_tables};
pub use operation::DatabaseOperation;
pub use source::DatabaseSource;
pub use sqlite::SqliteConnection;
