//! Blocking database connection abstraction

use crate::error::Result;
use dbfixture_core::{ColumnMeta, TableMetadata, Value};

/// Rows returned by a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A live database the fixture framework reads from and writes to
///
/// Parameters are bound positionally with `?` placeholders.
pub trait Connection {
    /// Product name used to pick a type mapper (e.g. "SQLite")
    fn product_name(&self) -> &str;

    /// Run a statement, returning the number of affected rows
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// User tables, sorted by name
    fn table_names(&self) -> Result<Vec<String>>;

    /// Columns, primary key and foreign keys of a table.
    ///
    /// Fails with `FixtureError::TableNotFound` for unknown tables.
    fn table_metadata(&self, table: &str) -> Result<TableMetadata>;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Statement emptying a table
    fn truncate_statement(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", self.quote_identifier(table))
    }
}

impl<T: Connection + ?Sized> Connection for &T {
    fn product_name(&self) -> &str {
        (**self).product_name()
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        (**self).query(sql, params)
    }

    fn table_names(&self) -> Result<Vec<String>> {
        (**self).table_names()
    }

    fn table_metadata(&self, table: &str) -> Result<TableMetadata> {
        (**self).table_metadata(table)
    }

    fn begin(&self) -> Result<()> {
        (**self).begin()
    }

    fn commit(&self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&self) -> Result<()> {
        (**self).rollback()
    }

    fn quote_identifier(&self, name: &str) -> String {
        (**self).quote_identifier(name)
    }

    fn truncate_statement(&self, table: &str) -> String {
        (**self).truncate_statement(table)
    }
}

/// Run `f` inside a transaction, committing on success and rolling back on
/// failure
pub fn in_transaction<C, T, F>(conn: &C, f: F) -> Result<T>
where
    C: Connection + ?Sized,
    F: FnOnce(&C) -> Result<T>,
{
    conn.begin()?;
    match f(conn) {
        Ok(value) => {
            conn.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = conn.rollback() {
                tracing::error!(error = %rollback_err, "rollback after failure failed");
            }
            Err(err)
        }
    }
}
