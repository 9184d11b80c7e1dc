//! Loading datasets into a database and cleaning them out again
//!
//! Writes run parents first, deletes children first, using the database's own
//! foreign keys when `order_by_dependencies` is set. Fixture text is converted
//! to each column's declared type before it is bound.

use crate::connection::{Connection, in_transaction};
use crate::error::{DatabaseError, Result};
use crate::source::DatabaseSource;
use crate::statement;
use dbfixture_core::{ColumnMeta, FixtureConfig, TableMetadata, Value, names_match};
use dbfixture_dataset::{DataSet, Table};
use dbfixture_search::{Direction, order_tables};

/// What to do with a dataset's rows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DatabaseOperation {
    /// Leave the database alone
    #[default]
    None,
    /// Insert every row
    Insert,
    /// Update rows by primary key
    Update,
    /// Update rows that exist, insert the others
    Refresh,
    /// Delete the dataset's rows by primary key
    Delete,
    /// Delete every row of the dataset's tables
    DeleteAll,
    /// Empty the dataset's tables with the connection's truncate statement
    Truncate,
    /// `DeleteAll` followed by `Insert`
    CleanInsert,
    /// Run operations one after the other
    Composite(Vec<DatabaseOperation>),
    /// Run an operation in its own transaction
    Transaction(Box<DatabaseOperation>),
}

impl DatabaseOperation {
    pub fn composite(operations: impl IntoIterator<Item = DatabaseOperation>) -> Self {
        DatabaseOperation::Composite(operations.into_iter().collect())
    }

    pub fn in_transaction(self) -> Self {
        DatabaseOperation::Transaction(Box::new(self))
    }

    /// Apply the operation, returning the number of affected rows
    pub fn execute<C>(&self, conn: &C, dataset: &DataSet, config: &FixtureConfig) -> Result<u64>
    where
        C: Connection + ?Sized,
    {
        tracing::info!(operation = ?self, tables = dataset.len(), "executing database operation");
        let affected = match self {
            DatabaseOperation::None => 0,
            DatabaseOperation::Transaction(_) => self.run(conn, dataset, config, false)?,
            _ if config.operation.use_transaction => {
                in_transaction(conn, |c| self.run(c, dataset, config, true))?
            }
            _ => self.run(conn, dataset, config, false)?,
        };
        tracing::info!(affected_rows = affected, "database operation finished");
        Ok(affected)
    }

    fn run<C>(&self, conn: &C, dataset: &DataSet, config: &FixtureConfig, in_tx: bool) -> Result<u64>
    where
        C: Connection + ?Sized,
    {
        match self {
            DatabaseOperation::None => Ok(0),
            DatabaseOperation::Insert => {
                let batch_size = config.operation.batch_size.max(1);
                for_each_table(conn, dataset, Direction::Insert, config, |t| t.insert(batch_size))
            }
            DatabaseOperation::Update => {
                for_each_table(conn, dataset, Direction::Insert, config, TableWriter::update)
            }
            DatabaseOperation::Refresh => {
                for_each_table(conn, dataset, Direction::Insert, config, TableWriter::refresh)
            }
            DatabaseOperation::Delete => {
                for_each_table(conn, dataset, Direction::Delete, config, TableWriter::delete)
            }
            DatabaseOperation::DeleteAll => {
                for_each_table(conn, dataset, Direction::Delete, config, TableWriter::delete_all)
            }
            DatabaseOperation::Truncate => {
                for_each_table(conn, dataset, Direction::Delete, config, TableWriter::truncate)
            }
            DatabaseOperation::CleanInsert => Ok(DatabaseOperation::DeleteAll
                .run(conn, dataset, config, in_tx)?
                + DatabaseOperation::Insert.run(conn, dataset, config, in_tx)?),
            DatabaseOperation::Composite(operations) => {
                let mut affected = 0;
                for operation in operations {
                    affected += operation.run(conn, dataset, config, in_tx)?;
                }
                Ok(affected)
            }
            DatabaseOperation::Transaction(inner) if in_tx => inner.run(conn, dataset, config, true),
            DatabaseOperation::Transaction(inner) => {
                in_transaction(conn, |c| inner.run(c, dataset, config, true))
            }
        }
    }
}

/// Dataset tables in the order `direction` requires
fn ordered_tables<'d, C>(
    conn: &C,
    dataset: &'d DataSet,
    direction: Direction,
    config: &FixtureConfig,
) -> Result<Vec<&'d Table>>
where
    C: Connection + ?Sized,
{
    if !config.operation.order_by_dependencies {
        let mut tables: Vec<&Table> = dataset.tables().collect();
        if direction == Direction::Delete {
            tables.reverse();
        }
        return Ok(tables);
    }
    let source = DatabaseSource::new(conn);
    let order = order_tables(&source, &dataset.table_names(), direction, config)?;
    order
        .iter()
        .map(|name| dataset.table(name).map_err(DatabaseError::from))
        .collect()
}

fn for_each_table<'a, C, F>(
    conn: &'a C,
    dataset: &'a DataSet,
    direction: Direction,
    config: &FixtureConfig,
    mut apply: F,
) -> Result<u64>
where
    C: Connection + ?Sized,
    F: FnMut(&TableWriter<'a, C>) -> Result<u64>,
{
    let mut affected = 0;
    for table in ordered_tables(conn, dataset, direction, config)? {
        let writer = TableWriter::new(conn, table, config)?;
        affected += apply(&writer)?;
    }
    Ok(affected)
}

/// Statements for one dataset table against its database table
struct TableWriter<'a, C: ?Sized> {
    conn: &'a C,
    table: &'a Table,
    target: TableMetadata,
    case_sensitive: bool,
}

impl<'a, C: Connection + ?Sized> TableWriter<'a, C> {
    fn new(conn: &'a C, table: &'a Table, config: &FixtureConfig) -> Result<Self> {
        Ok(Self {
            conn,
            table,
            target: conn.table_metadata(table.name())?,
            case_sensitive: config.case_sensitive_table_names,
        })
    }

    fn name(&self) -> &str {
        &self.target.name
    }

    fn column_meta(&self, column: &str) -> Option<&ColumnMeta> {
        self.target
            .columns
            .iter()
            .find(|c| names_match(&c.name, column, self.case_sensitive))
    }

    /// Fixture text converted to the column's type; unparseable text is
    /// passed through for the database to judge
    fn bind(&self, column: &str, value: &Value) -> Value {
        match (value, self.column_meta(column)) {
            (Value::String(text), Some(meta)) if !meta.data_type.is_text() => meta
                .data_type
                .parse_value(text)
                .unwrap_or_else(|_| value.clone()),
            _ => value.clone(),
        }
    }

    fn values(&self, row: usize, columns: &[String]) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(columns.len());
        for column in columns {
            values.push(self.bind(column, self.table.value(row, column)?));
        }
        Ok(values)
    }

    fn columns(&self) -> Vec<String> {
        self.table
            .column_names()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Primary key declared by the dataset, else by the database
    fn key_columns(&self) -> Result<Vec<String>> {
        let declared = &self.table.metadata().primary_key;
        let key = if declared.is_empty() {
            &self.target.primary_key
        } else {
            declared
        };
        if key.is_empty() {
            return Err(DatabaseError::NoPrimaryKey(self.name().to_string()));
        }
        Ok(key.clone())
    }

    fn non_key_columns(&self, key: &[String]) -> Vec<String> {
        self.columns()
            .into_iter()
            .filter(|c| !key.iter().any(|k| names_match(k, c, self.case_sensitive)))
            .collect()
    }

    fn insert(&self, batch_size: usize) -> Result<u64> {
        let columns = self.columns();
        if columns.is_empty() || self.table.is_empty() {
            return Ok(0);
        }
        let rows: Vec<usize> = (0..self.table.row_count()).collect();
        let mut affected = 0;
        for batch in rows.chunks(batch_size) {
            let sql = statement::insert(self.conn, self.name(), &columns, batch.len());
            let mut params = Vec::with_capacity(batch.len() * columns.len());
            for &row in batch {
                params.extend(self.values(row, &columns)?);
            }
            affected += self.conn.execute(&sql, &params)?;
        }
        tracing::debug!(table = %self.name(), rows = affected, "inserted rows");
        Ok(affected)
    }

    fn insert_row(&self, row: usize) -> Result<u64> {
        let columns = self.columns();
        let sql = statement::insert(self.conn, self.name(), &columns, 1);
        self.conn.execute(&sql, &self.values(row, &columns)?)
    }

    /// Rows changed by updating `row`; zero when it does not exist
    fn update_row(&self, row: usize, key: &[String], set: &[String]) -> Result<u64> {
        let key_values = self.values(row, key)?;
        if set.is_empty() {
            let sql = statement::Select::new(self.conn, self.name(), key).filter(key).sql();
            return Ok(self.conn.query(&sql, &key_values)?.len() as u64);
        }
        let mut params = self.values(row, set)?;
        params.extend(key_values);
        self.conn
            .execute(&statement::update(self.conn, self.name(), set, key), &params)
    }

    fn update(&self) -> Result<u64> {
        let key = self.key_columns()?;
        let set = self.non_key_columns(&key);
        let mut affected = 0;
        for row in 0..self.table.row_count() {
            let updated = self.update_row(row, &key, &set)?;
            if updated == 0 {
                tracing::warn!(table = %self.name(), row, "no row to update");
            }
            affected += updated;
        }
        tracing::debug!(table = %self.name(), rows = affected, "updated rows");
        Ok(affected)
    }

    fn refresh(&self) -> Result<u64> {
        let key = self.key_columns()?;
        let set = self.non_key_columns(&key);
        let mut affected = 0;
        for row in 0..self.table.row_count() {
            affected += match self.update_row(row, &key, &set)? {
                0 => self.insert_row(row)?,
                updated => updated,
            };
        }
        tracing::debug!(table = %self.name(), rows = affected, "refreshed rows");
        Ok(affected)
    }

    fn delete(&self) -> Result<u64> {
        let key = self.key_columns()?;
        let sql = statement::delete(self.conn, self.name(), &key);
        let mut affected = 0;
        for row in 0..self.table.row_count() {
            affected += self.conn.execute(&sql, &self.values(row, &key)?)?;
        }
        tracing::debug!(table = %self.name(), rows = affected, "deleted rows");
        Ok(affected)
    }

    fn delete_all(&self) -> Result<u64> {
        let affected = self
            .conn
            .execute(&statement::delete_all(self.conn, self.name()), &[])?;
        tracing::debug!(table = %self.name(), rows = affected, "deleted all rows");
        Ok(affected)
    }

    fn truncate(&self) -> Result<u64> {
        let affected = self
            .conn
            .execute(&self.conn.truncate_statement(self.name()), &[])?;
        tracing::debug!(table = %self.name(), "truncated table");
        Ok(affected)
    }
}
