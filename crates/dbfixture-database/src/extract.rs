//! Pulling datasets out of a live database

use crate::connection::Connection;
use crate::error::Result;
use crate::source::DatabaseSource;
use crate::statement::Select;
use dbfixture_core::{FixtureConfig, TableMetadata};
use dbfixture_dataset::{DataSet, Table};
use dbfixture_search::{Direction, FilteredSearch, SeedRows, order_tables};

fn read_table<C>(conn: &C, table: &str, config: &FixtureConfig) -> Result<Table>
where
    C: Connection + ?Sized,
{
    let metadata = conn.table_metadata(table)?;
    let columns: Vec<String> = metadata.columns.iter().map(|c| c.name.clone()).collect();
    let sql = Select::new(conn, &metadata.name, &columns)
        .order_by(&metadata.primary_key)
        .sql();
    let result = conn.query(&sql, &[])?;

    let mut table = Table::new(metadata).case_sensitive(config.case_sensitive_table_names);
    for row in result.rows {
        table.add_row(row)?;
    }
    tracing::debug!(table = %table.name(), rows = table.row_count(), "extracted table");
    Ok(table)
}

/// Full contents of `tables`, rows sorted by primary key
pub fn extract_tables<C, S>(conn: &C, tables: &[S], config: &FixtureConfig) -> Result<DataSet>
where
    C: Connection + ?Sized,
    S: AsRef<str>,
{
    let mut dataset = DataSet::with_config(config);
    for table in tables {
        dataset.add_table(read_table(conn, table.as_ref(), config)?)?;
    }
    Ok(dataset)
}

/// Every table of the database, parents first
pub fn extract_all<C>(conn: &C, config: &FixtureConfig) -> Result<DataSet>
where
    C: Connection + ?Sized,
{
    let names = conn.table_names()?;
    let ordered = order_tables(&DatabaseSource::new(conn), &names, Direction::Insert, config)?;
    extract_tables(conn, &ordered, config)
}

/// Only the rows related to `seed`, found with a filtered search over the
/// database's foreign keys. Tables come out parents first and rows in the
/// search's key order.
pub fn extract_filtered<C>(conn: &C, seed: &SeedRows, config: &FixtureConfig) -> Result<DataSet>
where
    C: Connection + ?Sized,
{
    let source = DatabaseSource::new(conn);
    let result = FilteredSearch::new(&source, &source, config).filter_by_seed(seed)?;

    let mut dataset = DataSet::with_config(config);
    for name in result.table_order(Direction::Insert) {
        let metadata = conn.table_metadata(&name)?;
        let columns: Vec<String> = metadata.columns.iter().map(|c| c.name.clone()).collect();
        let sql = Select::new(conn, &metadata.name, &columns)
            .filter(&metadata.primary_key)
            .sql();

        let mut table = Table::new(metadata).case_sensitive(config.case_sensitive_table_names);
        for key in result.restrictions().keys(&name) {
            for row in conn.query(&sql, key.values())?.rows {
                table.add_row(row)?;
            }
        }
        dataset.add_table(table)?;
    }

    tracing::info!(
        tables = dataset.len(),
        rows = dataset.row_count(),
        "extracted filtered dataset"
    );
    Ok(dataset)
}

/// A dataset assembled from whole tables and ad hoc queries
pub struct QueryDataSet<'c, C: ?Sized> {
    conn: &'c C,
    config: FixtureConfig,
    dataset: DataSet,
}

impl<'c, C: Connection + ?Sized> QueryDataSet<'c, C> {
    pub fn new(conn: &'c C, config: &FixtureConfig) -> Self {
        Self {
            conn,
            config: config.clone(),
            dataset: DataSet::with_config(config),
        }
    }

    /// Add the full contents of a table
    pub fn add_table(&mut self, table: &str) -> Result<&mut Self> {
        let table = read_table(self.conn, table, &self.config)?;
        self.dataset.add_table(table)?;
        Ok(self)
    }

    /// Add the rows of `sql` under the name `table`
    pub fn add_query(&mut self, table: &str, sql: &str) -> Result<&mut Self> {
        let result = self.conn.query(sql, &[])?;
        let mut metadata = TableMetadata::new(table);
        metadata.columns = result.columns;

        let mut rows = Table::new(metadata).case_sensitive(self.config.case_sensitive_table_names);
        for row in result.rows {
            rows.add_row(row)?;
        }
        tracing::debug!(table = %table, rows = rows.row_count(), "added query table");
        self.dataset.add_table(rows)?;
        Ok(self)
    }

    pub fn dataset(&self) -> &DataSet {
        &self.dataset
    }

    pub fn into_dataset(self) -> DataSet {
        self.dataset
    }
}
