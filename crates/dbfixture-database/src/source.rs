//! Live database as metadata provider and row source for the search engine

use crate::connection::Connection;
use crate::error::{DatabaseError, Result};
use crate::statement::Select;
use dbfixture_core::{
    ColumnMeta, FixtureError, ForeignKeyInfo, MetadataProvider, RowKey, RowSource, TableMetadata,
    Value,
};

/// Answers metadata and key lookups with queries against a connection
pub struct DatabaseSource<'c, C: ?Sized> {
    conn: &'c C,
}

impl<'c, C: Connection + ?Sized> DatabaseSource<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'c C {
        self.conn
    }

    fn keyed_metadata(&self, table: &str) -> Result<TableMetadata> {
        let metadata = self.conn.table_metadata(table)?;
        if metadata.primary_key.is_empty() {
            return Err(DatabaseError::NoPrimaryKey(metadata.name));
        }
        Ok(metadata)
    }

    fn matching_keys(&self, table: &str, columns: &[String], values: &[Value]) -> Result<Vec<RowKey>> {
        if values.iter().any(Value::is_null) {
            return Ok(Vec::new());
        }
        let metadata = self.keyed_metadata(table)?;
        let sql = Select::new(self.conn, &metadata.name, &metadata.primary_key)
            .distinct()
            .filter(columns)
            .order_by(&metadata.primary_key)
            .sql();
        let result = self.conn.query(&sql, values)?;
        Ok(result.rows.into_iter().map(RowKey::new).collect())
    }

    fn values_of(&self, table: &str, key: &RowKey, columns: &[String]) -> Result<Option<Vec<Value>>> {
        let metadata = self.keyed_metadata(table)?;
        let sql = Select::new(self.conn, &metadata.name, columns)
            .filter(&metadata.primary_key)
            .sql();
        let result = self.conn.query(&sql, key.values())?;
        Ok(result.rows.into_iter().next())
    }
}

impl<C: Connection + ?Sized> MetadataProvider for DatabaseSource<'_, C> {
    fn table_names(&self) -> dbfixture_core::Result<Vec<String>> {
        Ok(self.conn.table_names()?)
    }

    fn columns(&self, table: &str) -> dbfixture_core::Result<Vec<ColumnMeta>> {
        Ok(self.conn.table_metadata(table)?.columns)
    }

    fn primary_key_columns(&self, table: &str) -> dbfixture_core::Result<Vec<String>> {
        Ok(self.conn.table_metadata(table)?.primary_key)
    }

    fn foreign_keys(&self, table: &str) -> dbfixture_core::Result<Vec<ForeignKeyInfo>> {
        Ok(self.conn.table_metadata(table)?.foreign_keys)
    }

    fn table_metadata(&self, table: &str) -> dbfixture_core::Result<TableMetadata> {
        Ok(self.conn.table_metadata(table)?)
    }
}

impl<C: Connection + ?Sized> RowSource for DatabaseSource<'_, C> {
    fn keys_matching(
        &self,
        table: &str,
        columns: &[String],
        values: &[Value],
    ) -> dbfixture_core::Result<Vec<RowKey>> {
        if columns.len() != values.len() {
            return Err(FixtureError::Source(format!(
                "{} columns but {} values for table '{}'",
                columns.len(),
                values.len(),
                table
            )));
        }
        Ok(self.matching_keys(table, columns, values)?)
    }

    fn row_values(
        &self,
        table: &str,
        key: &RowKey,
        columns: &[String],
    ) -> dbfixture_core::Result<Option<Vec<Value>>> {
        Ok(self.values_of(table, key, columns)?)
    }
}
