//! Metadata provider and row source over an in-memory dataset
//!
//! Lets the dependency search run against fixture files exactly as it runs
//! against a live database. Foreign keys that reference a table the dataset
//! does not hold are not reported.

use crate::dataset::DataSet;
use crate::table::Table;
use dbfixture_core::{
    ColumnMeta, FixtureError, ForeignKeyInfo, MetadataProvider, Result, RowKey, RowSource, Value,
};

impl DataSet {
    fn provided(&self, table: &str) -> Result<&Table> {
        self.get(table)
            .ok_or_else(|| FixtureError::TableNotFound(table.to_string()))
    }
}

fn column_indices(table: &Table, columns: &[String]) -> Result<Vec<usize>> {
    columns
        .iter()
        .map(|c| {
            table
                .metadata()
                .column_index(c, table.is_case_sensitive())
                .ok_or_else(|| FixtureError::ColumnNotFound {
                    table: table.name().to_string(),
                    column: c.clone(),
                })
        })
        .collect()
}

fn key_indices(table: &Table) -> Result<Vec<usize>> {
    if !table.metadata().has_primary_key() {
        return Err(FixtureError::Source(format!(
            "table '{}' has no primary key",
            table.name()
        )));
    }
    column_indices(table, &table.metadata().primary_key)
}

impl MetadataProvider for DataSet {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(DataSet::table_names(self)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnMeta>> {
        Ok(self.provided(table)?.columns().to_vec())
    }

    fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.provided(table)?.metadata().primary_key.clone())
    }

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        Ok(self
            .provided(table)?
            .metadata()
            .foreign_keys
            .iter()
            .filter(|fk| self.contains(&fk.referenced_table))
            .cloned()
            .collect())
    }
}

impl RowSource for DataSet {
    fn keys_matching(&self, table: &str, columns: &[String], values: &[Value]) -> Result<Vec<RowKey>> {
        let table = self.provided(table)?;
        let cols = column_indices(table, columns)?;
        let keys = key_indices(table)?;
        if values.iter().any(Value::is_null) {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for row in table.rows() {
            let hit = cols
                .iter()
                .zip(values)
                .all(|(&idx, value)| row[idx].matches(value));
            if hit {
                let key = RowKey::new(keys.iter().map(|&idx| row[idx].clone()).collect());
                if !found.contains(&key) {
                    found.push(key);
                }
            }
        }
        Ok(found)
    }

    fn row_values(&self, table: &str, key: &RowKey, columns: &[String]) -> Result<Option<Vec<Value>>> {
        let table = self.provided(table)?;
        let cols = column_indices(table, columns)?;
        let keys = key_indices(table)?;
        Ok(table
            .rows()
            .iter()
            .find(|row| {
                keys.len() == key.len()
                    && keys
                        .iter()
                        .zip(key.values())
                        .all(|(&idx, value)| row[idx].matches(value))
            })
            .map(|row| cols.iter().map(|&idx| row[idx].clone()).collect()))
    }
}
