//! In-memory schema used by the unit tests

use dbfixture_core::{
    ColumnMeta, FixtureError, ForeignKeyInfo, MetadataProvider, Result, RowKey, RowSource,
    TableMetadata, Value, names_match,
};

#[derive(Debug, Default)]
pub struct MemorySchema {
    tables: Vec<(TableMetadata, Vec<Vec<Value>>)>,
}

impl MemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, meta: TableMetadata, rows: Vec<Vec<Value>>) -> Self {
        self.tables.push((meta, rows));
        self
    }

    fn find(&self, table: &str) -> Result<&(TableMetadata, Vec<Vec<Value>>)> {
        self.tables
            .iter()
            .find(|(meta, _)| names_match(&meta.name, table, false))
            .ok_or_else(|| FixtureError::TableNotFound(table.to_string()))
    }

    fn indices(meta: &TableMetadata, columns: &[String]) -> Result<Vec<usize>> {
        columns
            .iter()
            .map(|c| {
                meta.column_index(c, false).ok_or_else(|| FixtureError::ColumnNotFound {
                    table: meta.name.clone(),
                    column: c.clone(),
                })
            })
            .collect()
    }
}

impl MetadataProvider for MemorySchema {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|(m, _)| m.name.clone()).collect())
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnMeta>> {
        Ok(self.find(table)?.0.columns.clone())
    }

    fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.find(table)?.0.primary_key.clone())
    }

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        Ok(self.find(table)?.0.foreign_keys.clone())
    }
}

impl RowSource for MemorySchema {
    fn keys_matching(&self, table: &str, columns: &[String], values: &[Value]) -> Result<Vec<RowKey>> {
        let (meta, rows) = self.find(table)?;
        let cols = Self::indices(meta, columns)?;
        let pk = Self::indices(meta, &meta.primary_key)?;
        Ok(rows
            .iter()
            .filter(|row| {
                cols.iter()
                    .zip(values)
                    .all(|(&i, v)| !v.is_null() && row[i].matches(v))
            })
            .map(|row| RowKey::new(pk.iter().map(|&i| row[i].clone()).collect()))
            .collect())
    }

    fn row_values(&self, table: &str, key: &RowKey, columns: &[String]) -> Result<Option<Vec<Value>>> {
        let (meta, rows) = self.find(table)?;
        let cols = Self::indices(meta, columns)?;
        let pk = Self::indices(meta, &meta.primary_key)?;
        Ok(rows
            .iter()
            .find(|row| pk.iter().zip(key.values()).all(|(&i, v)| row[i].matches(v)))
            .map(|row| cols.iter().map(|&i| row[i].clone()).collect()))
    }
}

fn row(values: &[Option<&str>]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

/// Three tables chained by foreign keys, C also referencing itself:
///
/// ```text
/// A1 -> B1 -> C1 -> C2
/// A2 -> B2 -> C3
/// ```
pub fn abc_schema() -> MemorySchema {
    MemorySchema::new()
        .table(
            TableMetadata::with_column_names("A", ["ID", "B_ID"])
                .primary_key(["ID"])
                .foreign_key(ForeignKeyInfo::new(["B_ID"], "B", ["ID"]).named("FK_A_B")),
            vec![row(&[Some("A1"), Some("B1")]), row(&[Some("A2"), Some("B2")])],
        )
        .table(
            TableMetadata::with_column_names("B", ["ID", "C_ID"])
                .primary_key(["ID"])
                .foreign_key(ForeignKeyInfo::new(["C_ID"], "C", ["ID"]).named("FK_B_C")),
            vec![row(&[Some("B1"), Some("C1")]), row(&[Some("B2"), Some("C3")])],
        )
        .table(
            TableMetadata::with_column_names("C", ["ID", "PARENT_ID"])
                .primary_key(["ID"])
                .foreign_key(ForeignKeyInfo::new(["PARENT_ID"], "C", ["ID"]).named("FK_C_C")),
            vec![
                row(&[Some("C1"), Some("C2")]),
                row(&[Some("C2"), None]),
                row(&[Some("C3"), None]),
            ],
        )
}
