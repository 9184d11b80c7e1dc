//! A named table of rows with its metadata

use crate::error::{DataSetError, Result};
use dbfixture_core::{ColumnMeta, RowKey, TableMetadata, Value};

/// Table contents: metadata plus rows of values in column order
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    metadata: TableMetadata,
    rows: Vec<Vec<Value>>,
    case_sensitive: bool,
}

impl Table {
    /// Create an empty table
    pub fn new(metadata: TableMetadata) -> Self {
        Self {
            metadata,
            rows: Vec::new(),
            case_sensitive: false,
        }
    }

    /// Create an empty table from plain column names
    pub fn with_columns<I>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::new(TableMetadata::with_column_names(name, columns))
    }

    /// Match column names exactly instead of ignoring ASCII case
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Declare the primary key
    pub fn primary_key<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.metadata = self.metadata.primary_key(columns);
        self
    }

    /// Append a row, builder style
    pub fn row<I>(mut self, values: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.add_row(values.into_iter().map(Into::into).collect())?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut TableMetadata {
        &mut self.metadata
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.metadata.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.metadata.column_names()
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.metadata
            .column_index(column, self.case_sensitive)
            .ok_or_else(|| DataSetError::NoSuchColumn {
                table: self.name().to_string(),
                column: column.to_string(),
            })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.metadata
            .column_index(column, self.case_sensitive)
            .is_some()
    }

    /// Append a row; it must have one value per column
    pub fn add_row(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.metadata.columns.len() {
            return Err(DataSetError::ColumnCount {
                table: self.name().to_string(),
                expected: self.metadata.columns.len(),
                actual: values.len(),
            });
        }
        self.rows.push(values);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Value>> {
        &mut self.rows
    }

    pub fn row_values(&self, row: usize) -> Result<&[Value]> {
        self.rows
            .get(row)
            .map(Vec::as_slice)
            .ok_or_else(|| DataSetError::RowOutOfBounds {
                table: self.name().to_string(),
                row,
            })
    }

    /// Value at `row` in `column`
    pub fn value(&self, row: usize, column: &str) -> Result<&Value> {
        let idx = self.column_index(column)?;
        Ok(&self.row_values(row)?[idx])
    }

    /// Primary key of `row`
    pub fn row_key(&self, row: usize) -> Result<RowKey> {
        if !self.metadata.has_primary_key() {
            return Err(DataSetError::NoPrimaryKey(self.name().to_string()));
        }
        let values = self.row_values(row)?;
        let key = self
            .metadata
            .primary_key
            .iter()
            .map(|c| self.column_index(c).map(|idx| values[idx].clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(RowKey::new(key))
    }

    /// Keep only the rows for which `keep` returns true
    pub fn retain_rows(&mut self, mut keep: impl FnMut(usize, &[Value]) -> bool) {
        let mut idx = 0;
        self.rows.retain(|row| {
            let kept = keep(idx, row);
            idx += 1;
            kept
        });
    }

    pub fn into_parts(self) -> (TableMetadata, Vec<Vec<Value>>) {
        (self.metadata, self.rows)
    }
}
