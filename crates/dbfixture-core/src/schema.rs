//! Table metadata types and the provider traits consumed by the search engine

use crate::{DataType, Result, RowKey, Value};
use serde::{Deserialize, Serialize};

/// Column metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name
    pub name: String,
    /// Mapped data type
    #[serde(default)]
    pub data_type: DataType,
    /// Native type name as reported by the database, if known
    #[serde(default)]
    pub native_type: Option<String>,
    /// Whether the column can be NULL
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnMeta {
    /// Create a nullable column of unknown type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Unknown,
            native_type: None,
            nullable: true,
        }
    }

    /// Set the data type
    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Set the native type name
    pub fn with_native_type(mut self, native_type: impl Into<String>) -> Self {
        self.native_type = Some(native_type.into());
        self
    }

    /// Mark the column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Foreign key information
///
/// The table that declares the key is the "child"; `referenced_table` is the
/// "parent". `columns[i]` references `referenced_columns[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

impl ForeignKeyInfo {
    /// Create a foreign key from `columns` to `referenced_table(referenced_columns)`
    pub fn new<C, R>(columns: C, referenced_table: impl Into<String>, referenced_columns: R) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            referenced_table: referenced_table.into(),
            referenced_columns: referenced_columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the constraint name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Everything the framework needs to know about a table's shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

impl TableMetadata {
    /// Create metadata for a table without columns or keys
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Create metadata from plain column names
    pub fn with_column_names<I>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut meta = Self::new(name);
        meta.columns = columns.into_iter().map(ColumnMeta::new).collect();
        meta
    }

    /// Add a column
    pub fn column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    /// Declare the primary key columns
    pub fn primary_key<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a foreign key
    pub fn foreign_key(mut self, fk: ForeignKeyInfo) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of a column, matched case-insensitively unless `case_sensitive`
    pub fn column_index(&self, name: &str, case_sensitive: bool) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| names_match(&c.name, name, case_sensitive))
    }

    /// Whether the table has a declared primary key
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}

/// Compare two identifiers, ignoring ASCII case unless `case_sensitive`
pub fn names_match(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// Normalized lookup key for an identifier
pub fn name_key(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_ascii_uppercase()
    }
}

/// Source of table metadata (column names, primary and foreign keys)
///
/// Implemented by in-memory datasets and by live database connections.
/// Methods fail with `FixtureError::TableNotFound` for unknown tables.
pub trait MetadataProvider {
    /// Names of every table known to the provider
    fn table_names(&self) -> Result<Vec<String>>;

    /// Columns of a table in declaration order
    fn columns(&self, table: &str) -> Result<Vec<ColumnMeta>>;

    /// Primary key columns of a table (empty when none is declared)
    fn primary_key_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Foreign keys declared by a table (its imported keys)
    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>>;

    /// Full metadata for a table
    fn table_metadata(&self, table: &str) -> Result<TableMetadata> {
        Ok(TableMetadata {
            name: table.to_string(),
            columns: self.columns(table)?,
            primary_key: self.primary_key_columns(table)?,
            foreign_keys: self.foreign_keys(table)?,
        })
    }
}

/// Source of rows, queried by key without materializing full rows
pub trait RowSource {
    /// Primary keys of the rows of `table` whose `columns` equal `values`.
    ///
    /// A NULL in `values` matches nothing.
    fn keys_matching(&self, table: &str, columns: &[String], values: &[Value])
    -> Result<Vec<RowKey>>;

    /// Values of `columns` for the row identified by `key`, or `None` when the
    /// row does not exist.
    fn row_values(&self, table: &str, key: &RowKey, columns: &[String])
    -> Result<Option<Vec<Value>>>;
}

impl<T: MetadataProvider + ?Sized> MetadataProvider for &T {
    fn table_names(&self) -> Result<Vec<String>> {
        (**self).table_names()
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnMeta>> {
        (**self).columns(table)
    }

    fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        (**self).primary_key_columns(table)
    }

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        (**self).foreign_keys(table)
    }

    fn table_metadata(&self, table: &str) -> Result<TableMetadata> {
        (**self).table_metadata(table)
    }
}

impl<T: RowSource + ?Sized> RowSource for &T {
    fn keys_matching(
        &self,
        table: &str,
        columns: &[String],
        values: &[Value],
    ) -> Result<Vec<RowKey>> {
        (**self).keys_matching(table, columns, values)
    }

    fn row_values(
        &self,
        table: &str,
        key: &RowKey,
        columns: &[String],
    ) -> Result<Option<Vec<Value>>> {
        (**self).row_values(table, key, columns)
    }
}
