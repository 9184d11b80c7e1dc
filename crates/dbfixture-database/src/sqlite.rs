//! SQLite backend

use crate::connection::{Connection, QueryResult};
use crate::error::{DatabaseError, Result};
use dbfixture_core::{
    ColumnMeta, DataType, FixtureConfig, FixtureError, ForeignKeyInfo, TableMetadata,
    TypeMapperRegistry, Value,
};
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{OpenFlags, params_from_iter};
use std::path::Path;

const PRODUCT_NAME: &str = "SQLite";

/// SQLite connection with foreign key enforcement switched on
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
    types: TypeMapperRegistry,
    product: String,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("product", &self.product)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>, config: &FixtureConfig) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening SQLite database");
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = rusqlite::Connection::open_with_flags(path, flags)?;
        Self::from_connection(conn, config)
    }

    pub fn open_in_memory(config: &FixtureConfig) -> Result<Self> {
        tracing::debug!("opening in-memory SQLite database");
        Self::from_connection(rusqlite::Connection::open_in_memory()?, config)
    }

    fn from_connection(conn: rusqlite::Connection, config: &FixtureConfig) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
            types: TypeMapperRegistry::with_builtin_mappers(),
            product: config
                .datatype_product
                .clone()
                .unwrap_or_else(|| PRODUCT_NAME.to_string()),
        })
    }

    /// Replace the type mapper registry used to type columns
    pub fn with_type_registry(mut self, types: TypeMapperRegistry) -> Self {
        self.types = types;
        self
    }

    /// Run several `;`-separated statements, typically a schema script
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!("executing SQL batch");
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    fn data_type(&self, native_type: &str) -> DataType {
        self.types.resolve(&self.product).data_type(native_type)
    }
}

impl Connection for SqliteConnection {
    fn product_name(&self) -> &str {
        &self.product
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let conn = self.conn.lock();
        let affected = conn.execute(sql, params_from_iter(params.iter().map(to_sqlite)))?;
        tracing::debug!(affected_rows = affected, "statement executed");
        Ok(affected as u64)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;

        let columns: Vec<ColumnMeta> = stmt
            .columns()
            .iter()
            .map(|col| match col.decl_type() {
                Some(native) => ColumnMeta::new(col.name())
                    .with_type(self.data_type(native))
                    .with_native_type(native),
                None => ColumnMeta::new(col.name()),
            })
            .collect();

        let mut rows = Vec::new();
        let mut cursor = stmt.query(params_from_iter(params.iter().map(to_sqlite)))?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                values.push(from_sqlite(row.get_ref(idx)?, &column.data_type));
            }
            rows.push(values);
        }

        tracing::debug!(row_count = rows.len(), "query executed");
        Ok(QueryResult { columns, rows })
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    #[tracing::instrument(skip(self))]
    fn table_metadata(&self, table: &str) -> Result<TableMetadata> {
        let conn = self.conn.lock();

        let name: Option<String> = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            )?
            .query_map([table], |row| row.get(0))?
            .next()
            .transpose()?;
        let Some(name) = name else {
            return Err(FixtureError::TableNotFound(table.to_string()).into());
        };

        let mut metadata = TableMetadata::new(name.clone());
        let mut key: Vec<(i64, String)> = Vec::new();
        let mut stmt =
            conn.prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid")?;
        let mut cursor = stmt.query([&name])?;
        while let Some(row) = cursor.next()? {
            let column: String = row.get(0)?;
            let native: Option<String> = row.get(1)?;
            let not_null: i64 = row.get(2)?;
            let key_position: i64 = row.get(3)?;

            let mut meta = ColumnMeta::new(column.clone());
            if let Some(native) = native.filter(|n| !n.is_empty()) {
                meta = meta.with_type(self.data_type(&native)).with_native_type(native);
            }
            if not_null != 0 {
                meta = meta.not_null();
            }
            if key_position > 0 {
                key.push((key_position, column));
            }
            metadata = metadata.column(meta);
        }
        key.sort();
        metadata.primary_key = key.into_iter().map(|(_, column)| column).collect();

        // one row per column pair, grouped by constraint id
        let mut stmt = conn.prepare(
            "SELECT id, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
        )?;
        let mut cursor = stmt.query([&name])?;
        let mut current: Option<(i64, String, Vec<String>, Vec<Option<String>>)> = None;
        let mut grouped = Vec::new();
        while let Some(row) = cursor.next()? {
            let id: i64 = row.get(0)?;
            let parent: String = row.get(1)?;
            let from: String = row.get(2)?;
            let to: Option<String> = row.get(3)?;
            match current.as_mut() {
                Some((current_id, _, from_columns, to_columns)) if *current_id == id => {
                    from_columns.push(from);
                    to_columns.push(to);
                }
                _ => {
                    grouped.extend(current.take());
                    current = Some((id, parent, vec![from], vec![to]));
                }
            }
        }
        grouped.extend(current);

        for (id, parent, from_columns, to_columns) in grouped {
            // a missing target column means the parent's primary key
            let referenced: Vec<String> = to_columns.into_iter().collect::<Option<_>>().unwrap_or_default();
            metadata = metadata.foreign_key(
                ForeignKeyInfo::new(from_columns, parent, referenced).named(format!("fk_{name}_{id}")),
            );
        }

        tracing::trace!(
            table = %name,
            columns = metadata.columns.len(),
            foreign_keys = metadata.foreign_keys.len(),
            "read table metadata"
        );
        Ok(metadata)
    }

    fn begin(&self) -> Result<()> {
        tracing::debug!("beginning SQLite transaction");
        self.conn
            .lock()
            .execute_batch("BEGIN DEFERRED")
            .map_err(|e| DatabaseError::Transaction(format!("failed to begin transaction: {e}")))
    }

    fn commit(&self) -> Result<()> {
        tracing::debug!("committing SQLite transaction");
        self.conn
            .lock()
            .execute_batch("COMMIT")
            .map_err(|e| DatabaseError::Transaction(format!("failed to commit transaction: {e}")))
    }

    fn rollback(&self) -> Result<()> {
        tracing::debug!("rolling back SQLite transaction");
        self.conn
            .lock()
            .execute_batch("ROLLBACK")
            .map_err(|e| DatabaseError::Transaction(format!("failed to roll back transaction: {e}")))
    }

    fn truncate_statement(&self, table: &str) -> String {
        format!("DELETE FROM {}", self.quote_identifier(table))
    }
}

fn to_sqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Int64(i) => Sql::Integer(*i),
        Value::Float64(f) => Sql::Real(*f),
        Value::Decimal(d) => Sql::Text(d.clone()),
        Value::String(s) => Sql::Text(s.clone()),
        Value::Bytes(b) => Sql::Blob(b.clone()),
        Value::Uuid(u) => Sql::Text(u.to_string()),
        Value::Date(d) => Sql::Text(d.to_string()),
        Value::Time(t) => Sql::Text(t.to_string()),
        Value::DateTime(dt) => Sql::Text(dt.to_string()),
        Value::DateTimeUtc(dt) => Sql::Text(dt.to_rfc3339()),
    }
}

/// Read a stored value, typed by its column's declared type
fn from_sqlite(value: ValueRef<'_>, data_type: &DataType) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => match data_type {
            DataType::Boolean => Value::Bool(i != 0),
            DataType::Real | DataType::Float | DataType::Double => Value::Float64(i as f64),
            _ => Value::Int64(i),
        },
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            match data_type {
                DataType::Boolean
                | DataType::Date
                | DataType::Time
                | DataType::Timestamp
                | DataType::TimestampWithTimeZone
                | DataType::Uuid => data_type
                    .parse_value(&text)
                    .unwrap_or_else(|_| Value::String(text.into_owned())),
                _ => Value::String(text.into_owned()),
            }
        }
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn connection() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory(&FixtureConfig::default()).unwrap();
        conn.execute_batch(
            "CREATE TABLE parent (a INTEGER, b TEXT, label VARCHAR(20) NOT NULL, PRIMARY KEY (a, b));
             CREATE TABLE child (
                 id INTEGER PRIMARY KEY,
                 pa INTEGER,
                 pb TEXT,
                 owner_id INTEGER REFERENCES child,
                 created TIMESTAMP,
                 active BOOLEAN,
                 FOREIGN KEY (pa, pb) REFERENCES parent (a, b)
             );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_table_metadata_reads_keys() {
        let conn = connection();
        let meta = conn.table_metadata("CHILD").unwrap();

        assert_eq!(meta.name, "child");
        assert_eq!(meta.primary_key, vec!["id"]);
        assert_eq!(meta.columns[4].data_type, DataType::Timestamp);
        assert_eq!(meta.foreign_keys.len(), 2);

        let composite = meta
            .foreign_keys
            .iter()
            .find(|fk| fk.referenced_table == "parent")
            .unwrap();
        assert_eq!(composite.columns, vec!["pa", "pb"]);
        assert_eq!(composite.referenced_columns, vec!["a", "b"]);

        let self_ref = meta
            .foreign_keys
            .iter()
            .find(|fk| fk.referenced_table == "child")
            .unwrap();
        assert!(self_ref.referenced_columns.is_empty());

        let parent = conn.table_metadata("parent").unwrap();
        assert_eq!(parent.primary_key, vec!["a", "b"]);
        assert!(!parent.columns[2].nullable);
    }

    #[test]
    fn test_unknown_table() {
        let err = connection().table_metadata("missing").unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Fixture(FixtureError::TableNotFound(ref t)) if t == "missing"
        ));
    }

    #[test]
    fn test_values_are_typed_by_declared_type() {
        let conn = connection();
        conn.execute("INSERT INTO parent VALUES (?, ?, ?)", &[1i64.into(), "x".into(), "p".into()])
            .unwrap();
        conn.execute(
            "INSERT INTO child (id, pa, pb, created, active) VALUES (?, ?, ?, ?, ?)",
            &[
                Value::from(7i64),
                Value::from(1i64),
                Value::from("x"),
                Value::from("2024-05-01 10:00:01"),
                Value::from(true),
            ],
        )
        .unwrap();

        let result = conn
            .query("SELECT id, created, active, owner_id FROM child", &[])
            .unwrap();
        assert_eq!(result.column_names(), vec!["id", "created", "active", "owner_id"]);
        let row = &result.rows[0];
        assert_eq!(row[0], Value::Int64(7));
        assert!(matches!(row[1], Value::DateTime(_)));
        assert_eq!(row[2], Value::Bool(true));
        assert_eq!(row[3], Value::Null);
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let conn = connection();
        let err = conn.execute(
            "INSERT INTO child (id, pa, pb) VALUES (1, 9, 'nope')",
            &[],
        );
        assert!(matches!(err, Err(DatabaseError::Sqlite(_))));
    }

    #[test]
    fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.db");
        let config = FixtureConfig::default().with_datatype_product("sqlite3");
        {
            let conn = SqliteConnection::open(&path, &config).unwrap();
            assert_eq!(conn.product_name(), "sqlite3");
            conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t VALUES (5);")
                .unwrap();
        }
        let conn = SqliteConnection::open(&path, &config).unwrap();
        let result = conn.query("SELECT id FROM t", &[]).unwrap();
        assert_eq!(result.rows, vec![vec![Value::Int64(5)]]);
    }

    #[test]
    fn test_table_names_skip_internal_tables() {
        assert_eq!(connection().table_names().unwrap(), vec!["child", "parent"]);
    }
}
