//! CSV directory datasets
//!
//! A dataset is a directory holding `table-ordering.txt` (one table name per
//! line) and one `<table>.csv` per table. The first record of each file names
//! the columns. Cells equal to the configured null token read as NULL.

use crate::dataset::DataSet;
use crate::error::{DataSetError, Result};
use crate::table::Table;
use dbfixture_core::{FixtureConfig, Value};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// Name of the file listing the tables of a CSV dataset, in order
pub const TABLE_ORDERING_FILE: &str = "table-ordering.txt";

fn delimiter(config: &FixtureConfig) -> Result<u8> {
    let delimiter = config.dataset.csv_delimiter;
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| DataSetError::format("CSV", format!("delimiter {delimiter:?} is not ASCII")))
}

/// Reads CSV directories and single CSV tables
pub struct CsvDataSetReader<'a> {
    config: &'a FixtureConfig,
}

impl<'a> CsvDataSetReader<'a> {
    pub fn new(config: &'a FixtureConfig) -> Self {
        Self { config }
    }

    /// Read every table listed in the directory's ordering file
    pub fn read_dir(&self, dir: impl AsRef<Path>) -> Result<DataSet> {
        let dir = dir.as_ref();
        let ordering = fs::read_to_string(dir.join(TABLE_ORDERING_FILE))?;

        let mut dataset = DataSet::with_config(self.config);
        for name in ordering.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let path = dir.join(format!("{name}.csv"));
            let file = fs::File::open(&path).map_err(|e| {
                DataSetError::format("CSV", format!("cannot open {}: {e}", path.display()))
            })?;
            dataset.add_table(self.read_table(name, file)?)?;
        }

        tracing::debug!(
            dir = %dir.display(),
            tables = dataset.len(),
            rows = dataset.row_count(),
            "read CSV dataset"
        );
        Ok(dataset)
    }

    /// Read one table; the first record is the header
    pub fn read_table(&self, name: &str, reader: impl Read) -> Result<Table> {
        let mut csv = csv::ReaderBuilder::new()
            .delimiter(delimiter(self.config)?)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if headers.is_empty() || headers.iter().any(String::is_empty) {
            return Err(DataSetError::format(
                "CSV",
                format!("table '{name}' has an empty column name"),
            ));
        }

        let null_token = &self.config.dataset.null_token;
        let mut table = Table::with_columns(name, headers);
        for record in csv.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|cell| {
                    if cell == null_token {
                        Value::Null
                    } else {
                        Value::String(cell.to_string())
                    }
                })
                .collect();
            table.add_row(row)?;
        }
        Ok(table)
    }
}

/// Writes datasets in the layout `CsvDataSetReader` reads
pub struct CsvDataSetWriter<'a> {
    config: &'a FixtureConfig,
}

impl<'a> CsvDataSetWriter<'a> {
    pub fn new(config: &'a FixtureConfig) -> Self {
        Self { config }
    }

    /// Write `dataset` into `dir`, creating it if needed
    pub fn write_dir(&self, dataset: &DataSet, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut ordering = String::new();
        for table in dataset.tables() {
            ordering.push_str(table.name());
            ordering.push('\n');
            let file = fs::File::create(dir.join(format!("{}.csv", table.name())))?;
            self.write_table(table, file)?;
        }
        fs::write(dir.join(TABLE_ORDERING_FILE), ordering)?;

        tracing::debug!(dir = %dir.display(), tables = dataset.len(), "wrote CSV dataset");
        Ok(())
    }

    pub fn write_table(&self, table: &Table, writer: impl Write) -> Result<()> {
        let mut csv = csv::WriterBuilder::new()
            .delimiter(delimiter(self.config)?)
            .from_writer(writer);

        csv.write_record(table.column_names())?;
        for row in table.rows() {
            csv.write_record(row.iter().map(|value| match value {
                Value::Null => self.config.dataset.null_token.clone(),
                other => other.to_string(),
            }))?;
        }
        csv.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_table_maps_null_token() {
        let config = FixtureConfig::default();
        let text = indoc! {"
            id,name,email
            1,Ada,null
            2,\"Hopper, Grace\",grace@example.com
        "};
        let table = CsvDataSetReader::new(&config)
            .read_table("people", text.as_bytes())
            .unwrap();

        assert_eq!(table.column_names(), vec!["id", "name", "email"]);
        assert_eq!(table.value(0, "email").unwrap(), &Value::Null);
        assert_eq!(table.value(1, "name").unwrap(), &Value::from("Hopper, Grace"));
    }

    #[test]
    fn test_custom_delimiter_and_null_token() {
        let mut config = FixtureConfig::default().with_null_token("[NULL]");
        config.dataset.csv_delimiter = ';';
        let table = CsvDataSetReader::new(&config)
            .read_table("t", "a;b\n[NULL];null\n".as_bytes())
            .unwrap();
        assert_eq!(table.rows()[0], vec![Value::Null, Value::from("null")]);
    }

    #[test]
    fn test_ragged_rows_fail() {
        let config = FixtureConfig::default();
        let err = CsvDataSetReader::new(&config)
            .read_table("t", "a,b\n1,2,3\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, DataSetError::Csv(_)));
    }

    #[test]
    fn test_directory_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = FixtureConfig::default();
        let dataset = DataSet::from_tables([
            Table::with_columns("customers", ["id", "name"])
                .row([Value::from(1i64), Value::from("Ada")])
                .unwrap(),
            Table::with_columns("orders", ["id", "note"])
                .row([Value::from(10i64), Value::Null])
                .unwrap(),
        ])
        .unwrap();

        CsvDataSetWriter::new(&config).write_dir(&dataset, dir.path()).unwrap();
        let ordering = fs::read_to_string(dir.path().join(TABLE_ORDERING_FILE)).unwrap();
        assert_eq!(ordering, "customers\norders\n");

        let read = CsvDataSetReader::new(&config).read_dir(dir.path()).unwrap();
        assert_eq!(read.table_names(), vec!["customers", "orders"]);
        assert_eq!(read.table("orders").unwrap().value(0, "note").unwrap(), &Value::Null);
        assert_eq!(read.table("orders").unwrap().value(0, "id").unwrap(), &Value::from("10"));
    }

    #[test]
    fn test_missing_table_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TABLE_ORDERING_FILE), "ghost\n").unwrap();
        let err = CsvDataSetReader::new(&FixtureConfig::default())
            .read_dir(dir.path())
            .unwrap_err();
        assert!(matches!(err, DataSetError::Format { .. }));
    }
}
