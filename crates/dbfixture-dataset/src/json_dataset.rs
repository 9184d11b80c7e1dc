//! JSON datasets: `{"table": [{"column": value, ...}, ...], ...}`
//!
//! Table and column order follow the document. Columns are the union of the
//! keys of a table's rows; absent keys read as NULL.

use crate::dataset::DataSet;
use crate::error::{DataSetError, Result};
use crate::table::Table;
use dbfixture_core::{FixtureConfig, Value};
use serde_json::{Map, Number, Value as Json};
use std::path::Path;

fn to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => n.as_f64().map_or_else(|| Value::Decimal(n.to_string()), Value::Float64),
        },
        Json::String(s) => Value::String(s.clone()),
        nested => Value::String(nested.to_string()),
    }
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int64(i) => Json::Number((*i).into()),
        Value::Float64(f) => Number::from_f64(*f).map_or_else(|| Json::String(f.to_string()), Json::Number),
        other => Json::String(other.to_string()),
    }
}

pub fn read_json_str(text: &str, config: &FixtureConfig) -> Result<DataSet> {
    let document: Map<String, Json> = serde_json::from_str(text)?;
    let mut dataset = DataSet::with_config(config);

    for (name, rows) in &document {
        let rows = rows.as_array().ok_or_else(|| {
            DataSetError::format("JSON", format!("table '{name}' is not an array of rows"))
        })?;
        let objects = rows
            .iter()
            .map(|row| {
                row.as_object().ok_or_else(|| {
                    DataSetError::format("JSON", format!("row of table '{name}' is not an object"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut columns: Vec<&str> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }

        let mut table = Table::with_columns(name.as_str(), columns.iter().copied());
        for object in objects {
            table.add_row(
                columns
                    .iter()
                    .map(|c| object.get(*c).map_or(Value::Null, to_value))
                    .collect(),
            )?;
        }
        dataset.add_table(table)?;
    }

    tracing::debug!(tables = dataset.len(), rows = dataset.row_count(), "read JSON dataset");
    Ok(dataset)
}

pub fn read_json_file(path: impl AsRef<Path>, config: &FixtureConfig) -> Result<DataSet> {
    read_json_str(&std::fs::read_to_string(path)?, config)
}

pub fn write_json_string(dataset: &DataSet) -> Result<String> {
    let mut document = Map::new();
    for table in dataset.tables() {
        let columns = table.column_names();
        let rows = table
            .rows()
            .iter()
            .map(|row| {
                Json::Object(
                    columns
                        .iter()
                        .zip(row)
                        .map(|(c, v)| (c.to_string(), to_json(v)))
                        .collect(),
                )
            })
            .collect();
        document.insert(table.name().to_string(), Json::Array(rows));
    }
    Ok(serde_json::to_string_pretty(&Json::Object(document))?)
}

pub fn write_json_file(dataset: &DataSet, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, write_json_string(dataset)?)?;
    Ok(())
}
