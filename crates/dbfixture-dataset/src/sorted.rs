//! Tables with rows in a deterministic order

use crate::error::Result;
use crate::table::Table;
use dbfixture_core::{DataType, Value};
use std::cmp::Ordering;
use std::ops::Deref;

/// A copy of a table with its rows sorted.
///
/// Rows are ordered by the primary key when one is declared, otherwise by
/// every column left to right. Text cells of typed columns are parsed first,
/// and numbers compare by magnitude, so `"10"` sorts after `"9"`.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedTable {
    table: Table,
    sort_columns: Vec<String>,
}

impl SortedTable {
    pub fn new(table: &Table) -> Result<Self> {
        let columns: Vec<String> = if table.metadata().has_primary_key() {
            table.metadata().primary_key.clone()
        } else {
            table.column_names().into_iter().map(str::to_string).collect()
        };
        Self::by_columns(table, &columns)
    }

    /// Sort by the given columns
    pub fn by_columns<S: AsRef<str>>(table: &Table, columns: &[S]) -> Result<Self> {
        let keys = columns
            .iter()
            .map(|c| {
                let idx = table.column_index(c.as_ref())?;
                Ok((idx, table.columns()[idx].data_type.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut sorted = table.clone();
        sorted.rows_mut().sort_by(|a, b| compare_rows(a, b, &keys));
        Ok(Self {
            table: sorted,
            sort_columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        })
    }

    pub fn sort_columns(&self) -> &[String] {
        &self.sort_columns
    }

    pub fn into_table(self) -> Table {
        self.table
    }
}

impl Deref for SortedTable {
    type Target = Table;

    fn deref(&self) -> &Table {
        &self.table
    }
}

fn compare_rows(a: &[Value], b: &[Value], keys: &[(usize, DataType)]) -> Ordering {
    keys.iter()
        .map(|(idx, data_type)| sort_key(&a[*idx], data_type).cmp(&sort_key(&b[*idx], data_type)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn sort_key(value: &Value, data_type: &DataType) -> Value {
    let typed = match value {
        Value::String(text) if *data_type != DataType::Unknown => {
            data_type.parse_value(text).unwrap_or_else(|_| value.clone())
        }
        _ => value.clone(),
    };
    match typed {
        Value::Int64(_) | Value::Float64(_) | Value::Decimal(_) | Value::String(_) => typed
            .as_f64()
            .map(Value::Float64)
            .unwrap_or(typed),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(table: &Table) -> Vec<Value> {
        (0..table.row_count())
            .map(|r| table.value(r, "id").unwrap().clone())
            .collect()
    }

    #[test]
    fn test_sorts_numeric_text_by_magnitude() {
        let table = Table::with_columns("t", ["id"])
            .row(["10"])
            .unwrap()
            .row(["9"])
            .unwrap()
            .row(["100"])
            .unwrap();
        let sorted = SortedTable::new(&table).unwrap();
        assert_eq!(ids(&sorted), vec![Value::from("9"), Value::from("10"), Value::from("100")]);
    }

    #[test]
    fn test_sorts_by_primary_key_when_declared() {
        let table = Table::with_columns("t", ["id", "name"])
            .primary_key(["id"])
            .row([Value::from(2i64), Value::from("a")])
            .unwrap()
            .row([Value::from(1i64), Value::from("b")])
            .unwrap();
        let sorted = SortedTable::new(&table).unwrap();
        assert_eq!(sorted.sort_columns(), ["id".to_string()]);
        assert_eq!(ids(&sorted), vec![Value::from(1i64), Value::from(2i64)]);
    }

    #[test]
    fn test_sort_by_named_columns() {
        let table = Table::with_columns("t", ["id", "name"])
            .row([Value::from(1i64), Value::from("b")])
            .unwrap()
            .row([Value::from(2i64), Value::from("a")])
            .unwrap();
        let sorted = SortedTable::by_columns(&table, &["NAME"]).unwrap();
        assert_eq!(ids(&sorted), vec![Value::from(2i64), Value::from(1i64)]);
        assert!(SortedTable::by_columns(&table, &["missing"]).is_err());
    }
}
