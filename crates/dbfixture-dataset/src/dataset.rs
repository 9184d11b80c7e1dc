//! Ordered collection of tables

use crate::error::{DataSetError, Result};
use crate::table::Table;
use dbfixture_core::{FixtureConfig, name_key, names_match};
use indexmap::IndexMap;

/// An ordered set of tables, looked up by name.
///
/// Names ignore ASCII case unless the dataset is case sensitive. Adding a
/// table whose name is already present appends its rows to the existing table
/// when both have the same columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    tables: IndexMap<String, Table>,
    case_sensitive: bool,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty dataset following `config`'s name matching
    pub fn with_config(config: &FixtureConfig) -> Self {
        Self {
            tables: IndexMap::new(),
            case_sensitive: config.case_sensitive_table_names,
        }
    }

    /// Build a dataset from tables, merging repeated names
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Result<Self> {
        let mut dataset = Self::new();
        for table in tables {
            dataset.add_table(table)?;
        }
        Ok(dataset)
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn key(&self, name: &str) -> String {
        name_key(name, self.case_sensitive)
    }

    /// Add a table, or append its rows to the table of the same name
    pub fn add_table(&mut self, table: Table) -> Result<()> {
        let table = table.case_sensitive(self.case_sensitive);
        let key = self.key(table.name());
        let Some(existing) = self.tables.get_mut(&key) else {
            self.tables.insert(key, table);
            return Ok(());
        };

        let same_columns = existing.columns().len() == table.columns().len()
            && existing
                .columns()
                .iter()
                .zip(table.columns())
                .all(|(a, b)| names_match(&a.name, &b.name, self.case_sensitive));
        if !same_columns {
            return Err(DataSetError::AmbiguousTable {
                table: table.name().to_string(),
                reason: format!(
                    "columns [{}] differ from [{}]",
                    table.column_names().join(", "),
                    existing.column_names().join(", ")
                ),
            });
        }

        tracing::trace!(table = %existing.name(), rows = table.row_count(), "merging table rows");
        let (_, rows) = table.into_parts();
        existing.rows_mut().extend(rows);
        Ok(())
    }

    /// Replace the table of the same name, or add it
    pub fn put_table(&mut self, table: Table) {
        let table = table.case_sensitive(self.case_sensitive);
        let key = self.key(table.name());
        self.tables.insert(key, table);
    }

    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        let key = self.key(name);
        self.tables.shift_remove(&key)
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(&self.key(name))
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.get(name)
            .ok_or_else(|| DataSetError::NoSuchTable(name.to_string()))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        let key = self.key(name);
        self.tables
            .get_mut(&key)
            .ok_or_else(|| DataSetError::NoSuchTable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(&self.key(name))
    }

    /// Tables in insertion order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.values_mut()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.values().map(Table::name).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of rows across tables
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Table::row_count).sum()
    }

    /// Same tables, reordered by `names`; names not in the dataset fail
    pub fn reordered<S: AsRef<str>>(&self, names: &[S]) -> Result<DataSet> {
        let mut dataset = DataSet {
            tables: IndexMap::new(),
            case_sensitive: self.case_sensitive,
        };
        for name in names {
            dataset.put_table(self.table(name.as_ref())?.clone());
        }
        Ok(dataset)
    }
}

impl IntoIterator for DataSet {
    type Item = Table;
    type IntoIter = indexmap::map::IntoValues<String, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbfixture_core::Value;
    use pretty_assertions::assert_eq;

    fn people(rows: &[i64]) -> Table {
        rows.iter().fold(Table::with_columns("people", ["id", "name"]), |t, id| {
            t.row([Value::from(*id), Value::from(format!("p{id}"))]).unwrap()
        })
    }

    #[test]
    fn test_lookup_ignores_case() {
        let dataset = DataSet::from_tables([people(&[1])]).unwrap();
        assert!(dataset.contains("PEOPLE"));
        assert_eq!(dataset.table("People").unwrap().row_count(), 1);
        assert!(matches!(dataset.table("pets"), Err(DataSetError::NoSuchTable(_))));
    }

    #[test]
    fn test_same_name_tables_merge_rows() {
        let dataset = DataSet::from_tables([people(&[1]), people(&[2, 3])]).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.table("people").unwrap().row_count(), 3);
    }

    #[test]
    fn test_same_name_with_other_columns_is_ambiguous() {
        let other = Table::with_columns("PEOPLE", ["id", "email"]);
        let err = DataSet::from_tables([people(&[1]), other]).unwrap_err();
        assert!(matches!(err, DataSetError::AmbiguousTable { .. }));
    }

    #[test]
    fn test_case_sensitive_dataset_keeps_names_apart() {
        let config = FixtureConfig::default().case_sensitive();
        let mut dataset = DataSet::with_config(&config);
        dataset.add_table(people(&[1])).unwrap();
        dataset
            .add_table(Table::with_columns("PEOPLE", ["id"]))
            .unwrap();
        assert_eq!(dataset.table_names(), vec!["people", "PEOPLE"]);
    }

    #[test]
    fn test_reordered() {
        let dataset = DataSet::from_tables([
            Table::with_columns("a", ["id"]),
            Table::with_columns("b", ["id"]),
        ])
        .unwrap();
        assert_eq!(dataset.reordered(&["b", "a"]).unwrap().table_names(), vec!["b", "a"]);
        assert!(dataset.reordered(&["c"]).is_err());
    }
}
