//! Table and dataset assertions
//!
//! A `TableAssertion` holds the comparison setup: the default comparer,
//! per-column comparers, excluded columns and row sorting. Structural
//! problems (column sets, row counts, table sets) and configuration conflicts
//! are errors; cell mismatches are collected as `Difference`s so one run
//! reports all of them.

use crate::comparer::{Equal, SharedComparer};
use crate::difference::{Difference, format_differences};
use crate::error::{AssertionError, Result};
use dbfixture_core::names_match;
use dbfixture_dataset::{DataSet, SortedTable, Table, wildcard_match};
use std::borrow::Cow;
use std::sync::Arc;

/// How rows are lined up before comparing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Sorting {
    /// Compare rows in stored order
    #[default]
    None,
    /// Sort both sides by the primary key, or by every compared column when
    /// neither side declares one
    Keys,
    /// Sort both sides by these columns
    Columns(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct TableAssertion {
    default_comparer: SharedComparer,
    column_comparers: Vec<(String, SharedComparer)>,
    excluded: Vec<String>,
    sorting: Sorting,
    case_sensitive: bool,
}

impl Default for TableAssertion {
    fn default() -> Self {
        Self {
            default_comparer: Arc::new(Equal),
            column_comparers: Vec::new(),
            excluded: Vec::new(),
            sorting: Sorting::None,
            case_sensitive: false,
        }
    }
}

impl TableAssertion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comparer for columns without their own
    pub fn with_default_comparer(mut self, comparer: SharedComparer) -> Self {
        self.default_comparer = comparer;
        self
    }

    /// Comparer for one column
    pub fn with_column_comparer(mut self, column: impl Into<String>, comparer: SharedComparer) -> Self {
        self.column_comparers.push((column.into(), comparer));
        self
    }

    /// Leave matching columns out of the comparison; `*` and `?` wildcards
    pub fn exclude_column(mut self, pattern: impl Into<String>) -> Self {
        self.excluded.push(pattern.into());
        self
    }

    pub fn with_sorting(mut self, sorting: Sorting) -> Self {
        self.sorting = sorting;
        self
    }

    /// Sort by key before comparing
    pub fn sorted(self) -> Self {
        self.with_sorting(Sorting::Keys)
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    fn is_excluded(&self, column: &str) -> bool {
        self.excluded
            .iter()
            .any(|pattern| wildcard_match(pattern, column, self.case_sensitive))
    }

    fn comparer_for(&self, column: &str) -> &SharedComparer {
        self.column_comparers
            .iter()
            .find(|(name, _)| names_match(name, column, self.case_sensitive))
            .map_or(&self.default_comparer, |(_, comparer)| comparer)
    }

    /// Fail when a column is both excluded and given its own comparer
    pub fn verify(&self) -> Result<()> {
        for (column, _) in &self.column_comparers {
            if self.is_excluded(column) {
                return Err(AssertionError::ConfigurationConflict {
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }

    fn compared_columns<'t>(&self, table: &'t Table) -> Vec<&'t str> {
        table
            .column_names()
            .into_iter()
            .filter(|c| !self.is_excluded(c))
            .collect()
    }

    fn sort_columns(&self, expected: &Table, actual: &Table, columns: &[&str]) -> Option<Vec<String>> {
        let usable = |key: &[String]| {
            !key.is_empty()
                && key
                    .iter()
                    .all(|k| columns.iter().any(|c| names_match(c, k, self.case_sensitive)))
        };
        match &self.sorting {
            Sorting::None => None,
            Sorting::Columns(columns) => Some(columns.clone()),
            Sorting::Keys => {
                let actual_key = &actual.metadata().primary_key;
                let expected_key = &expected.metadata().primary_key;
                if usable(actual_key) {
                    Some(actual_key.clone())
                } else if usable(expected_key) {
                    Some(expected_key.clone())
                } else {
                    Some(columns.iter().map(|c| c.to_string()).collect())
                }
            }
        }
    }

    /// Every cell difference between `expected` and `actual`
    pub fn compare(&self, expected: &Table, actual: &Table) -> Result<Vec<Difference>> {
        self.verify()?;
        let table_name = expected.name().to_string();

        let expected_columns = self.compared_columns(expected);
        let actual_columns = self.compared_columns(actual);
        let same_columns = expected_columns.len() == actual_columns.len()
            && expected_columns.iter().all(|e| {
                actual_columns
                    .iter()
                    .any(|a| names_match(e, a, self.case_sensitive))
            });
        if !same_columns {
            return Err(AssertionError::ColumnMismatch {
                table: table_name,
                expected: expected_columns.iter().map(|c| c.to_string()).collect(),
                actual: actual_columns.iter().map(|c| c.to_string()).collect(),
            });
        }

        if expected.row_count() != actual.row_count() {
            return Err(AssertionError::RowCountMismatch {
                table: table_name,
                expected: expected.row_count(),
                actual: actual.row_count(),
            });
        }

        let (expected, actual): (Cow<'_, Table>, Cow<'_, Table>) =
            match self.sort_columns(expected, actual, &expected_columns) {
                Some(columns) => (
                    Cow::Owned(SortedTable::by_columns(expected, &columns)?.into_table()),
                    Cow::Owned(SortedTable::by_columns(actual, &columns)?.into_table()),
                ),
                None => (Cow::Borrowed(expected), Cow::Borrowed(actual)),
            };

        let mut differences = Vec::new();
        for row in 0..expected.row_count() {
            for column in &expected_columns {
                let expected_value = expected.value(row, column)?;
                let actual_value = actual.value(row, column)?;
                if let Some(message) = self.comparer_for(column).compare(expected_value, actual_value) {
                    differences.push(Difference {
                        table: table_name.clone(),
                        row,
                        column: column.to_string(),
                        expected: expected_value.clone(),
                        actual: actual_value.clone(),
                        message,
                    });
                }
            }
        }

        tracing::debug!(
            table = %table_name,
            rows = expected.row_count(),
            differences = differences.len(),
            "compared table"
        );
        Ok(differences)
    }

    /// Compare every table of two datasets; both must hold the same tables
    pub fn compare_datasets(&self, expected: &DataSet, actual: &DataSet) -> Result<Vec<Difference>> {
        self.verify()?;
        let expected_names = expected.table_names();
        let actual_names = actual.table_names();
        let same_tables = expected_names.len() == actual_names.len()
            && expected_names.iter().all(|name| actual.contains(name));
        if !same_tables {
            return Err(AssertionError::TableMismatch {
                expected: expected_names.iter().map(|n| n.to_string()).collect(),
                actual: actual_names.iter().map(|n| n.to_string()).collect(),
            });
        }

        let mut differences = Vec::new();
        for table in expected.tables() {
            differences.extend(self.compare(table, actual.table(table.name())?)?);
        }
        Ok(differences)
    }

    /// Panic with a report of every difference between two tables
    #[track_caller]
    pub fn assert_equals(&self, expected: &Table, actual: &Table) {
        report(self.compare(expected, actual));
    }

    /// Panic with a report of every difference between two datasets
    #[track_caller]
    pub fn assert_datasets_equal(&self, expected: &DataSet, actual: &DataSet) {
        report(self.compare_datasets(expected, actual));
    }
}

#[track_caller]
fn report(outcome: Result<Vec<Difference>>) {
    match outcome {
        Err(err) => panic!("assertion setup failed: {err}"),
        Ok(differences) if !differences.is_empty() => panic!("{}", format_differences(&differences)),
        Ok(_) => {}
    }
}

/// `assert_equals` with the default setup
#[track_caller]
pub fn assert_table_equals(expected: &Table, actual: &Table) {
    TableAssertion::default().assert_equals(expected, actual);
}

/// `assert_datasets_equal` with the default setup
#[track_caller]
pub fn assert_dataset_equals(expected: &DataSet, actual: &DataSet) {
    TableAssertion::default().assert_datasets_equal(expected, actual);
}
