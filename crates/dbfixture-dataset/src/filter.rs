//! Column and table filters
//!
//! Patterns accept `*` (any run of characters) and `?` (one character). An
//! empty include list accepts everything; excludes always win over includes.

use crate::dataset::DataSet;
use crate::error::Result;
use crate::table::Table;
use dbfixture_core::{FixtureConfig, TableMetadata};
use dbfixture_search::{Direction, order_tables};

/// Match `text` against a `*` / `?` wildcard pattern
pub fn wildcard_match(pattern: &str, text: &str, case_sensitive: bool) -> bool {
    let fold = |c: char| if case_sensitive { c } else { c.to_ascii_uppercase() };
    let pattern: Vec<char> = pattern.chars().map(fold).collect();
    let text: Vec<char> = text.chars().map(fold).collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Patterns {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl Patterns {
    fn accepts(&self, name: &str, case_sensitive: bool) -> bool {
        let included = self.include.is_empty()
            || self
                .include
                .iter()
                .any(|p| wildcard_match(p, name, case_sensitive));
        included
            && !self
                .exclude
                .iter()
                .any(|p| wildcard_match(p, name, case_sensitive))
    }
}

/// Keeps or drops columns by name pattern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilter {
    patterns: Patterns,
}

impl ColumnFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.include.push(pattern.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.exclude.push(pattern.into());
        self
    }

    pub fn accepts(&self, column: &str, case_sensitive: bool) -> bool {
        self.patterns.accepts(column, case_sensitive)
    }

    /// Copy of `table` with only the accepted columns.
    ///
    /// Primary and foreign key columns that are filtered out are dropped from
    /// the key declarations too.
    pub fn apply(&self, table: &Table) -> Table {
        let cs = table.is_case_sensitive();
        let kept: Vec<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| self.accepts(&c.name, cs))
            .map(|(idx, _)| idx)
            .collect();

        let source = table.metadata();
        let mut metadata = TableMetadata::new(&source.name);
        metadata.columns = kept.iter().map(|&i| source.columns[i].clone()).collect();
        metadata.primary_key = source
            .primary_key
            .iter()
            .filter(|c| self.accepts(c, cs))
            .cloned()
            .collect();
        metadata.foreign_keys = source
            .foreign_keys
            .iter()
            .filter(|fk| fk.columns.iter().all(|c| self.accepts(c, cs)))
            .cloned()
            .collect();

        let mut filtered = Table::new(metadata).case_sensitive(cs);
        filtered
            .rows_mut()
            .extend(table.rows().iter().map(|row| kept.iter().map(|&i| row[i].clone()).collect()));
        filtered
    }
}

/// Keeps or drops whole tables by name pattern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    patterns: Patterns,
}

impl TableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.include.push(pattern.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.exclude.push(pattern.into());
        self
    }

    pub fn accepts(&self, table: &str, case_sensitive: bool) -> bool {
        self.patterns.accepts(table, case_sensitive)
    }

    /// Copy of `dataset` with only the accepted tables, order preserved
    pub fn apply(&self, dataset: &DataSet) -> DataSet {
        let cs = dataset.is_case_sensitive();
        let mut filtered = dataset.clone();
        for name in dataset.table_names() {
            if !self.accepts(name, cs) {
                filtered.remove_table(name);
            }
        }
        filtered
    }
}

/// Copy of `dataset` with its tables in dependency order.
///
/// Foreign keys are read from the dataset's own table metadata; references to
/// tables the dataset lacks are ignored.
pub fn sequence(dataset: &DataSet, direction: Direction, config: &FixtureConfig) -> Result<DataSet> {
    let names = dataset.table_names();
    let ordered = order_tables(dataset, &names, direction, config)?;
    tracing::debug!(?direction, tables = ?ordered, "sequenced dataset");
    dataset.reordered(&ordered)
}
