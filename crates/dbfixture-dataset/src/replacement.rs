//! Placeholder replacement in fixture data
//!
//! Fixture files often use markers such as `[NULL]` or `[now]` for values
//! that cannot be written literally. A `ReplacementDataSet` rewrites string
//! cells: whole-value replacements first, then substring replacements.

use crate::dataset::DataSet;
use crate::table::Table;
use dbfixture_core::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplacementDataSet {
    objects: Vec<(String, Value)>,
    substrings: Vec<(String, String)>,
    /// Only replace substrings between these delimiters, e.g. `${` and `}`
    delimiters: Option<(String, String)>,
}

impl ReplacementDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace cells whose whole text equals `marker` with `value`
    pub fn replace(mut self, marker: impl Into<String>, value: impl Into<Value>) -> Self {
        self.objects.push((marker.into(), value.into()));
        self
    }

    /// Replace every occurrence of `from` inside string cells with `to`
    pub fn replace_substring(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.substrings.push((from.into(), to.into()));
        self
    }

    /// Restrict substring replacement to `start<from>end` occurrences
    pub fn with_delimiters(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.delimiters = Some((start.into(), end.into()));
        self
    }

    /// The replaced form of one cell
    pub fn replace_value(&self, value: &Value) -> Value {
        let Value::String(text) = value else {
            return value.clone();
        };
        if let Some((_, replacement)) = self.objects.iter().find(|(marker, _)| marker == text) {
            return replacement.clone();
        }
        if self.substrings.is_empty() {
            return value.clone();
        }

        let mut text = text.clone();
        for (from, to) in &self.substrings {
            let from = match &self.delimiters {
                Some((start, end)) => format!("{start}{from}{end}"),
                None => from.clone(),
            };
            if !from.is_empty() {
                text = text.replace(&from, to);
            }
        }
        Value::String(text)
    }

    pub fn apply_table(&self, table: &Table) -> Table {
        let mut replaced = table.clone();
        for row in replaced.rows_mut() {
            for cell in row.iter_mut() {
                *cell = self.replace_value(cell);
            }
        }
        replaced
    }

    /// Copy of `dataset` with every string cell replaced
    pub fn apply(&self, dataset: &DataSet) -> DataSet {
        let mut replaced = dataset.clone();
        for table in replaced.tables_mut() {
            *table = self.apply_table(table);
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_whole_value_replacement() {
        let replacements = ReplacementDataSet::new().replace("[NULL]", Value::Null);
        assert_eq!(replacements.replace_value(&Value::from("[NULL]")), Value::Null);
        assert_eq!(
            replacements.replace_value(&Value::from("x [NULL]")),
            Value::from("x [NULL]")
        );
        assert_eq!(replacements.replace_value(&Value::from(3i64)), Value::from(3i64));
    }

    #[test]
    fn test_substring_replacement_with_delimiters() {
        let replacements = ReplacementDataSet::new()
            .replace_substring("user", "ada")
            .with_delimiters("${", "}");
        assert_eq!(
            replacements.replace_value(&Value::from("hello ${user}, user")),
            Value::from("hello ada, user")
        );
    }

    #[test]
    fn test_apply_to_dataset() {
        let table = Table::with_columns("t", ["id", "note"])
            .row(["1", "[NULL]"])
            .unwrap();
        let dataset = DataSet::from_tables([table]).unwrap();
        let replaced = ReplacementDataSet::new()
            .replace("[NULL]", Value::Null)
            .apply(&dataset);

        assert_eq!(replaced.table("t").unwrap().value(0, "note").unwrap(), &Value::Null);
        // the source is untouched
        assert_eq!(dataset.table("t").unwrap().value(0, "note").unwrap(), &Value::from("[NULL]"));
    }
}
