use dbfixture_core::Value;
use std::fmt;

/// One cell whose actual value the column's comparer rejected
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    pub table: String,
    /// Row index after sorting, when sorting is enabled
    pub row: usize,
    pub column: String,
    pub expected: Value,
    pub actual: Value,
    /// Explanation from the comparer
    pub message: String,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[row {}].{}: expected <{}> but was <{}> ({})",
            self.table, self.row, self.column, self.expected, self.actual, self.message
        )
    }
}

/// Human readable report of several differences
pub fn format_differences(differences: &[Difference]) -> String {
    let mut report = format!("{} value(s) differ:", differences.len());
    for difference in differences {
        report.push_str("\n  ");
        report.push_str(&difference.to_string());
    }
    report
}
