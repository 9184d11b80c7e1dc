//! Comparing expected fixture data with actual data
//!
//! Value comparers decide whether one actual cell is acceptable. A
//! `TableAssertion` applies them across tables and datasets, handling
//! excluded columns and row sorting, and reports every mismatching cell.

mod assertion;
mod comparer;
mod difference;
mod error;

pub use assertion::{Sorting, TableAssertion, assert_dataset_equals, assert_table_equals};
pub use comparer::{
    Contains, Equal, EqualWithNull, FnComparer, NotEqual, Relation, SharedComparer,
    TimestampIgnoreMillis, ValueComparer, WithinPercent, comparers,
};
pub use difference::{Difference, format_differences};
pub use error::{AssertionError, Result};
