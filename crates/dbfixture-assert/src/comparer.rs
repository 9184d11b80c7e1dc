//! Value comparers
//!
//! A comparer judges one actual cell against its expected cell and explains
//! a failure. Expected values usually come from fixture files as text while
//! actual values come typed from the database, so most comparers line the two
//! up with `Value::matches` / `Value::compare_loose` before judging.

use chrono::{NaiveDateTime, Timelike};
use dbfixture_core::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Judges an actual value against an expected one
pub trait ValueComparer: Send + Sync {
    /// `None` when `actual` is acceptable, otherwise why it is not
    fn compare(&self, expected: &Value, actual: &Value) -> Option<String>;

    /// Short description used in reports
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn ValueComparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueComparer({})", self.name())
    }
}

/// Shared handle to a comparer
pub type SharedComparer = Arc<dyn ValueComparer>;

/// Actual equals expected, text coerced to the actual value's type
#[derive(Debug, Clone, Copy, Default)]
pub struct Equal;

impl ValueComparer for Equal {
    fn compare(&self, expected: &Value, actual: &Value) -> Option<String> {
        (!expected.matches(actual)).then(|| format!("expected {expected}, found {actual}"))
    }

    fn name(&self) -> &str {
        "equal"
    }
}

/// Actual equals expected exactly, without coercion; NULL only matches NULL
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualWithNull;

impl ValueComparer for EqualWithNull {
    fn compare(&self, expected: &Value, actual: &Value) -> Option<String> {
        match (expected.is_null(), actual.is_null()) {
            (true, true) => None,
            (true, false) => Some(format!("expected NULL, found {actual}")),
            (false, true) => Some(format!("expected {expected}, found NULL")),
            (false, false) => {
                (expected != actual).then(|| format!("expected exactly {expected}, found {actual}"))
            }
        }
    }

    fn name(&self) -> &str {
        "equal with null"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotEqual;

impl ValueComparer for NotEqual {
    fn compare(&self, expected: &Value, actual: &Value) -> Option<String> {
        expected
            .matches(actual)
            .then(|| format!("expected a value other than {expected}"))
    }

    fn name(&self) -> &str {
        "not equal"
    }
}

/// Relational check of actual against expected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl Relation {
    fn holds(self, actual_vs_expected: Ordering) -> bool {
        match self {
            Relation::GreaterThan => actual_vs_expected == Ordering::Greater,
            Relation::GreaterOrEqual => actual_vs_expected != Ordering::Less,
            Relation::LessThan => actual_vs_expected == Ordering::Less,
            Relation::LessOrEqual => actual_vs_expected != Ordering::Greater,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Relation::GreaterThan => ">",
            Relation::GreaterOrEqual => ">=",
            Relation::LessThan => "<",
            Relation::LessOrEqual => "<=",
        }
    }
}

impl ValueComparer for Relation {
    fn compare(&self, expected: &Value, actual: &Value) -> Option<String> {
        match actual.compare_loose(expected) {
            Some(ordering) if self.holds(ordering) => None,
            Some(_) => Some(format!("expected {actual} {} {expected}", self.symbol())),
            None => Some(format!(
                "cannot compare {actual} {} {expected}",
                self.symbol()
            )),
        }
    }

    fn name(&self) -> &str {
        self.symbol()
    }
}

/// Actual text contains expected text
#[derive(Debug, Clone, Copy, Default)]
pub struct Contains;

impl ValueComparer for Contains {
    fn compare(&self, expected: &Value, actual: &Value) -> Option<String> {
        if actual.is_null() || expected.is_null() {
            return Some(format!("expected {actual} to contain {expected}"));
        }
        (!actual.to_string().contains(&expected.to_string()))
            .then(|| format!("expected '{actual}' to contain '{expected}'"))
    }

    fn name(&self) -> &str {
        "contains"
    }
}

/// Actual is within `percent` of expected
#[derive(Debug, Clone, Copy)]
pub struct WithinPercent {
    pub percent: f64,
}

impl ValueComparer for WithinPercent {
    fn compare(&self, expected: &Value, actual: &Value) -> Option<String> {
        let (Some(e), Some(a)) = (expected.as_f64(), actual.as_f64()) else {
            return Some(format!("{actual} and {expected} are not both numeric"));
        };
        let tolerance = (e * self.percent / 100.0).abs();
        ((a - e).abs() > tolerance)
            .then(|| format!("expected {actual} within {}% of {expected}", self.percent))
    }

    fn name(&self) -> &str {
        "within percent"
    }
}

/// Timestamps equal once milliseconds and smaller units are dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampIgnoreMillis;

fn whole_seconds(value: &Value) -> Option<NaiveDateTime> {
    let timestamp = match value {
        Value::DateTime(dt) => Some(*dt),
        Value::DateTimeUtc(dt) => Some(dt.naive_utc()),
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::String(text) => match Value::DateTime(NaiveDateTime::default()).parse_like(text) {
            Some(Value::DateTime(dt)) => Some(dt),
            _ => None,
        },
        _ => None,
    }?;
    timestamp.with_nanosecond(0)
}

impl ValueComparer for TimestampIgnoreMillis {
    fn compare(&self, expected: &Value, actual: &Value) -> Option<String> {
        if expected.is_null() && actual.is_null() {
            return None;
        }
        match (whole_seconds(expected), whole_seconds(actual)) {
            (Some(e), Some(a)) if e == a => None,
            (Some(_), Some(_)) => Some(format!("expected {expected} ignoring millis, found {actual}")),
            _ => Some(format!("{actual} and {expected} are not both timestamps")),
        }
    }

    fn name(&self) -> &str {
        "timestamp ignoring millis"
    }
}

/// Comparer backed by a closure
pub struct FnComparer<F> {
    name: String,
    check: F,
}

impl<F> FnComparer<F>
where
    F: Fn(&Value, &Value) -> Option<String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> ValueComparer for FnComparer<F>
where
    F: Fn(&Value, &Value) -> Option<String> + Send + Sync,
{
    fn compare(&self, expected: &Value, actual: &Value) -> Option<String> {
        (self.check)(expected, actual)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Constructors for the built-in comparers
pub mod comparers {
    use super::*;

    pub fn equal() -> SharedComparer {
        Arc::new(Equal)
    }

    pub fn equal_with_null() -> SharedComparer {
        Arc::new(EqualWithNull)
    }

    pub fn not_equal() -> SharedComparer {
        Arc::new(NotEqual)
    }

    pub fn greater_than() -> SharedComparer {
        Arc::new(Relation::GreaterThan)
    }

    pub fn greater_or_equal() -> SharedComparer {
        Arc::new(Relation::GreaterOrEqual)
    }

    pub fn less_than() -> SharedComparer {
        Arc::new(Relation::LessThan)
    }

    pub fn less_or_equal() -> SharedComparer {
        Arc::new(Relation::LessOrEqual)
    }

    pub fn contains() -> SharedComparer {
        Arc::new(Contains)
    }

    pub fn within_percent(percent: f64) -> SharedComparer {
        Arc::new(WithinPercent { percent })
    }

    pub fn timestamp_ignore_millis() -> SharedComparer {
        Arc::new(TimestampIgnoreMillis)
    }

    pub fn custom<F>(name: impl Into<String>, check: F) -> SharedComparer
    where
        F: Fn(&Value, &Value) -> Option<String> + Send + Sync + 'static,
    {
        Arc::new(FnComparer::new(name, check))
    }
}

#[cfg(test)]
mod tests {
    use super::comparers::*;
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn ts(h: u32, m: u32, s: u32, ms: u32) -> Value {
        Value::DateTime(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .and_then(|d| d.and_hms_milli_opt(h, m, s, ms))
                .unwrap(),
        )
    }

    #[test]
    fn test_equal_coerces_fixture_text() {
        assert!(equal().compare(&Value::from("42"), &Value::from(42i64)).is_none());
        assert!(equal().compare(&Value::Null, &Value::Null).is_none());
        assert!(equal().compare(&Value::from("42"), &Value::from(43i64)).is_some());
        assert!(equal().compare(&Value::Null, &Value::from("")).is_some());
    }

    #[test]
    fn test_equal_with_null_is_exact() {
        let c = equal_with_null();
        assert!(c.compare(&Value::Null, &Value::Null).is_none());
        assert!(c.compare(&Value::Null, &Value::from(1i64)).is_some());
        assert!(c.compare(&Value::from(1i64), &Value::Null).is_some());
        assert!(c.compare(&Value::from("1"), &Value::from(1i64)).is_some());
        assert!(c.compare(&Value::from(1i64), &Value::from(1i64)).is_none());
    }

    #[rstest]
    #[case(greater_than(), 5, 6, true)]
    #[case(greater_than(), 5, 5, false)]
    #[case(greater_or_equal(), 5, 5, true)]
    #[case(less_than(), 5, 4, true)]
    #[case(less_than(), 5, 5, false)]
    #[case(less_or_equal(), 5, 5, true)]
    #[case(less_or_equal(), 5, 6, false)]
    fn test_relations(
        #[case] comparer: SharedComparer,
        #[case] expected: i64,
        #[case] actual: i64,
        #[case] passes: bool,
    ) {
        let outcome = comparer.compare(&Value::from(expected.to_string()), &Value::from(actual));
        assert_eq!(outcome.is_none(), passes, "{outcome:?}");
    }

    #[test]
    fn test_relations_fail_on_null() {
        assert!(greater_than().compare(&Value::from(1i64), &Value::Null).is_some());
    }

    #[test]
    fn test_not_equal_and_contains() {
        assert!(not_equal().compare(&Value::from("a"), &Value::from("b")).is_none());
        assert!(not_equal().compare(&Value::from("1"), &Value::from(1i64)).is_some());
        assert!(contains().compare(&Value::from("lo w"), &Value::from("hello world")).is_none());
        assert!(contains().compare(&Value::from("xyz"), &Value::from("hello")).is_some());
    }

    #[test]
    fn test_within_percent() {
        let c = within_percent(10.0);
        assert!(c.compare(&Value::from(100i64), &Value::from(109.5)).is_none());
        assert!(c.compare(&Value::from("100"), &Value::from(111i64)).is_some());
        assert!(c.compare(&Value::from(100i64), &Value::from("abc")).is_some());
    }

    #[test]
    fn test_timestamp_ignore_millis() {
        let c = timestamp_ignore_millis();
        assert!(c.compare(&ts(10, 0, 1, 0), &ts(10, 0, 1, 999)).is_none());
        assert!(c.compare(&ts(10, 0, 1, 0), &ts(10, 0, 2, 0)).is_some());
        assert!(c.compare(&Value::from("2024-05-01 10:00:01"), &ts(10, 0, 1, 250)).is_none());
    }

    #[test]
    fn test_custom_comparer() {
        let c = custom("same length", |e: &Value, a: &Value| {
            (e.to_string().len() != a.to_string().len()).then(|| "length differs".to_string())
        });
        assert_eq!(c.name(), "same length");
        assert!(c.compare(&Value::from("abc"), &Value::from("xyz")).is_none());
        assert_eq!(c.compare(&Value::from("a"), &Value::from("xyz")), Some("length differs".into()));
    }
}
