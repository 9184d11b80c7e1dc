//! Core value types for dbfixture

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// A cell value read from a fixture file or a database
///
/// Unlike a plain SQL value, `Value` is totally ordered and hashable so it can
/// be used inside primary key sets. Floats compare by their IEEE total order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time (hour, minute, second, nanosecond)
    Time(NaiveTime),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
    /// DateTime with timezone (UTC)
    DateTimeUtc(DateTime<Utc>),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            Value::Decimal(s) | Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int64(v) => Some(*v != 0),
            Value::String(s) => parse_bool(s),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int64(_) => 2,
            Value::Float64(_) => 3,
            Value::Decimal(_) => 4,
            Value::String(_) => 5,
            Value::Bytes(_) => 6,
            Value::Uuid(_) => 7,
            Value::Date(_) => 8,
            Value::Time(_) => 9,
            Value::DateTime(_) => 10,
            Value::DateTimeUtc(_) => 11,
        }
    }

    /// Parse `text` into a value of the same kind as `self`.
    ///
    /// Fixture files carry every cell as text; this is how a textual expected
    /// value is lined up with a typed value read back from a database.
    pub fn parse_like(&self, text: &str) -> Option<Value> {
        let trimmed = text.trim();
        match self {
            Value::Null => None,
            Value::Bool(_) => parse_bool(trimmed).map(Value::Bool),
            Value::Int64(_) => trimmed.parse::<i64>().ok().map(Value::Int64),
            Value::Float64(_) => trimmed.parse::<f64>().ok().map(Value::Float64),
            Value::Decimal(_) => trimmed
                .parse::<f64>()
                .ok()
                .map(|_| Value::Decimal(trimmed.to_string())),
            Value::String(_) => Some(Value::String(text.to_string())),
            Value::Bytes(_) => BASE64.decode(trimmed).ok().map(Value::Bytes),
            Value::Uuid(_) => Uuid::parse_str(trimmed).ok().map(Value::Uuid),
            Value::Date(_) => parse_date(trimmed).map(Value::Date),
            Value::Time(_) => parse_time(trimmed).map(Value::Time),
            Value::DateTime(_) => parse_datetime(trimmed).map(Value::DateTime),
            Value::DateTimeUtc(_) => parse_datetime_utc(trimmed).map(Value::DateTimeUtc),
        }
    }

    /// Loose equality used when comparing fixture data with database data.
    ///
    /// Two values match when they are equal, when one is text that parses to
    /// the other, or when both are numeric with the same magnitude. NULL only
    /// matches NULL.
    pub fn matches(&self, other: &Value) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::String(_), Value::String(_)) => false,
            (Value::String(text), typed) | (typed, Value::String(text)) => {
                if let Some(parsed) = typed.parse_like(text) {
                    if parsed == *typed {
                        return true;
                    }
                }
                if let Value::Bytes(bytes) = typed {
                    return text.as_bytes() == bytes.as_slice();
                }
                numeric_eq(self, other)
            }
            _ => numeric_eq(self, other),
        }
    }

    /// Loose ordering used by relational value comparers.
    ///
    /// Numbers compare numerically (text included when it parses), values of
    /// the same kind compare by their natural order, text is parsed into the
    /// other side's kind when possible, and anything else falls back to the
    /// display form. Returns `None` when either side is NULL.
    pub fn compare_loose(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            return a.partial_cmp(&b);
        }
        if self.rank() == other.rank() {
            return Some(self.cmp(other));
        }
        match (self, other) {
            (Value::String(text), typed) => typed
                .parse_like(text)
                .map(|parsed| parsed.cmp(typed))
                .or_else(|| Some(text.as_str().cmp(typed.to_string().as_str()))),
            (typed, Value::String(text)) => typed
                .parse_like(text)
                .map(|parsed| typed.cmp(&parsed))
                .or_else(|| Some(typed.to_string().as_str().cmp(text.as_str()))),
            _ => Some(self.to_string().cmp(&other.to_string())),
        }
    }
}

fn numeric_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

pub(crate) fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

pub(crate) fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_date(text).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

pub(crate) fn parse_datetime_utc(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_datetime(text).map(|naive| naive.and_utc()))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.total_cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => {
                match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                    (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
                    _ => a.cmp(b),
                }
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::DateTimeUtc(a), Value::DateTimeUtc(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::Decimal(v) | Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::Uuid(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
            Value::DateTime(v) => v.hash(state),
            Value::DateTimeUtc(v) => v.hash(state),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "{}", BASE64.encode(v)),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeUtc(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Primary key of a single row: the ordered tuple of its key column values
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey(Vec<Value>);

impl RowKey {
    /// Create a key from its column values, in primary key column order
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Create a key for a single-column primary key
    pub fn single(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    /// Key column values
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Number of key columns
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A key with a NULL component cannot identify a referenced row
    pub fn has_null(&self) -> bool {
        self.0.iter().any(Value::is_null)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<Value> for RowKey {
    fn from(v: Value) -> Self {
        Self(vec![v])
    }
}

impl From<Vec<Value>> for RowKey {
    fn from(v: Vec<Value>) -> Self {
        Self(v)
    }
}

impl From<&str> for RowKey {
    fn from(v: &str) -> Self {
        Self::single(v)
    }
}

impl From<i64> for RowKey {
    fn from(v: i64) -> Self {
        Self::single(v)
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{}", single),
            values => {
                write!(f, "(")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_value_total_order_handles_nan() {
        let nan = Value::Float64(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(nan.cmp(&Value::Float64(1.0)), Ordering::Greater);
    }

    #[test]
    fn test_values_of_different_kinds_are_not_equal() {
        assert_ne!(Value::Int64(1), Value::Float64(1.0));
        assert_ne!(Value::Int64(1), Value::String("1".into()));
        assert!(Value::Null < Value::Bool(false));
    }

    #[test]
    fn test_matches_text_against_typed_values() {
        assert!(Value::Int64(42).matches(&Value::from("42")));
        assert!(Value::from(" 42 ").matches(&Value::Int64(42)));
        assert!(Value::Int64(1).matches(&Value::Float64(1.0)));
        assert!(Value::Bool(true).matches(&Value::from("true")));
        assert!(
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
                .matches(&Value::from("2024-02-29"))
        );
        assert!(!Value::Int64(42).matches(&Value::from("forty-two")));
        assert!(!Value::Null.matches(&Value::from("")));
        assert!(Value::Null.matches(&Value::Null));
    }

    #[test]
    fn test_matches_bytes_against_base64_or_raw_text() {
        let bytes = Value::Bytes(b"hello".to_vec());
        assert!(bytes.matches(&Value::from("aGVsbG8=")));
        assert!(bytes.matches(&Value::from("hello")));
    }

    #[test]
    fn test_compare_loose_numeric_text() {
        assert_eq!(
            Value::from("10").compare_loose(&Value::Int64(9)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Null.compare_loose(&Value::Int64(9)), None);
        assert_eq!(
            Value::from("apple").compare_loose(&Value::from("banana")),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_row_key_set_collapses_duplicates() {
        let keys: BTreeSet<RowKey> = ["C2", "C1", "C2", "C1"]
            .iter()
            .map(|k| RowKey::from(*k))
            .collect();
        let ordered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(ordered, vec!["C1", "C2"]);
    }

    #[test]
    fn test_row_key_display() {
        assert_eq!(RowKey::single(7i64).to_string(), "7");
        assert_eq!(
            RowKey::new(vec![Value::Int64(1), Value::from("a")]).to_string(),
            "(1, a)"
        );
        assert!(RowKey::new(vec![Value::Int64(1), Value::Null]).has_null());
    }
}
