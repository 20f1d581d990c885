//! Field values and type defaults
//!
//! Fields are untyped on the wire; absent values are represented by a
//! type-specific default rather than null.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel date used when a record carries no creation information.
pub const SENTINEL_DATE: &str = "1999-01-01";
/// Sentinel datetime, also the default `creation` timestamp.
pub const SENTINEL_DATETIME: &str = "1999-01-01 00:00:00";
/// Sentinel time-of-day.
pub const SENTINEL_TIME: &str = "00:00:00";

/// A field value.
///
/// `Series` is the stored form of a flattened array result written back by
/// the evaluator; everything else arrives from the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Series(Vec<f64>),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is one of the defaults any field type maps to.
    ///
    /// Used by the empty-node predicate: a node whose fields all hold
    /// default values contributes nothing to a query.
    pub fn is_default(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => *n == 0.0,
            Value::Text(s) => {
                s.is_empty() || s == SENTINEL_DATE || s == SENTINEL_DATETIME || s == SENTINEL_TIME
            }
            Value::Series(v) => v.is_empty(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Series(v) => {
                write!(f, "[")?;
                for (i, n) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{n}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Recognized field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Numeric,
    Boolean,
    Date,
    Datetime,
    Time,
    Text,
    Key,
    Select,
    #[serde(rename = "docref")]
    DocRef,
}

impl FieldType {
    /// The default standing in for an absent value of this type.
    pub fn default_value(&self) -> Value {
        match self {
            FieldType::Numeric => Value::Number(0.0),
            FieldType::Boolean => Value::Bool(false),
            FieldType::Date => Value::Text(SENTINEL_DATE.to_string()),
            FieldType::Datetime => Value::Text(SENTINEL_DATETIME.to_string()),
            FieldType::Time => Value::Text(SENTINEL_TIME.to_string()),
            FieldType::String
            | FieldType::Text
            | FieldType::Key
            | FieldType::Select
            | FieldType::DocRef => Value::Text(String::new()),
        }
    }
}
