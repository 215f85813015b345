//! Values, rows and statement results
//!
//! This module defines the values exchanged with the datastore: bound
//! arguments, scanned columns, the owned row cursor returned by `query`, and
//! the summary returned by `execute`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Datastore value that can hold different types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatabaseValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Timestamp (Unix timestamp in microseconds)
    Timestamp(i64),
}

impl DatabaseValue {
    /// Get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DatabaseValue::Bool(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v != 0),
            DatabaseValue::Long(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Get the value as an i64
    pub fn as_long(&self) -> Option<i64> {
        match self {
            DatabaseValue::Long(v) | DatabaseValue::Timestamp(v) => Some(*v),
            DatabaseValue::Int(v) => Some(i64::from(*v)),
            DatabaseValue::Bool(v) => Some(i64::from(*v)),
            DatabaseValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as an f64
    pub fn as_double(&self) -> Option<f64> {
        match self {
            DatabaseValue::Double(v) => Some(*v),
            DatabaseValue::Float(v) => Some(f64::from(*v)),
            DatabaseValue::Int(v) => Some(f64::from(*v)),
            DatabaseValue::Long(v) => Some(*v as f64),
            DatabaseValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as a string slice (zero-copy, `String` values only)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the value as bytes (zero-copy)
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DatabaseValue::Bytes(b) => Some(b),
            DatabaseValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Int(_) => "int",
            DatabaseValue::Long(_) => "long",
            DatabaseValue::Float(_) => "float",
            DatabaseValue::Double(_) => "double",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
            DatabaseValue::Timestamp(_) => "timestamp",
        }
    }

    /// Convert a JSON value into a bindable value
    ///
    /// Arrays and objects have no column type of their own and are bound as
    /// their JSON text.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => DatabaseValue::Null,
            Value::Bool(v) => DatabaseValue::Bool(v),
            Value::Number(n) => match n.as_i64() {
                Some(v) => DatabaseValue::Long(v),
                None => DatabaseValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => DatabaseValue::String(s),
            nested @ (Value::Array(_) | Value::Object(_)) => {
                DatabaseValue::String(nested.to_string())
            }
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(v: bool) -> Self {
        DatabaseValue::Bool(v)
    }
}

impl From<i32> for DatabaseValue {
    fn from(v: i32) -> Self {
        DatabaseValue::Int(v)
    }
}

impl From<i64> for DatabaseValue {
    fn from(v: i64) -> Self {
        DatabaseValue::Long(v)
    }
}

impl From<f32> for DatabaseValue {
    fn from(v: f32) -> Self {
        DatabaseValue::Float(v)
    }
}

impl From<f64> for DatabaseValue {
    fn from(v: f64) -> Self {
        DatabaseValue::Double(v)
    }
}

impl From<String> for DatabaseValue {
    fn from(v: String) -> Self {
        DatabaseValue::String(v)
    }
}

impl From<&str> for DatabaseValue {
    fn from(v: &str) -> Self {
        DatabaseValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(v: Vec<u8>) -> Self {
        DatabaseValue::Bytes(v)
    }
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// A row of results (column name -> value mapping)
pub type DatabaseRow = HashMap<String, DatabaseValue>;

/// Multiple rows returned from a query
pub type DatabaseResult = Vec<DatabaseRow>;

/// Summary of a statement that does not return rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    /// Number of rows inserted, updated or deleted
    pub rows_affected: u64,
    /// Rowid of the most recent successful insert on the handle
    pub last_insert_id: i64,
}

/// Owned cursor over the rows of a query
///
/// The rows are fully read from the handle before the cursor is returned, so
/// holding a `Rows` never pins a pooled connection. Dropping it releases it.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    columns: Vec<String>,
    rows: std::collections::VecDeque<DatabaseRow>,
}

impl Rows {
    /// Build a cursor from column names and rows in result order
    pub fn new(columns: Vec<String>, rows: DatabaseResult) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }

    /// Column names in select-list order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows not yet consumed
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if every row has been consumed
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Consume the cursor into the remaining rows
    pub fn into_result(self) -> DatabaseResult {
        self.rows.into()
    }
}

impl Iterator for Rows {
    type Item = DatabaseRow;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.rows.len(), Some(self.rows.len()))
    }
}

impl ExactSizeIterator for Rows {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_conversions() {
        let val = DatabaseValue::Int(42);
        assert_eq!(val.as_long(), Some(42));
        assert_eq!(val.as_double(), Some(42.0));

        let val = DatabaseValue::String("123".to_string());
        assert_eq!(val.as_long(), Some(123));
        assert_eq!(val.as_str(), Some("123"));

        let val = DatabaseValue::Bool(true);
        assert_eq!(val.as_bool(), Some(true));
        assert_eq!(val.as_long(), Some(1));
    }

    #[test]
    fn test_value_from_types() {
        let val: DatabaseValue = 42.into();
        assert_eq!(val, DatabaseValue::Int(42));

        let val: DatabaseValue = "hello".into();
        assert_eq!(val, DatabaseValue::String("hello".to_string()));

        let val: DatabaseValue = Some(42).into();
        assert_eq!(val, DatabaseValue::Int(42));

        let val: DatabaseValue = Option::<i32>::None.into();
        assert_eq!(val, DatabaseValue::Null);
    }

    #[test]
    fn test_value_from_json() {
        assert_eq!(DatabaseValue::from_json(json!(7)), DatabaseValue::Long(7));
        assert_eq!(
            DatabaseValue::from_json(json!(1.5)),
            DatabaseValue::Double(1.5)
        );
        assert_eq!(DatabaseValue::from_json(json!(null)), DatabaseValue::Null);
        assert_eq!(
            DatabaseValue::from_json(json!(["a", 1])),
            DatabaseValue::String("[\"a\",1]".to_string())
        );
    }

    #[test]
    fn test_rows_cursor() {
        let mut first = DatabaseRow::new();
        first.insert("id".to_string(), DatabaseValue::Long(1));
        let mut second = DatabaseRow::new();
        second.insert("id".to_string(), DatabaseValue::Long(2));

        let mut rows = Rows::new(vec!["id".to_string()], vec![first, second]);
        assert_eq!(rows.columns(), ["id".to_string()]);
        assert_eq!(rows.len(), 2);

        let row = rows.next().unwrap();
        assert_eq!(row["id"], DatabaseValue::Long(1));
        assert_eq!(rows.into_result().len(), 1);
    }
}
