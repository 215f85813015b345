//! Scanning result rows into caller types
//!
//! A row is presented to serde as a map keyed by column name, so any
//! `Deserialize` struct whose field names match the selected columns can be
//! used as a destination. Single-column rows can also be scanned straight into
//! a scalar such as `i64` or `String`.
//!
//! SQLite has no boolean storage class: `bool` destinations accept the
//! integers `0` and `1` as well as booleans.

use super::error::{DatabaseError, Result, StatementKind};
use super::value::{DatabaseResult, DatabaseRow, DatabaseValue};
use serde::de::value::{Error as ValueError, MapDeserializer, SeqDeserializer, StringDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

const SCAN_CONTEXT: &str = "failed to scan row";

type DeResult<T> = std::result::Result<T, ValueError>;

/// Deserializer over a whole row, seen as a map of column to value
struct RowDeserializer(DatabaseRow);

impl<'de> de::Deserializer<'de> for RowDeserializer {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> DeResult<V::Value> {
        let columns = self
            .0
            .into_iter()
            .map(|(column, value)| (column, ValueDeserializer(value)));
        visitor.visit_map(MapDeserializer::new(columns))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

/// Deserializer over a single column value
struct ValueDeserializer(DatabaseValue);

impl<'de> IntoDeserializer<'de, ValueError> for ValueDeserializer {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> DeResult<V::Value> {
        match self.0 {
            DatabaseValue::Null => visitor.visit_unit(),
            DatabaseValue::Bool(v) => visitor.visit_bool(v),
            DatabaseValue::Int(v) => visitor.visit_i32(v),
            DatabaseValue::Long(v) | DatabaseValue::Timestamp(v) => visitor.visit_i64(v),
            DatabaseValue::Float(v) => visitor.visit_f32(v),
            DatabaseValue::Double(v) => visitor.visit_f64(v),
            DatabaseValue::String(v) => visitor.visit_string(v),
            DatabaseValue::Bytes(v) => {
                visitor.visit_seq(SeqDeserializer::<_, ValueError>::new(v.into_iter()))
            }
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> DeResult<V::Value> {
        match self.0 {
            DatabaseValue::Int(v @ (0 | 1)) => visitor.visit_bool(v == 1),
            DatabaseValue::Long(v @ (0 | 1)) => visitor.visit_bool(v == 1),
            other => ValueDeserializer(other).deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> DeResult<V::Value> {
        match self.0 {
            DatabaseValue::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> DeResult<V::Value> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> DeResult<V::Value> {
        match self.0 {
            DatabaseValue::Bytes(v) => visitor.visit_byte_buf(v),
            other => ValueDeserializer(other).deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> DeResult<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> DeResult<V::Value> {
        match self.0 {
            DatabaseValue::String(v) => {
                let variant: StringDeserializer<ValueError> = v.into_deserializer();
                variant.deserialize_enum(name, variants, visitor)
            }
            other => ValueDeserializer(other).deserialize_any(visitor),
        }
    }

    forward_to_deserialize_any! {
        i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

/// Scan one row into `T`
///
/// # Errors
///
/// Returns a scan error when the row does not deserialize into `T`.
pub fn from_row<T: DeserializeOwned>(row: DatabaseRow) -> Result<T> {
    from_row_with_context(row, SCAN_CONTEXT)
}

/// Scan one row into `T`, reporting failures under `context`
pub(crate) fn from_row_with_context<T: DeserializeOwned>(
    row: DatabaseRow,
    context: &str,
) -> Result<T> {
    let single = if row.len() == 1 {
        row.values().next().cloned()
    } else {
        None
    };

    match T::deserialize(RowDeserializer(row)) {
        Ok(value) => Ok(value),
        Err(err) => match single {
            Some(value) => T::deserialize(ValueDeserializer(value))
                .map_err(|_| DatabaseError::statement(StatementKind::Scan, context, err)),
            None => Err(DatabaseError::statement(StatementKind::Scan, context, err)),
        },
    }
}

/// Scan every row into `T`, stopping at the first failure
pub fn from_rows<T: DeserializeOwned>(rows: DatabaseResult) -> Result<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
        email: Option<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Flagged {
        id: i64,
        active: bool,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Status {
        Active,
        Archived,
    }

    fn user_row(id: i64, name: &str) -> DatabaseRow {
        let mut row = DatabaseRow::new();
        row.insert("id".to_string(), DatabaseValue::Long(id));
        row.insert("name".to_string(), DatabaseValue::from(name));
        row.insert("email".to_string(), DatabaseValue::Null);
        row
    }

    fn flagged_row(active: DatabaseValue) -> DatabaseRow {
        let mut row = DatabaseRow::new();
        row.insert("id".to_string(), DatabaseValue::Long(1));
        row.insert("active".to_string(), active);
        row
    }

    #[test]
    fn test_scan_struct() {
        let user: User = from_row(user_row(1, "a")).unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "a".to_string(),
                email: None
            }
        );
    }

    #[test]
    fn test_scan_integer_into_bool() {
        let flagged: Flagged = from_row(flagged_row(DatabaseValue::Long(1))).unwrap();
        assert_eq!(flagged, Flagged { id: 1, active: true });

        let flagged: Flagged = from_row(flagged_row(DatabaseValue::Long(0))).unwrap();
        assert!(!flagged.active);

        let flagged: Flagged = from_row(flagged_row(DatabaseValue::Bool(true))).unwrap();
        assert!(flagged.active);

        let err = from_row::<Flagged>(flagged_row(DatabaseValue::Long(2))).unwrap_err();
        assert_eq!(err.statement_kind(), Some(StatementKind::Scan));
    }

    #[test]
    fn test_scan_bytes_and_enum() {
        #[derive(Debug, Deserialize)]
        struct Blob {
            data: Vec<u8>,
            status: Status,
        }

        let mut row = DatabaseRow::new();
        row.insert("data".to_string(), DatabaseValue::Bytes(vec![1, 2, 3]));
        row.insert("status".to_string(), DatabaseValue::from("archived"));

        let blob: Blob = from_row(row).unwrap();
        assert_eq!(blob.data, vec![1, 2, 3]);
        assert_eq!(blob.status, Status::Archived);
    }

    #[test]
    fn test_scan_scalar_from_single_column() {
        let mut row = DatabaseRow::new();
        row.insert("count".to_string(), DatabaseValue::Long(3));
        let count: i64 = from_row(row).unwrap();
        assert_eq!(count, 3);

        let mut row = DatabaseRow::new();
        row.insert("status".to_string(), DatabaseValue::from("active"));
        let status: Status = from_row(row).unwrap();
        assert_eq!(status, Status::Active);
    }

    #[test]
    fn test_scan_type_mismatch() {
        let mut row = user_row(1, "a");
        row.insert("id".to_string(), DatabaseValue::from("not a number"));
        let err = from_row::<User>(row).unwrap_err();
        assert_eq!(err.statement_kind(), Some(StatementKind::Scan));
        assert!(err.to_string().starts_with(SCAN_CONTEXT));
    }

    #[test]
    fn test_scan_error_context() {
        let err = from_row_with_context::<User>(
            flagged_row(DatabaseValue::Long(1)),
            "failed to execute get statement",
        )
        .unwrap_err();
        assert_eq!(err.statement_kind(), Some(StatementKind::Scan));
        assert!(err
            .to_string()
            .starts_with("failed to execute get statement"));
    }

    #[test]
    fn test_scan_rows() {
        let users: Vec<User> = from_rows(vec![user_row(1, "a"), user_row(2, "b")]).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].name, "b");
    }
}
