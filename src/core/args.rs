//! Query arguments
//!
//! Arguments come in two shapes: a name -> value mapping for templates that
//! use `:name` placeholders, and an ordered list for templates that already
//! use the backend's positional syntax. The shape is chosen by the caller
//! through [`Args`], never inferred by inspecting values at runtime.

use super::error::{DatabaseError, Result, StatementKind};
use super::value::DatabaseValue;
use serde::Serialize;
use std::collections::HashMap;

/// Named-parameter arguments (`:name` -> value)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedArgs {
    values: HashMap<String, DatabaseValue>,
}

impl NamedArgs {
    /// Create an empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, builder style
    ///
    /// ```
    /// use dbx::NamedArgs;
    ///
    /// let args = NamedArgs::new().bind("id", 1).bind("name", "a");
    /// assert_eq!(args.len(), 2);
    /// ```
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up the value bound to `name`
    pub fn get(&self, name: &str) -> Option<&DatabaseValue> {
        self.values.get(name)
    }

    /// Number of bound names
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no names are bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the bound names and values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build named arguments from a serializable struct or map
    ///
    /// Every top-level field becomes a name. Nested arrays and objects are
    /// bound as JSON text.
    ///
    /// # Errors
    ///
    /// Returns a bind error if `value` does not serialize to a JSON object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let json = serde_json::to_value(value).map_err(|e| {
            DatabaseError::statement(StatementKind::Bind, "failed to serialize arguments", e)
        })?;

        match json {
            serde_json::Value::Object(fields) => Ok(fields
                .into_iter()
                .map(|(name, value)| (name, DatabaseValue::from_json(value)))
                .collect()),
            other => Err(DatabaseError::statement(
                StatementKind::Bind,
                "failed to serialize arguments",
                format!("expected a struct or map, got {}", other),
            )),
        }
    }
}

impl<K: Into<String>, V: Into<DatabaseValue>> FromIterator<(K, V)> for NamedArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, DatabaseValue>> for NamedArgs {
    fn from(values: HashMap<String, DatabaseValue>) -> Self {
        Self { values }
    }
}

/// Arguments for statements that accept either shape
#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    /// Mapping from placeholder name to value
    Named(NamedArgs),
    /// Values in placeholder order
    Positional(Vec<DatabaseValue>),
}

impl Args {
    /// Positional arguments from anything convertible to values
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        Args::Positional(values.into_iter().map(Into::into).collect())
    }

    /// No arguments at all
    pub fn none() -> Self {
        Args::Positional(Vec::new())
    }

    /// Check if the arguments are a mapping
    pub fn is_named(&self) -> bool {
        matches!(self, Args::Named(_))
    }
}

impl Default for Args {
    fn default() -> Self {
        Args::none()
    }
}

impl From<NamedArgs> for Args {
    fn from(args: NamedArgs) -> Self {
        Args::Named(args)
    }
}

impl From<HashMap<String, DatabaseValue>> for Args {
    fn from(values: HashMap<String, DatabaseValue>) -> Self {
        Args::Named(values.into())
    }
}

impl From<Vec<DatabaseValue>> for Args {
    fn from(values: Vec<DatabaseValue>) -> Self {
        Args::Positional(values)
    }
}
