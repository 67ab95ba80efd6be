//! Field-name keyed rows.
//!
//! A `Record` is the shape an entity takes while it travels between the
//! session, the datastore and the search processor. Field order is preserved.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::{FromValue, Value};

/// An ordered set of `(field, value)` pairs.
///
/// # Example
///
/// ```
/// use genericdao_core::{Record, Value};
///
/// let mut record = Record::new();
/// record.set("id", Value::BigInt(1));
/// record.set("name", "Alice");
///
/// assert_eq!(record.get("name").and_then(Value::as_str), Some("Alice"));
/// assert_eq!(record.get_as::<i64>("id").unwrap(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Create an empty record with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Set a value, replacing any previous value for the field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(name, _)| *name == field) {
            slot.1 = value;
        } else {
            self.fields.push((field, value));
        }
    }

    /// Builder-style `set`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Get a value for a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    /// Get a value for a field, treating absence as `Value::Null`.
    pub fn get_or_null(&self, field: &str) -> &Value {
        self.get(field).unwrap_or(&Value::Null)
    }

    /// Convert a field to a Rust type. Missing fields convert from `Value::Null`.
    pub fn get_as<T: FromValue>(&self, field: &str) -> Result<T> {
        T::from_value(self.get_or_null(field))
    }

    /// Convert a field that must be present.
    pub fn require_as<T: FromValue>(&self, entity: &str, field: &str) -> Result<T> {
        match self.get(field) {
            Some(value) => T::from_value(value),
            None => Err(Error::MissingField {
                entity: entity.to_string(),
                field: field.to_string(),
            }),
        }
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(name, _)| name == field)?;
        Some(self.fields.remove(idx).1)
    }

    /// Check if a field has a value set.
    pub fn has(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == field)
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate over `(field, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, v)| (name.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut record = Record::new();
        record.set("id", 1i64);
        record.set("name", "Alice");
        record.set("id", 2i64);

        assert_eq!(record.len(), 2);
        assert_eq!(record.field_names().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(record.get("id"), Some(&Value::BigInt(2)));
    }

    #[test]
    fn test_missing_field_reads_as_null() {
        let record = Record::new().with("name", "Bob");
        assert_eq!(record.get_or_null("age"), &Value::Null);
        assert_eq!(record.get_as::<Option<i32>>("age").unwrap(), None);
        assert!(record.require_as::<i32>("hero", "age").is_err());
    }

    #[test]
    fn test_remove() {
        let mut record: Record = vec![("a", 1i32), ("b", 2i32)].into_iter().collect();
        assert_eq!(record.remove("a"), Some(Value::Int(1)));
        assert!(!record.has("a"));
        assert!(record.remove("a").is_none());
    }
}
