//! Scalar values, ordered column/value pairs and result records.

use rusqlite::types::{
    FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value as SqlValue, ValueRef,
};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Boolean(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// Booleans are stored the way SQLite stores them: as 0/1 integers.
impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            Value::Boolean(v) => ToSqlOutput::Owned(SqlValue::Integer(*v as i64)),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(v) => {
                let text = std::str::from_utf8(v).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                Value::Text(text.to_string())
            }
            ValueRef::Blob(v) => Value::Blob(v.to_vec()),
        })
    }
}

/// Ordered column/value pairs.
///
/// Used both for the values written by INSERT/UPDATE and for equality
/// WHERE clauses. Order is preserved because it decides placeholder order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: Vec<(String, Value)>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value. Setting an existing column replaces its value in place.
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.values.iter_mut().find(|(column, _)| column == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(column, _)| column.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().map(|(_, value)| value)
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.set(name.as_ref(), value);
        }
        params
    }
}

/// Column selection for SELECT statements
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Columns {
    #[default]
    All,
    /// Inserted verbatim, e.g. `COUNT(*) AS num_rows`
    Raw(String),
    /// Joined with `, `
    List(Vec<String>),
}

impl Columns {
    pub fn to_sql(&self) -> String {
        match self {
            Columns::All => "*".to_string(),
            Columns::Raw(raw) => raw.clone(),
            Columns::List(list) => list.join(", "),
        }
    }
}

impl From<&str> for Columns {
    fn from(v: &str) -> Self {
        Columns::Raw(v.to_string())
    }
}

impl From<String> for Columns {
    fn from(v: String) -> Self {
        Columns::Raw(v)
    }
}

impl From<Vec<String>> for Columns {
    fn from(v: Vec<String>) -> Self {
        Columns::List(v)
    }
}

impl From<&[&str]> for Columns {
    fn from(v: &[&str]) -> Self {
        Columns::List(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(v: [&str; N]) -> Self {
        Columns::List(v.iter().map(|s| s.to_string()).collect())
    }
}

/// One result row: column names mapped to values, in select order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub(crate) fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    /// Value of `column`, or `None` if the row has no such column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert into a plain map. Column order is lost.
    pub fn into_map(self) -> HashMap<String, Value> {
        self.fields.into_iter().collect()
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_keep_insertion_order() {
        let params = Params::new()
            .with_value("title", "test")
            .with_value("description", "desc")
            .with_value("title", "changed");
        assert_eq!(params.columns().collect::<Vec<_>>(), vec!["title", "description"]);
        assert_eq!(params.values[0].1, Value::Text("changed".into()));
    }

    #[test]
    fn columns_render() {
        assert_eq!(Columns::All.to_sql(), "*");
        assert_eq!(Columns::from(["id", "title"]).to_sql(), "id, title");
        assert_eq!(Columns::from("COUNT(*)").to_sql(), "COUNT(*)");
    }

    #[test]
    fn option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".into()));
    }

    #[test]
    fn record_lookup() {
        let record = Record::new(vec![
            ("id".to_string(), Value::Integer(1)),
            ("title".to_string(), Value::Text("test".into())),
        ]);
        assert_eq!(record.get("title").and_then(Value::as_str), Some("test"));
        assert!(record.get("missing").is_none());
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["id", "title"]);
    }
}
