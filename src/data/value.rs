//! Field values and input records.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A single input value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    /// Pre-tokenized terms (items fields, or text already split by the caller).
    Terms(Vec<String>),
}

impl FieldValue {
    /// Convert a JSON scalar or string array. Returns `None` for `null`,
    /// objects and arrays with non-string members.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(FieldValue::Number),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .map(FieldValue::Terms),
            Value::Null | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Terms(terms) => f.write_str(&terms.join(", ")),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::Terms(value)
    }
}

/// An input row: field key (id or display name) to value.
///
/// Absent keys are missing values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputRecord(HashMap<String, FieldValue>);

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Build a record from a JSON object, skipping `null` and unsupported values.
    ///
    /// Anything other than an object yields an empty record.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => map
                .iter()
                .filter_map(|(k, v)| FieldValue::from_json(v).map(|fv| (k.clone(), fv)))
                .collect(),
            _ => Self::default(),
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for InputRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'de> Deserialize<'de> for InputRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("input record must be a JSON object"));
        }
        Ok(InputRecord::from_json(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_skips_null_and_objects() {
        let record = InputRecord::from_json(&json!({
            "a": 1.5,
            "b": "text",
            "c": null,
            "d": {"nested": 1},
            "e": ["x", "y"],
            "f": true
        }));
        assert_eq!(record.len(), 4);
        assert_eq!(record.get("a"), Some(&FieldValue::Number(1.5)));
        assert_eq!(record.get("b"), Some(&FieldValue::Text("text".into())));
        assert_eq!(
            record.get("e"),
            Some(&FieldValue::Terms(vec!["x".into(), "y".into()]))
        );
        assert_eq!(record.get("f"), Some(&FieldValue::Text("true".into())));
        assert!(!record.contains_key("c"));
    }

    #[test]
    fn deserialize_rejects_non_object() {
        let result: Result<InputRecord, _> = serde_json::from_value(json!([1, 2]));
        assert!(result.is_err());
    }

    #[test]
    fn builder_and_collect() {
        let a = InputRecord::new().with("x", 1.0).with("y", "v");
        let b: InputRecord = [("x", FieldValue::from(1.0)), ("y", FieldValue::from("v"))]
            .into_iter()
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn number_display_drops_trailing_zero() {
        assert_eq!(FieldValue::Number(3.0).to_string(), "3");
        assert_eq!(FieldValue::Number(2.5).to_string(), "2.5");
    }
}
