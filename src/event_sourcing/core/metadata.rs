use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Message Metadata
// ============================================================================
//
// Values are restricted to scalars, null, or lists (nested to any depth) of
// those. Objects are rejected on every write so metadata always serializes
// without custom codecs.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MetaDataError {
    #[error("metadata value at '{path}' is an object; only scalars, null and lists are allowed")]
    ComplexValue { path: String },

    #[error("metadata must be a JSON object, got {0}")]
    NotAnObject(String),
}

/// A single metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<MetaValue>),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert an arbitrary JSON value, rejecting objects at any depth.
    pub fn try_from_json(value: serde_json::Value) -> Result<Self, MetaDataError> {
        Self::from_json_at(value, "$")
    }

    fn from_json_at(value: serde_json::Value, path: &str) -> Result<Self, MetaDataError> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(MetaValue::Null),
            Value::Bool(b) => Ok(MetaValue::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(MetaValue::Int(i)),
                None => Ok(MetaValue::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => Ok(MetaValue::String(s)),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| Self::from_json_at(item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(MetaValue::List),
            Value::Object(_) => Err(MetaDataError::ComplexValue {
                path: path.to_string(),
            }),
        }
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<i32> for MetaValue {
    fn from(value: i32) -> Self {
        MetaValue::Int(value.into())
    }
}

impl From<u32> for MetaValue {
    fn from(value: u32) -> Self {
        MetaValue::Int(value.into())
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::String(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::String(value)
    }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(MetaValue::Null, Into::into)
    }
}

impl<T: Into<MetaValue>> From<Vec<T>> for MetaValue {
    fn from(value: Vec<T>) -> Self {
        MetaValue::List(value.into_iter().map(Into::into).collect())
    }
}

/// Ordered key/value metadata attached to an envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaData(BTreeMap<String, MetaValue>);

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object, rejecting nested objects.
    pub fn from_json(value: serde_json::Value) -> Result<Self, MetaDataError> {
        match value {
            serde_json::Value::Object(entries) => {
                let mut metadata = Self::new();
                for (key, value) in entries {
                    metadata.try_insert_json(key, value)?;
                }
                Ok(metadata)
            }
            other => Err(MetaDataError::NotAnObject(other.to_string())),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn try_insert_json(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), MetaDataError> {
        let key = key.into();
        let value = MetaValue::from_json_at(value, &key)?;
        self.0.insert(key, value);
        Ok(())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// New metadata containing both maps; entries of `other` win on conflict.
    pub fn merge(&self, other: &MetaData) -> MetaData {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        MetaData(merged)
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<'a> IntoIterator for &'a MetaData {
    type Item = (&'a String, &'a MetaValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, MetaValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
