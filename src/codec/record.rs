//! Record definitions
//!
//! The untyped record shape and the trait typed schemas implement.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// A typed record stored one-per-line in an append log
pub trait Schema: Serialize + DeserializeOwned {
    /// Human-readable kind used in not-found errors ("attempt", ...)
    const KIND: &'static str;

    /// Field normalized to canonical UTC on every encode
    const TIMESTAMP_FIELD: &'static str;

    /// Stable unique identifier
    fn id(&self) -> &str;

    /// Semantic checks beyond what deserialization enforces
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// An opaque field-name → value mapping
///
/// This is what the rewriter hands to transforms and what a line decodes
/// to before any schema is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Convert any serializable object into a raw record
    pub fn from_schema<T: Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(crate::StoreError::Serialization(format!(
                "record must serialize to an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// The `id` field, if present and a string
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl Schema for Record {
    const KIND: &'static str = "record";
    const TIMESTAMP_FIELD: &'static str = "timestamp";

    fn id(&self) -> &str {
        Record::id(self).unwrap_or_default()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
