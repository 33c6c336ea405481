//! Line codec
//!
//! Encoding and decoding of single record lines.

use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

use super::record::{json_kind, Record, Schema};
use super::timestamp::{canonical_timestamp, normalize_timestamp};

/// Outcome of applying a schema to a raw record
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// Deserialized and validated against the schema
    Strict(T),

    /// Valid JSON object that does not fit the schema; kept raw so it can
    /// be repaired instead of silently reshaped
    Permissive(Record),
}

impl<T> Decoded<T> {
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict(_))
    }

    pub fn strict(self) -> Option<T> {
        match self {
            Self::Strict(value) => Some(value),
            Self::Permissive(_) => None,
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a typed record to one line (without the trailing `\n`)
pub fn encode<T: Schema>(record: &T) -> Result<String> {
    let raw = Record::from_schema(record)?;
    encode_record(&raw, T::TIMESTAMP_FIELD)
}

/// Encode a raw record, normalizing `timestamp_field`
///
/// A missing timestamp is filled with the current time; an unparseable one
/// is written back unchanged.
pub fn encode_record(record: &Record, timestamp_field: &str) -> Result<String> {
    let mut map: Map<String, Value> = record.as_map().clone();

    match map.get(timestamp_field) {
        Some(value) => {
            if let Some(normalized) = normalize_timestamp(value) {
                map.insert(timestamp_field.to_string(), Value::String(normalized));
            } else {
                tracing::debug!(
                    "Leaving unparseable {} value {} as-is",
                    timestamp_field,
                    value
                );
            }
        }
        None => {
            map.insert(
                timestamp_field.to_string(),
                Value::String(canonical_timestamp(&chrono::Utc::now())),
            );
        }
    }

    let line = serde_json::to_string(&Value::Object(map))?;
    debug_assert!(!line.contains('\n'));
    Ok(line)
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one line into zero or more raw records
///
/// A JSON object yields one record. A JSON array (legacy writers) is
/// flattened; non-object elements are dropped. Anything else is a
/// [`StoreError::Decode`].
pub fn decode_line(line: &str) -> Result<Vec<Record>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value =
        serde_json::from_str(line).map_err(|e| StoreError::Decode(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(vec![Record::from_map(map)]),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(Record::from_map(map)),
                _ => None,
            })
            .collect()),
        other => Err(StoreError::Decode(format!(
            "expected object or array, got {}",
            json_kind(&other)
        ))),
    }
}

/// Try the strict schema first, fall back to the raw record
pub fn decode_as<T: Schema>(record: Record) -> Decoded<T> {
    match serde_json::from_value::<T>(Value::Object(record.as_map().clone())) {
        Ok(typed) if typed.validate().is_ok() => Decoded::Strict(typed),
        _ => Decoded::Permissive(record),
    }
}
