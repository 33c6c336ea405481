//! Question bank parsing

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::model::Question;
use crate::snapshot::SnapshotLoader;

const UNCATEGORIZED: &str = "Uncategorized";

/// Loads the bank file for [`crate::snapshot::SnapshotCache`]
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionBankLoader;

impl SnapshotLoader for QuestionBankLoader {
    type Entity = Question;

    fn load(&self, path: &Path) -> Result<BTreeMap<String, Vec<Question>>> {
        let text = fs::read_to_string(path)
            .map_err(|e| StoreError::io_at("read question bank", path, e))?;
        parse_bank(&text)
    }
}

/// Parse bank text into role partitions
///
/// Every question gets its partition's role. Questions without an id get
/// a stable one derived from role and position; questions that fail
/// validation are left out.
pub fn parse_bank(text: &str) -> Result<BTreeMap<String, Vec<Question>>> {
    let raw: Value = serde_json::from_str(text)?;
    let mut bank: BTreeMap<String, Vec<Question>> = BTreeMap::new();

    match raw {
        Value::Object(groups) => {
            for (role, items) in groups {
                let bucket = bank.entry(role.clone()).or_default();
                let Value::Array(items) = items else {
                    tracing::debug!("Question group {} is not a list, ignoring it", role);
                    continue;
                };
                for item in items {
                    let position = bucket.len();
                    if let Some(question) = normalize(item, &role, position) {
                        bucket.push(question);
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                let role = item
                    .get("role")
                    .and_then(Value::as_str)
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or(UNCATEGORIZED)
                    .to_string();
                let bucket = bank.entry(role.clone()).or_default();
                let position = bucket.len();
                if let Some(question) = normalize(item, &role, position) {
                    bucket.push(question);
                }
            }
        }
        _ => {
            return Err(StoreError::Serialization(
                "question bank must be an object keyed by role or a list".into(),
            ))
        }
    }

    Ok(bank)
}

fn normalize(item: Value, role: &str, position: usize) -> Option<Question> {
    let Value::Object(mut fields) = item else {
        return None;
    };

    fields.insert("role".into(), Value::String(role.to_string()));
    if !has_text(&fields, "id") {
        fields.insert("id".into(), Value::String(format!("{}#{}", role, position)));
    }
    if !fields.contains_key("source") {
        fields.insert("source".into(), Value::String("core".into()));
    }

    match serde_json::from_value::<Question>(Value::Object(fields)) {
        Ok(question) if question.validate().is_ok() => Some(question),
        Ok(question) => {
            tracing::debug!("Skipping invalid question {} in {}", question.id, role);
            None
        }
        Err(e) => {
            tracing::debug!("Skipping malformed question in {}: {}", role, e);
            None
        }
    }
}

fn has_text(fields: &Map<String, Value>, key: &str) -> bool {
    fields
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}
