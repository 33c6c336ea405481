//! Text analysis results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{lenient_utc, Schema};
use crate::error::Result;

use super::{require_non_empty, require_range};

const DEFAULT_SESSION: &str = "default";

/// One stored analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub text_hash: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub key_phrases: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(deserialize_with = "lenient_utc::deserialize")]
    pub created: DateTime<Utc>,
}

impl Schema for AnalysisRecord {
    const KIND: &'static str = "analysis";
    const TIMESTAMP_FIELD: &'static str = "created";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("id", &self.id)?;
        require_range("score", self.score, 0, 100)
    }
}

/// An analysis produced by an external analyzer, ready to persist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDraft {
    /// The analysed text; only its hash is stored
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub model: String,
    pub score: u32,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub key_phrases: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub rationale: String,
}

impl AnalysisDraft {
    pub fn into_record(self, now: DateTime<Utc>) -> Result<AnalysisRecord> {
        require_non_empty("text", &self.text)?;

        let record = AnalysisRecord {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: self
                .session_id
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SESSION.to_string()),
            text_hash: text_hash(&self.text),
            model: self.model,
            score: self.score,
            keywords: self.keywords,
            key_phrases: self.key_phrases,
            summary: self.summary,
            rationale: self.rationale,
            created: now,
        };
        record.validate()?;
        Ok(record)
    }
}

/// First 16 hex digits of the SHA-256 of `text`
pub fn text_hash(text: &str) -> String {
    let mut hex = format!("{:x}", Sha256::digest(text.as_bytes()));
    hex.truncate(16);
    hex
}
