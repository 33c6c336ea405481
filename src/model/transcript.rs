//! Audio transcripts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{lenient_utc, Schema};
use crate::error::Result;

use super::require_non_empty;

/// One stored transcription result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub transcript: String,
    #[serde(deserialize_with = "lenient_utc::deserialize")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub question_id: Option<String>,
}

impl Schema for Transcript {
    const KIND: &'static str = "transcript";
    const TIMESTAMP_FIELD: &'static str = "created";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("id", &self.id)
    }
}

/// Metadata and text of an upload that has already been transcribed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDraft {
    pub filename: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    pub content_type: String,
    pub size_bytes: u64,
    pub transcript: String,
    #[serde(default)]
    pub question_id: Option<String>,
}

impl TranscriptDraft {
    pub fn into_transcript(self, now: DateTime<Utc>) -> Result<Transcript> {
        require_non_empty("filename", &self.filename)?;
        if !self.content_type.starts_with("audio/") {
            return Err(crate::StoreError::Validation(format!(
                "content type must be audio/*, got {:?}",
                self.content_type
            )));
        }
        if self.size_bytes == 0 {
            return Err(crate::StoreError::Validation("empty upload".into()));
        }

        Ok(Transcript {
            id: uuid::Uuid::new_v4().to_string(),
            original_filename: self
                .original_filename
                .unwrap_or_else(|| self.filename.clone()),
            filename: self.filename,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            transcript: self.transcript,
            created: now,
            question_id: self.question_id,
        })
    }
}
