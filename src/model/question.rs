//! Question bank entities

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::{require_non_empty, Difficulty};

/// Where a question came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    /// Shipped with the bank
    Core,
    /// Added through the trainer editor
    Trainer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub role: String,
    pub text: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<QuestionSource>,
}

impl Question {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("id", &self.id)?;
        require_non_empty("role", &self.role)?;
        require_non_empty("text", &self.text)
    }

    pub fn is_core(&self) -> bool {
        self.source.unwrap_or(QuestionSource::Core) == QuestionSource::Core
    }

    /// Case-insensitive match of `needle` (already lowercased) on text or topic
    pub fn mentions(&self, needle: &str) -> bool {
        self.text.to_lowercase().contains(needle)
            || self
                .topic
                .as_deref()
                .is_some_and(|topic| topic.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub role: String,
    pub text: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl QuestionDraft {
    pub fn into_question(self) -> Result<Question> {
        let question = Question {
            id: uuid::Uuid::new_v4().to_string(),
            role: self.role,
            text: self.text,
            topic: self.topic,
            difficulty: self.difficulty,
            source: Some(QuestionSource::Trainer),
        };
        question.validate()?;
        Ok(question)
    }
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionPatch {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl QuestionPatch {
    pub fn apply(self, current: Question) -> Result<Question> {
        let updated = Question {
            id: current.id,
            role: self.role.unwrap_or(current.role),
            text: self.text.unwrap_or(current.text),
            topic: self.topic.or(current.topic),
            difficulty: self.difficulty.or(current.difficulty),
            source: current.source,
        };
        updated.validate()?;
        Ok(updated)
    }
}
