//! Model Module
//!
//! Typed schemas for the records and entities the store persists.
//!
//! Each log schema implements [`crate::codec::Schema`]: its id, the field
//! normalized to canonical UTC, and validation beyond what serde enforces.
//! Drafts and patches carry caller input before ids and timestamps are
//! assigned.

mod analysis;
mod attempt;
mod question;
mod transcript;

pub use analysis::{text_hash, AnalysisDraft, AnalysisRecord};
pub use attempt::{Attempt, AttemptDraft, AttemptPatch};
pub use question::{Question, QuestionDraft, QuestionPatch, QuestionSource};
pub use transcript::{Transcript, TranscriptDraft};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Question and attempt difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(StoreError::Validation(format!(
                "invalid difficulty {:?} (expected easy, medium or hard)",
                other
            ))),
        }
    }
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> crate::Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

pub(crate) fn require_range(field: &str, value: u32, min: u32, max: u32) -> crate::Result<()> {
    if !(min..=max).contains(&value) {
        return Err(StoreError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}
