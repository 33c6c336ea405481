//! Interview session attempts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{lenient_utc, Schema};
use crate::error::Result;

use super::{require_non_empty, require_range, Difficulty};

pub const SCORE_RANGE: (u32, u32) = (0, 100);
pub const DURATION_RANGE: (u32, u32) = (1, 240);

/// One persisted attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub role: String,
    pub score: u32,
    pub duration_min: u32,
    #[serde(deserialize_with = "lenient_utc::deserialize")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl Schema for Attempt {
    const KIND: &'static str = "attempt";
    const TIMESTAMP_FIELD: &'static str = "date";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("role", &self.role)?;
        require_range("score", self.score, SCORE_RANGE.0, SCORE_RANGE.1)?;
        require_range("duration_min", self.duration_min, DURATION_RANGE.0, DURATION_RANGE.1)
    }
}

/// Caller input for a new attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptDraft {
    pub role: String,
    pub score: u32,
    pub duration_min: u32,
    #[serde(default, deserialize_with = "lenient_utc::option::deserialize")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl AttemptDraft {
    /// Assign a fresh id (and `now` if no date was given)
    pub fn into_attempt(self, now: DateTime<Utc>) -> Result<Attempt> {
        let attempt = Attempt {
            id: uuid::Uuid::new_v4().to_string(),
            role: self.role,
            score: self.score,
            duration_min: self.duration_min,
            date: self.date.unwrap_or(now),
            difficulty: self.difficulty,
        };
        attempt.validate()?;
        Ok(attempt)
    }
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptPatch {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub duration_min: Option<u32>,
    #[serde(default, deserialize_with = "lenient_utc::option::deserialize")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl AttemptPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply onto `current`; the id never changes
    pub fn apply(self, current: Attempt) -> Result<Attempt> {
        let updated = Attempt {
            id: current.id,
            role: self.role.unwrap_or(current.role),
            score: self.score.unwrap_or(current.score),
            duration_min: self.duration_min.unwrap_or(current.duration_min),
            date: self.date.unwrap_or(current.date),
            difficulty: self.difficulty.or(current.difficulty),
        };
        updated.validate()?;
        Ok(updated)
    }
}
