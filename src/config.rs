//! Configuration for linestore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::store::RetryPolicy;

/// Main configuration for a linestore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── questions.json     (question bank, hot reloaded)
    ///     ├── attempts.jsonl     (session attempts)
    ///     ├── transcripts.jsonl  (audio transcripts)
    ///     └── analysis.jsonl     (text analysis results)
    pub data_dir: PathBuf,

    /// Overrides `{data_dir}/attempts.jsonl`
    pub attempts_file: Option<PathBuf>,

    /// Overrides `{data_dir}/questions.json`
    pub questions_file: Option<PathBuf>,

    /// Backoff applied to the final rename of every atomic rewrite
    pub replace_retry: RetryPolicy,

    // -------------------------------------------------------------------------
    // Admission Configuration
    // -------------------------------------------------------------------------
    /// Read requests admitted per client within `rate_window`
    pub read_rate: usize,

    /// Mutating requests admitted per client within `rate_window`
    pub mutate_rate: usize,

    /// Trailing window for both admission classes
    pub rate_window: Duration,

    // -------------------------------------------------------------------------
    // Response Cache Configuration
    // -------------------------------------------------------------------------
    /// `max-age` for the role listing (seconds)
    pub roles_max_age: u32,

    /// `max-age` for question pages (seconds)
    pub questions_max_age: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            attempts_file: None,
            questions_file: None,
            replace_retry: RetryPolicy::default(),
            read_rate: 60,
            mutate_rate: 20,
            rate_window: Duration::from_secs(60),
            roles_max_age: 60,
            questions_max_age: 30,
        }
    }
}

impl Config {
    const ATTEMPTS_FILENAME: &'static str = "attempts.jsonl";
    const QUESTIONS_FILENAME: &'static str = "questions.json";
    const TRANSCRIPTS_FILENAME: &'static str = "transcripts.jsonl";
    const ANALYSIS_FILENAME: &'static str = "analysis.jsonl";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn attempts_path(&self) -> PathBuf {
        self.attempts_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(Self::ATTEMPTS_FILENAME))
    }

    pub fn questions_path(&self) -> PathBuf {
        self.questions_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(Self::QUESTIONS_FILENAME))
    }

    pub fn transcripts_path(&self) -> PathBuf {
        self.data_dir.join(Self::TRANSCRIPTS_FILENAME)
    }

    pub fn analysis_path(&self) -> PathBuf {
        self.data_dir.join(Self::ANALYSIS_FILENAME)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Store attempts somewhere other than the data directory
    pub fn attempts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.attempts_file = Some(path.into());
        self
    }

    /// Load the question bank from somewhere other than the data directory
    pub fn questions_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.questions_file = Some(path.into());
        self
    }

    /// Set the retry policy for atomic replaces
    pub fn replace_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.replace_retry = policy;
        self
    }

    /// Set the per-client read ceiling
    pub fn read_rate(mut self, rate: usize) -> Self {
        self.config.read_rate = rate;
        self
    }

    /// Set the per-client mutation ceiling
    pub fn mutate_rate(mut self, rate: usize) -> Self {
        self.config.mutate_rate = rate;
        self
    }

    /// Set the trailing admission window
    pub fn rate_window(mut self, window: Duration) -> Self {
        self.config.rate_window = window;
        self
    }

    /// Set the role listing `max-age` (seconds)
    pub fn roles_max_age(mut self, secs: u32) -> Self {
        self.config.roles_max_age = secs;
        self
    }

    /// Set the question page `max-age` (seconds)
    pub fn questions_max_age(mut self, secs: u32) -> Self {
        self.config.questions_max_age = secs;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
