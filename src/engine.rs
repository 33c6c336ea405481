//! Engine Module
//!
//! The process-lifetime context that owns every piece of shared state.
//!
//! ## Responsibilities
//! - Own the three record logs, each with its own write lock
//! - Own the question bank snapshot cache and its editor
//! - Own the two-class rate gate and the conditional responder
//! - Expose the operations the transport layer calls into
//!
//! Nothing here is global: tests build as many independent engines as they
//! like, each over its own data directory and clock.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::bank::{self, PageRequest, QuestionBankEditor, QuestionBankLoader};
use crate::codec::canonical_timestamp;
use crate::conditional::ConditionalCache;
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::limiter::{AdmissionClass, Clock, RateGate, SystemClock};
use crate::model::{
    AnalysisDraft, AnalysisRecord, Attempt, AttemptDraft, AttemptPatch, Difficulty, Question,
    QuestionDraft, QuestionPatch, Transcript, TranscriptDraft,
};
use crate::protocol::Response;
use crate::snapshot::{Snapshot, SnapshotCache};
use crate::store::{AppendLog, RepairReport};

/// Upper bound on records scanned by lookups, exports and stats
pub const MAX_SCAN: usize = 10_000;

/// Role used by `seed_attempts` when the bank has no roles at all
const FALLBACK_SEED_ROLE: &str = "Frontend Developer";

/// One page request against the question bank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionQuery {
    pub role: String,
    pub difficulty: Option<Difficulty>,
    pub page: PageRequest,
}

/// Liveness and file state report
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub ok: bool,
    pub roles: Vec<String>,
    pub counts: BTreeMap<String, usize>,
    pub questions_file: String,
    pub questions_size: u64,
    pub attempts_file: String,
    pub attempts_size: u64,
    /// Modification time (unix seconds) of the loaded question bank
    pub last_questions_load_ts: f64,
    pub snapshot_loads: u64,
    pub server_time: f64,
}

/// Aggregates over the bank and the attempts log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub questions_per_role: BTreeMap<String, usize>,
    pub attempts_total: usize,
    pub attempts_by_role: BTreeMap<String, usize>,
    pub attempts_by_difficulty: BTreeMap<String, usize>,
}

/// The storage engine and its process-lifetime state
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Session attempts (mutable: append, update, delete, repair)
    attempts: AppendLog<Attempt>,

    /// Transcription results (append-only in practice)
    transcripts: AppendLog<Transcript>,

    /// Analysis results (append-only in practice)
    analysis: AppendLog<AnalysisRecord>,

    /// Hot-reloaded question bank
    questions: SnapshotCache<QuestionBankLoader>,

    /// Trainer edits of the bank file
    editor: QuestionBankEditor,

    /// Per-client admission control
    gate: RateGate,

    /// ETag/NOT_MODIFIED handling for bank reads
    conditional: ConditionalCache,
}

impl Engine {
    /// Open an engine with the system clock
    pub fn open(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Open with a default config rooted at `path`
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Open an engine whose rate gate reads time from `clock`
    ///
    /// On startup:
    /// 1. Create the data directory and an empty attempts log
    /// 2. Load the question bank (fatal if the file is missing)
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)
            .map_err(|e| StoreError::io_at("create data directory", &config.data_dir, e))?;

        let retry = config.replace_retry;
        let attempts = AppendLog::open(config.attempts_path(), retry)?;
        attempts.ensure_exists()?;
        let transcripts = AppendLog::open(config.transcripts_path(), retry)?;
        let analysis = AppendLog::open(config.analysis_path(), retry)?;

        let questions = SnapshotCache::new(QuestionBankLoader);
        let snapshot = questions.get(&config.questions_path())?;
        tracing::info!(
            "Engine ready: {} roles, {} questions, attempts at {}",
            snapshot.partitions().len(),
            snapshot.len(),
            attempts.path().display()
        );

        Ok(Self {
            editor: QuestionBankEditor::new(config.questions_path(), retry),
            gate: RateGate::from_config(&config, clock),
            conditional: ConditionalCache::new(),
            attempts,
            transcripts,
            analysis,
            questions,
            config,
        })
    }

    // =========================================================================
    // Admission
    // =========================================================================

    /// Count one request from `client` against the `class` ceiling
    pub fn admit(&self, class: AdmissionClass, client: &str) -> Result<()> {
        self.gate.admit(class, client)
    }

    // =========================================================================
    // Question Bank
    // =========================================================================

    /// Current bank snapshot (reloaded first if the file changed)
    pub fn bank(&self) -> Result<Arc<Snapshot<Question>>> {
        self.questions.get(&self.config.questions_path())
    }

    /// Sorted role names as a cacheable response
    pub fn roles(&self, validator: Option<&str>) -> Result<Response> {
        let snapshot = self.bank()?;
        let roles: Vec<&str> = snapshot.keys().collect();
        self.conditional
            .respond(validator, &roles, self.config.roles_max_age)
    }

    /// One page of questions as a cacheable response
    pub fn questions(&self, query: &QuestionQuery, validator: Option<&str>) -> Result<Response> {
        let page = self.question_page(query)?;
        self.conditional
            .respond(validator, &page, self.config.questions_max_age)
    }

    /// One page of questions
    pub fn question_page(&self, query: &QuestionQuery) -> Result<Vec<Question>> {
        check_bound("limit", query.page.limit, 1, 200)?;
        check_bound("offset", query.page.offset, 0, 10_000)?;

        let snapshot = self.bank()?;
        let selection = bank::filtered(&snapshot, &query.role, query.difficulty)?;
        Ok(bank::page(selection, query.page)
            .into_iter()
            .cloned()
            .collect())
    }

    /// The `index`-th question for a role, wrapping around
    pub fn next_question(
        &self,
        role: &str,
        difficulty: Option<Difficulty>,
        index: usize,
    ) -> Result<Question> {
        let snapshot = self.bank()?;
        let selection = bank::filtered(&snapshot, role, difficulty)?;
        bank::pick_next(&selection, index).cloned()
    }

    /// A random question for a role; reproducible with `seed`
    pub fn random_question(
        &self,
        role: &str,
        difficulty: Option<Difficulty>,
        seed: Option<u64>,
    ) -> Result<Question> {
        let snapshot = self.bank()?;
        let selection = bank::filtered(&snapshot, role, difficulty)?;
        bank::pick_random(&selection, seed).cloned()
    }

    /// Substring search over text and topic
    pub fn search(&self, query: &str, role: Option<&str>, limit: usize) -> Result<Vec<Question>> {
        check_bound("limit", limit, 1, 200)?;
        let snapshot = self.bank()?;
        Ok(bank::search(&snapshot, query, role, limit)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Trainer listing straight from the file
    pub fn trainer_questions(
        &self,
        role: Option<&str>,
        topic: Option<&str>,
        difficulty: Option<Difficulty>,
        include_core: bool,
    ) -> Result<Vec<Question>> {
        self.editor.list(role, topic, difficulty, include_core)
    }

    pub fn create_question(&self, draft: QuestionDraft) -> Result<Question> {
        let question = self.editor.create(draft)?;
        self.questions.invalidate();
        Ok(question)
    }

    pub fn update_question(&self, id: &str, patch: QuestionPatch) -> Result<Question> {
        let question = self.editor.update(id, patch)?;
        self.questions.invalidate();
        Ok(question)
    }

    pub fn delete_question(&self, id: &str) -> Result<()> {
        self.editor.delete(id)?;
        self.questions.invalidate();
        Ok(())
    }

    // =========================================================================
    // Attempts
    // =========================================================================

    /// Newest attempts first, optionally for one role
    pub fn list_attempts(&self, role: Option<&str>, limit: usize) -> Result<Vec<Attempt>> {
        check_bound("limit", limit, 1, 500)?;
        self.attempts
            .read_all(limit, |a| role.map_or(true, |r| a.role == r))
    }

    pub fn get_attempt(&self, id: &str) -> Result<Attempt> {
        self.attempts.find(id)
    }

    /// Persist a new attempt for a known role
    pub fn add_attempt(&self, draft: AttemptDraft) -> Result<Attempt> {
        self.require_role(&draft.role)?;
        let attempt = draft.into_attempt(Utc::now())?;
        self.attempts.append(&attempt)?;
        Ok(attempt)
    }

    pub fn update_attempt(&self, id: &str, patch: AttemptPatch) -> Result<Attempt> {
        if let Some(role) = patch.role.as_deref() {
            self.require_role(role)?;
        }
        self.attempts.update(id, |current| patch.apply(current))
    }

    pub fn delete_attempt(&self, id: &str) -> Result<()> {
        self.attempts.delete(id)
    }

    /// CSV of up to [`MAX_SCAN`] attempts, newest first
    pub fn export_attempts_csv(&self, role: Option<&str>) -> Result<String> {
        let attempts = self
            .attempts
            .read_all(MAX_SCAN, |a| role.map_or(true, |r| a.role == r))?;

        let mut out = String::from("id,role,score,duration_min,date,difficulty\r\n");
        for a in &attempts {
            let _ = write!(
                out,
                "{},{},{},{},{},{}\r\n",
                csv_field(&a.id),
                csv_field(&a.role),
                a.score,
                a.duration_min,
                canonical_timestamp(&a.date),
                a.difficulty.map(Difficulty::as_str).unwrap_or("")
            );
        }
        Ok(out)
    }

    /// Append `count` synthetic attempts (reproducible per `seed`)
    pub fn seed_attempts(&self, count: usize, seed: u64, role: Option<&str>) -> Result<usize> {
        check_bound("count", count, 1, 500)?;

        let roles: Vec<String> = match role {
            Some(role) => vec![role.to_string()],
            None => {
                let snapshot = self.bank()?;
                let roles: Vec<String> = snapshot.keys().map(str::to_string).collect();
                if roles.is_empty() {
                    vec![FALLBACK_SEED_ROLE.to_string()]
                } else {
                    roles
                }
            }
        };

        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..count {
            let role = roles.choose(&mut rng).cloned().unwrap_or_default();
            let attempt = AttemptDraft {
                role,
                score: rng.gen_range(35..=95),
                duration_min: rng.gen_range(8..=32),
                date: None,
                difficulty: Difficulty::ALL.choose(&mut rng).copied(),
            }
            .into_attempt(Utc::now())?;
            self.attempts.append(&attempt)?;
        }

        tracing::info!("Seeded {} attempts", count);
        Ok(count)
    }

    /// Normalize stored attempt dates (keeps a `.bak` copy)
    pub fn repair_attempts(&self) -> Result<RepairReport> {
        self.attempts.repair()
    }

    // =========================================================================
    // Transcripts & Analysis
    // =========================================================================

    pub fn record_transcript(&self, draft: TranscriptDraft) -> Result<Transcript> {
        let transcript = draft.into_transcript(Utc::now())?;
        self.transcripts.append(&transcript)?;
        Ok(transcript)
    }

    pub fn list_transcripts(&self, limit: usize) -> Result<Vec<Transcript>> {
        check_bound("limit", limit, 1, 1000)?;
        self.transcripts.read_recent(limit)
    }

    pub fn get_transcript(&self, id: &str) -> Result<Transcript> {
        self.transcripts.find(id)
    }

    pub fn record_analysis(&self, draft: AnalysisDraft) -> Result<AnalysisRecord> {
        let record = draft.into_record(Utc::now())?;
        self.analysis.append(&record)?;
        Ok(record)
    }

    pub fn list_analysis(&self, limit: usize, session_id: Option<&str>) -> Result<Vec<AnalysisRecord>> {
        check_bound("limit", limit, 1, 1000)?;
        self.analysis
            .read_all(limit, |r| session_id.map_or(true, |s| r.session_id == s))
    }

    pub fn get_analysis(&self, id: &str) -> Result<AnalysisRecord> {
        self.analysis.find(id)
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    pub fn health(&self) -> Result<Health> {
        let snapshot = self.bank()?;
        Ok(Health {
            ok: true,
            roles: snapshot.keys().map(str::to_string).collect(),
            counts: snapshot.counts(),
            questions_file: self.config.questions_path().display().to_string(),
            questions_size: fs::metadata(self.config.questions_path())
                .map(|m| m.len())
                .unwrap_or(0),
            attempts_file: self.attempts.path().display().to_string(),
            attempts_size: self.attempts.size_bytes(),
            last_questions_load_ts: unix_seconds(snapshot.modified()),
            snapshot_loads: self.questions.load_count(),
            server_time: unix_seconds(SystemTime::now()),
        })
    }

    pub fn stats(&self) -> Result<Stats> {
        let snapshot = self.bank()?;
        let attempts = self.attempts.read_recent(MAX_SCAN)?;

        let mut attempts_by_role = BTreeMap::new();
        let mut attempts_by_difficulty = BTreeMap::new();
        for a in &attempts {
            *attempts_by_role.entry(a.role.clone()).or_insert(0) += 1;
            let difficulty = a.difficulty.map(Difficulty::as_str).unwrap_or("unknown");
            *attempts_by_difficulty
                .entry(difficulty.to_string())
                .or_insert(0) += 1;
        }

        Ok(Stats {
            questions_per_role: snapshot.counts(),
            attempts_total: attempts.len(),
            attempts_by_role,
            attempts_by_difficulty,
        })
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn attempts(&self) -> &AppendLog<Attempt> {
        &self.attempts
    }

    pub fn transcripts(&self) -> &AppendLog<Transcript> {
        &self.transcripts
    }

    pub fn analysis(&self) -> &AppendLog<AnalysisRecord> {
        &self.analysis
    }

    pub fn question_cache(&self) -> &SnapshotCache<QuestionBankLoader> {
        &self.questions
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    pub fn conditional(&self) -> &ConditionalCache {
        &self.conditional
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn require_role(&self, role: &str) -> Result<()> {
        if self.bank()?.partition(role).is_none() {
            return Err(StoreError::Validation(format!("unknown role {:?}", role)));
        }
        Ok(())
    }
}

fn check_bound(name: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(StoreError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn unix_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
