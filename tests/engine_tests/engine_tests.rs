//! Tests for Engine
//!
//! These tests verify:
//! - Startup (directories, attempts file, first bank load)
//! - Bank reads with conditional responses and hot reload
//! - Attempt lifecycle, export, seeding and repair
//! - Transcript and analysis logs
//! - Admission control per client and class

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use linestore::bank::PageRequest;
use linestore::limiter::ManualClock;
use linestore::model::{
    AnalysisDraft, AttemptDraft, AttemptPatch, Difficulty, QuestionDraft, TranscriptDraft,
};
use linestore::protocol::Status;
use linestore::{AdmissionClass, Config, Engine, QuestionQuery, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const BANK: &str = r#"{
  "Backend Developer": [
    {"id": "be-1", "text": "Explain database indexing", "topic": "Databases", "difficulty": "medium"},
    {"id": "be-2", "text": "What is a mutex?", "topic": "Concurrency", "difficulty": "easy"}
  ],
  "Frontend Developer": [
    {"id": "fe-1", "text": "Explain the virtual DOM", "topic": "React", "difficulty": "easy"}
  ]
}"#;

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("questions.json"), BANK).unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

fn attempt(role: &str, score: u32) -> AttemptDraft {
    AttemptDraft {
        role: role.to_string(),
        score,
        duration_min: 20,
        date: None,
        difficulty: Some(Difficulty::Medium),
    }
}

fn query(role: &str) -> QuestionQuery {
    QuestionQuery {
        role: role.to_string(),
        difficulty: None,
        page: PageRequest::default(),
    }
}

fn body_json(response: &linestore::protocol::Response) -> serde_json::Value {
    serde_json::from_slice(&response.body).unwrap()
}

// =============================================================================
// Startup Tests
// =============================================================================

#[test]
fn test_open_creates_data_dir_and_attempts_file() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");
    let bank_path = temp_dir.path().join("bank.json");
    fs::write(&bank_path, BANK).unwrap();

    let config = Config::builder()
        .data_dir(&data_dir)
        .questions_file(&bank_path)
        .build();
    let engine = Engine::open(config).unwrap();

    assert!(data_dir.join("attempts.jsonl").exists());
    assert_eq!(engine.question_cache().load_count(), 1);
}

#[test]
fn test_open_without_bank_fails() {
    let temp_dir = TempDir::new().unwrap();

    let result = Engine::open_path(temp_dir.path());

    assert!(matches!(result, Err(StoreError::SourceMissing(_))));
}

// =============================================================================
// Question Bank Tests
// =============================================================================

#[test]
fn test_roles_are_conditional() {
    let (_dir, engine) = setup_temp_engine();

    let full = engine.roles(None).unwrap();
    assert_eq!(full.status, Status::Ok);
    assert_eq!(
        body_json(&full),
        serde_json::json!(["Backend Developer", "Frontend Developer"])
    );
    let cache = full.cache.unwrap();
    assert_eq!(cache.cache_control, "public, max-age=60");

    let again = engine.roles(Some(&cache.etag)).unwrap();
    assert!(again.is_not_modified());
    assert!(again.body.is_empty());
}

#[test]
fn test_question_page_and_bounds() {
    let (_dir, engine) = setup_temp_engine();

    let response = engine.questions(&query("Backend Developer"), None).unwrap();
    assert_eq!(body_json(&response).as_array().unwrap().len(), 2);
    assert_eq!(response.cache.unwrap().cache_control, "public, max-age=30");

    let mut too_big = query("Backend Developer");
    too_big.page.limit = 201;
    assert!(matches!(
        engine.questions(&too_big, None),
        Err(StoreError::Validation(_))
    ));

    assert!(matches!(
        engine.questions(&query("Chef"), None),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn test_next_random_and_search() {
    let (_dir, engine) = setup_temp_engine();

    let easy = engine
        .next_question("Backend Developer", Some(Difficulty::Easy), 5)
        .unwrap();
    assert_eq!(easy.id, "be-2");

    let random = engine.random_question("Frontend Developer", None, Some(1)).unwrap();
    assert_eq!(random.id, "fe-1");

    let found = engine.search("explain", None, 10).unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_external_bank_edit_is_hot_reloaded() {
    let (dir, engine) = setup_temp_engine();
    let path = dir.path().join("questions.json");
    let before = fs::metadata(&path).unwrap().modified().unwrap();

    fs::write(&path, r#"{"Data Engineer": [{"id": "de-1", "text": "What is a data lake?"}]}"#)
        .unwrap();
    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(before + Duration::from_secs(2))
        .unwrap();

    let roles = body_json(&engine.roles(None).unwrap());
    assert_eq!(roles, serde_json::json!(["Data Engineer"]));
    assert_eq!(engine.question_cache().load_count(), 2);
}

#[test]
fn test_trainer_edits_are_visible_to_readers() {
    let (_dir, engine) = setup_temp_engine();

    let created = engine
        .create_question(QuestionDraft {
            role: "Frontend Developer".into(),
            text: "What is hydration?".into(),
            topic: None,
            difficulty: None,
        })
        .unwrap();

    assert_eq!(engine.next_question("Frontend Developer", None, 0).unwrap(), created);
    assert_eq!(
        engine.trainer_questions(None, None, None, false).unwrap(),
        vec![created.clone()]
    );

    engine.delete_question(&created.id).unwrap();
    assert_eq!(engine.next_question("Frontend Developer", None, 0).unwrap().id, "fe-1");
}

// =============================================================================
// Attempt Tests
// =============================================================================

#[test]
fn test_attempt_lifecycle() {
    let (_dir, engine) = setup_temp_engine();

    let first = engine.add_attempt(attempt("Backend Developer", 70)).unwrap();
    let second = engine.add_attempt(attempt("Frontend Developer", 80)).unwrap();

    let all = engine.list_attempts(None, 50).unwrap();
    assert_eq!(all, vec![second.clone(), first.clone()]);
    assert_eq!(
        engine.list_attempts(Some("Backend Developer"), 50).unwrap(),
        vec![first.clone()]
    );

    let updated = engine
        .update_attempt(
            &first.id,
            AttemptPatch {
                score: Some(95),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.score, 95);
    assert_eq!(engine.get_attempt(&first.id).unwrap().score, 95);

    engine.delete_attempt(&second.id).unwrap();
    assert!(matches!(
        engine.get_attempt(&second.id),
        Err(StoreError::NotFound { .. })
    ));
    assert_eq!(engine.list_attempts(None, 50).unwrap().len(), 1);
}

#[test]
fn test_attempts_for_unknown_roles_are_rejected() {
    let (_dir, engine) = setup_temp_engine();

    let err = engine.add_attempt(attempt("Astronaut", 50)).unwrap_err();
    assert_eq!(err.status(), Status::BadRequest);

    let stored = engine.add_attempt(attempt("Backend Developer", 50)).unwrap();
    let patch = AttemptPatch {
        role: Some("Astronaut".into()),
        ..Default::default()
    };
    assert!(matches!(
        engine.update_attempt(&stored.id, patch),
        Err(StoreError::Validation(_))
    ));
}

#[test]
fn test_list_limit_bounds() {
    let (_dir, engine) = setup_temp_engine();

    assert!(engine.list_attempts(None, 0).is_err());
    assert!(engine.list_attempts(None, 501).is_err());
    assert!(engine.list_attempts(None, 500).is_ok());
}

#[test]
fn test_export_csv() {
    let (_dir, engine) = setup_temp_engine();
    let a = engine.add_attempt(attempt("Backend Developer", 61)).unwrap();

    let csv = engine.export_attempts_csv(None).unwrap();
    let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();

    assert_eq!(lines[0], "id,role,score,duration_min,date,difficulty");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with(&format!("{},Backend Developer,61,20,", a.id)));
    assert!(lines[1].ends_with(",medium"));

    assert_eq!(
        engine
            .export_attempts_csv(Some("Frontend Developer"))
            .unwrap()
            .split("\r\n")
            .filter(|l| !l.is_empty())
            .count(),
        1
    );
}

#[test]
fn test_seed_is_bounded_and_reproducible_in_shape() {
    let (_dir, engine) = setup_temp_engine();

    assert_eq!(engine.seed_attempts(30, 7, None).unwrap(), 30);
    let seeded = engine.list_attempts(None, 100).unwrap();

    assert_eq!(seeded.len(), 30);
    assert!(seeded.iter().all(|a| (35..=95).contains(&a.score)));
    assert!(seeded.iter().all(|a| (8..=32).contains(&a.duration_min)));
    assert!(seeded
        .iter()
        .all(|a| a.role == "Backend Developer" || a.role == "Frontend Developer"));

    engine.seed_attempts(5, 1, Some("Frontend Developer")).unwrap();
    assert_eq!(
        engine.list_attempts(Some("Frontend Developer"), 100).unwrap().len(),
        seeded.iter().filter(|a| a.role == "Frontend Developer").count() + 5
    );

    assert!(engine.seed_attempts(0, 1, None).is_err());
    assert!(engine.seed_attempts(501, 1, None).is_err());
}

#[test]
fn test_legacy_attempts_are_served_and_repair_rewrites_dates() {
    let (_dir, engine) = setup_temp_engine();
    let mut file = OpenOptions::new()
        .append(true)
        .open(engine.attempts().path())
        .unwrap();
    writeln!(
        file,
        r#"{{"id":"legacy","role":"Backend Developer","score":55,"duration_min":14,"date":"2025-08-20 10:00:00"}}"#
    )
    .unwrap();
    drop(file);

    assert_eq!(engine.get_attempt("legacy").unwrap().score, 55);
    assert!(engine
        .list_attempts(None, 100)
        .unwrap()
        .iter()
        .any(|a| a.id == "legacy"));

    let report = engine.repair_attempts().unwrap();
    assert_eq!(report.normalized, 1);
    assert_eq!(report.repaired, 0);
    assert!(report.backup.exists());
    assert!(fs::read_to_string(engine.attempts().path())
        .unwrap()
        .contains(r#""date":"2025-08-20T10:00:00Z""#));
    assert_eq!(engine.get_attempt("legacy").unwrap().score, 55);
}

// =============================================================================
// Transcript & Analysis Tests
// =============================================================================

#[test]
fn test_transcripts_round_trip() {
    let (_dir, engine) = setup_temp_engine();

    let t = engine
        .record_transcript(TranscriptDraft {
            filename: "abc.webm".into(),
            original_filename: None,
            content_type: "audio/webm".into(),
            size_bytes: 2048,
            transcript: "I would start with an index".into(),
            question_id: Some("be-1".into()),
        })
        .unwrap();

    assert_eq!(t.original_filename, "abc.webm");
    assert_eq!(engine.get_transcript(&t.id).unwrap(), t);
    assert_eq!(engine.list_transcripts(10).unwrap(), vec![t]);

    let rejected = engine.record_transcript(TranscriptDraft {
        filename: "notes.txt".into(),
        original_filename: None,
        content_type: "text/plain".into(),
        size_bytes: 10,
        transcript: String::new(),
        question_id: None,
    });
    assert!(matches!(rejected, Err(StoreError::Validation(_))));
}

#[test]
fn test_analysis_filtered_by_session() {
    let (_dir, engine) = setup_temp_engine();
    let draft = |session: Option<&str>, text: &str| AnalysisDraft {
        text: text.into(),
        session_id: session.map(str::to_string),
        model: "heuristic".into(),
        score: 60,
        keywords: vec!["index".into()],
        key_phrases: Vec::new(),
        summary: String::new(),
        rationale: String::new(),
    };

    let a = engine.record_analysis(draft(Some("s1"), "first answer")).unwrap();
    let b = engine.record_analysis(draft(None, "second answer")).unwrap();
    let c = engine.record_analysis(draft(Some("s1"), "third answer")).unwrap();

    assert_eq!(b.session_id, "default");
    assert_eq!(
        engine.list_analysis(10, Some("s1")).unwrap(),
        vec![c.clone(), a.clone()]
    );
    assert_eq!(engine.list_analysis(10, None).unwrap().len(), 3);
    assert_eq!(engine.get_analysis(&a.id).unwrap().text_hash, a.text_hash);
}

// =============================================================================
// Reporting Tests
// =============================================================================

#[test]
fn test_stats_and_health() {
    let (_dir, engine) = setup_temp_engine();
    engine.add_attempt(attempt("Backend Developer", 50)).unwrap();
    engine.add_attempt(attempt("Backend Developer", 60)).unwrap();
    let mut no_difficulty = attempt("Frontend Developer", 70);
    no_difficulty.difficulty = None;
    engine.add_attempt(no_difficulty).unwrap();

    let stats = engine.stats().unwrap();
    assert_eq!(stats.attempts_total, 3);
    assert_eq!(stats.attempts_by_role["Backend Developer"], 2);
    assert_eq!(stats.attempts_by_difficulty["medium"], 2);
    assert_eq!(stats.attempts_by_difficulty["unknown"], 1);
    assert_eq!(stats.questions_per_role["Backend Developer"], 2);

    let health = engine.health().unwrap();
    assert!(health.ok);
    assert_eq!(health.roles.len(), 2);
    assert!(health.attempts_size > 0);
    assert!(health.questions_size > 0);
}

// =============================================================================
// Admission Tests
// =============================================================================

#[test]
fn test_admission_per_client_and_class() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("questions.json"), BANK).unwrap();
    let clock = ManualClock::new();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .read_rate(3)
        .mutate_rate(1)
        .build();
    let engine = Engine::with_clock(config, Arc::new(clock.clone())).unwrap();

    engine.admit(AdmissionClass::Mutate, "10.0.0.1").unwrap();
    let refused = engine.admit(AdmissionClass::Mutate, "10.0.0.1").unwrap_err();
    assert!(refused.is_retriable());

    engine.admit(AdmissionClass::Mutate, "10.0.0.2").unwrap();
    engine.admit(AdmissionClass::Read, "10.0.0.1").unwrap();

    clock.advance(Duration::from_secs(61));
    engine.admit(AdmissionClass::Mutate, "10.0.0.1").unwrap();
}
