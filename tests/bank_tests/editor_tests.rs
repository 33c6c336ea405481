//! Tests for QuestionBankEditor

use std::fs;

use linestore::bank::{parse_bank, QuestionBankEditor};
use linestore::model::{Difficulty, QuestionDraft, QuestionPatch, QuestionSource};
use linestore::store::RetryPolicy;
use linestore::StoreError;
use tempfile::TempDir;

use super::{write_bank, BANK};

fn setup() -> (TempDir, QuestionBankEditor) {
    let dir = TempDir::new().unwrap();
    let path = write_bank(&dir, BANK);
    (dir, QuestionBankEditor::new(path, RetryPolicy::immediate(3)))
}

fn draft(role: &str, text: &str) -> QuestionDraft {
    QuestionDraft {
        role: role.to_string(),
        text: text.to_string(),
        topic: Some("Trainer".to_string()),
        difficulty: Some(Difficulty::Hard),
    }
}

#[test]
fn test_list_hides_core_unless_asked() {
    let (_dir, editor) = setup();

    assert!(editor.list(None, None, None, false).unwrap().is_empty());
    assert_eq!(editor.list(None, None, None, true).unwrap().len(), 6);
    assert_eq!(
        editor
            .list(Some("Frontend Developer"), Some("CSS"), None, true)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_create_goes_to_front_of_role() {
    let (_dir, editor) = setup();

    let created = editor.create(draft("Backend Developer", "What is backpressure?")).unwrap();

    assert_eq!(created.source, Some(QuestionSource::Trainer));
    let bank = parse_bank(&fs::read_to_string(editor.path()).unwrap()).unwrap();
    assert_eq!(bank["Backend Developer"][0].id, created.id);
    assert_eq!(bank["Backend Developer"].len(), 5);

    let trainer = editor.list(None, None, None, false).unwrap();
    assert_eq!(trainer, vec![created]);
}

#[test]
fn test_create_for_new_role_adds_partition() {
    let (_dir, editor) = setup();

    editor.create(draft("Data Engineer", "What is a data lake?")).unwrap();

    let bank = parse_bank(&fs::read_to_string(editor.path()).unwrap()).unwrap();
    assert_eq!(bank["Data Engineer"].len(), 1);
}

#[test]
fn test_update_in_place_and_across_roles() {
    let (_dir, editor) = setup();

    let edited = editor
        .update(
            "be-2",
            QuestionPatch {
                text: Some("What is a mutex, and when is it not enough?".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(edited.topic.as_deref(), Some("Concurrency"));
    let bank = parse_bank(&fs::read_to_string(editor.path()).unwrap()).unwrap();
    assert_eq!(bank["Backend Developer"][1], edited);

    let moved = editor
        .update(
            "be-2",
            QuestionPatch {
                role: Some("Frontend Developer".into()),
                ..Default::default()
            },
        )
        .unwrap();
    let bank = parse_bank(&fs::read_to_string(editor.path()).unwrap()).unwrap();
    assert_eq!(bank["Frontend Developer"][0], moved);
    assert!(bank["Backend Developer"].iter().all(|q| q.id != "be-2"));
}

#[test]
fn test_update_rejects_blank_text() {
    let (_dir, editor) = setup();
    let before = fs::read_to_string(editor.path()).unwrap();

    let result = editor.update(
        "fe-1",
        QuestionPatch {
            text: Some("   ".into()),
            ..Default::default()
        },
    );

    assert!(matches!(result, Err(StoreError::Validation(_))));
    assert_eq!(fs::read_to_string(editor.path()).unwrap(), before);
}

#[test]
fn test_delete_and_missing_ids() {
    let (_dir, editor) = setup();

    editor.delete("fe-2").unwrap();
    let bank = parse_bank(&fs::read_to_string(editor.path()).unwrap()).unwrap();
    assert_eq!(bank["Frontend Developer"].len(), 1);

    assert!(matches!(editor.delete("fe-2"), Err(StoreError::NotFound { .. })));
    assert!(matches!(
        editor.update("nope", QuestionPatch::default()),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn test_edits_on_missing_file_start_empty_bank() {
    let dir = TempDir::new().unwrap();
    let editor = QuestionBankEditor::new(dir.path().join("sub").join("q.json"), RetryPolicy::immediate(1));

    assert!(editor.list(None, None, None, true).unwrap().is_empty());
    editor.create(draft("Ops", "What is an SLO?")).unwrap();
    assert_eq!(editor.list(Some("Ops"), None, None, false).unwrap().len(), 1);
}
