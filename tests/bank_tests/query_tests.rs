//! Tests for bank loading and queries

use linestore::bank::{
    filtered, page, parse_bank, pick_next, pick_random, search, PageRequest, QuestionBankLoader,
};
use linestore::model::{Difficulty, QuestionSource};
use linestore::snapshot::SnapshotCache;
use linestore::StoreError;
use tempfile::TempDir;

use super::{write_bank, BANK};

fn ids<'a>(questions: impl IntoIterator<Item = &'a linestore::model::Question>) -> Vec<String> {
    questions.into_iter().map(|q| q.id.clone()).collect()
}

#[test]
fn test_grouped_bank_assigns_roles_and_ids() {
    let bank = parse_bank(BANK).unwrap();

    let backend = &bank["Backend Developer"];
    assert_eq!(backend.len(), 4);
    assert_eq!(backend[2].id, "Backend Developer#2");
    assert!(backend.iter().all(|q| q.role == "Backend Developer"));
    assert!(backend.iter().all(|q| q.source == Some(QuestionSource::Core)));
}

#[test]
fn test_flat_bank_is_grouped_by_role() {
    let bank = parse_bank(
        r#"[
            {"id": "a", "role": "Data", "text": "What is a join?"},
            {"id": "b", "text": "Orphan question"},
            {"id": "c", "role": "Data", "text": "What is a window function?"}
        ]"#,
    )
    .unwrap();

    assert_eq!(ids(&bank["Data"]), vec!["a", "c"]);
    assert_eq!(ids(&bank["Uncategorized"]), vec!["b"]);
}

#[test]
fn test_invalid_entries_are_left_out() {
    let bank = parse_bank(
        r#"{"Ops": [{"id": "ok", "text": "What is SRE?"}, {"id": "blank", "text": "  "}, 5], "Empty": "nope"}"#,
    )
    .unwrap();

    assert_eq!(ids(&bank["Ops"]), vec!["ok"]);
    assert!(bank["Empty"].is_empty());
}

#[test]
fn test_scalar_bank_is_rejected() {
    assert!(matches!(parse_bank("42"), Err(StoreError::Serialization(_))));
    assert!(parse_bank("{not json").is_err());
}

#[test]
fn test_filtered_by_role_and_difficulty() {
    let dir = TempDir::new().unwrap();
    let path = write_bank(&dir, BANK);
    let cache = SnapshotCache::new(QuestionBankLoader);
    let snapshot = cache.get(&path).unwrap();

    let medium = filtered(&snapshot, "Backend Developer", Some(Difficulty::Medium)).unwrap();
    assert_eq!(ids(medium), vec!["be-1", "be-4"]);

    assert!(matches!(
        filtered(&snapshot, "Chef", None),
        Err(StoreError::NotFound { kind: "role", .. })
    ));
}

#[test]
fn test_paging_and_seeded_shuffle() {
    let dir = TempDir::new().unwrap();
    let path = write_bank(&dir, BANK);
    let cache = SnapshotCache::new(QuestionBankLoader);
    let snapshot = cache.get(&path).unwrap();
    let all = filtered(&snapshot, "Backend Developer", None).unwrap();

    let second_page = page(
        all.clone(),
        PageRequest {
            offset: 2,
            limit: 2,
            ..Default::default()
        },
    );
    assert_eq!(ids(second_page), vec!["Backend Developer#2", "be-4"]);

    let shuffled = PageRequest {
        offset: 0,
        limit: 10,
        shuffle: true,
        seed: Some(42),
    };
    let once = ids(page(all.clone(), shuffled));
    let twice = ids(page(all.clone(), shuffled));
    assert_eq!(once, twice);
    assert_eq!(once.len(), 4);

    let past_end = page(
        all,
        PageRequest {
            offset: 50,
            ..Default::default()
        },
    );
    assert!(past_end.is_empty());
}

#[test]
fn test_next_wraps_and_random_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let path = write_bank(&dir, BANK);
    let cache = SnapshotCache::new(QuestionBankLoader);
    let snapshot = cache.get(&path).unwrap();
    let frontend = filtered(&snapshot, "Frontend Developer", None).unwrap();

    assert_eq!(pick_next(&frontend, 0).unwrap().id, "fe-1");
    assert_eq!(pick_next(&frontend, 3).unwrap().id, "fe-2");

    let a = pick_random(&frontend, Some(9)).unwrap();
    let b = pick_random(&frontend, Some(9)).unwrap();
    assert_eq!(a.id, b.id);

    let hard = filtered(&snapshot, "Frontend Developer", Some(Difficulty::Hard)).unwrap();
    assert!(matches!(pick_next(&hard, 0), Err(StoreError::NotFound { .. })));
    assert!(matches!(pick_random(&hard, None), Err(StoreError::NotFound { .. })));
}

#[test]
fn test_search_text_and_topic() {
    let dir = TempDir::new().unwrap();
    let path = write_bank(&dir, BANK);
    let cache = SnapshotCache::new(QuestionBankLoader);
    let snapshot = cache.get(&path).unwrap();

    assert_eq!(ids(search(&snapshot, "EXPLAIN", None, 10).unwrap()), vec!["be-1", "fe-1"]);
    assert_eq!(ids(search(&snapshot, "react", None, 10).unwrap()), vec!["fe-1"]);
    assert_eq!(
        ids(search(&snapshot, "explain", Some("Frontend Developer"), 10).unwrap()),
        vec!["fe-1"]
    );
    assert_eq!(search(&snapshot, "e", None, 2).unwrap().len(), 2);
    assert!(matches!(
        search(&snapshot, "   ", None, 10),
        Err(StoreError::Validation(_))
    ));
}
