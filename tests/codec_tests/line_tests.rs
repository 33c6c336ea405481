//! Tests for line encoding and decoding
//!
//! These tests verify:
//! - One self-contained line per record
//! - Timestamp normalization on encode
//! - Array-line flattening and malformed-line rejection
//! - Strict vs permissive schema decode

use chrono::{TimeZone, Utc};
use linestore::codec::{
    canonical_timestamp, decode_as, decode_line, encode, encode_record, Decoded, Record,
};
use linestore::model::{Attempt, Difficulty};
use linestore::StoreError;
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn attempt(role: &str, score: u32) -> Attempt {
    Attempt {
        id: "a-1".to_string(),
        role: role.to_string(),
        score,
        duration_min: 15,
        date: Utc.with_ymd_and_hms(2025, 8, 29, 5, 20, 23).unwrap(),
        difficulty: Some(Difficulty::Medium),
    }
}

fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => Record::from_map(map),
        _ => panic!("not an object"),
    }
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_is_single_line_with_canonical_date() {
    let line = encode(&attempt("Backend Developer", 80)).unwrap();

    assert!(!line.contains('\n'));
    assert!(line.contains(r#""date":"2025-08-29T05:20:23Z""#));
}

#[test]
fn test_encode_escapes_embedded_newlines() {
    let line = encode(&attempt("Back\nend", 80)).unwrap();

    assert!(!line.contains('\n'));
    let decoded = decode_line(&line).unwrap();
    assert_eq!(decoded[0].get("role"), Some(&json!("Back\nend")));
}

#[test]
fn test_encode_record_normalizes_naive_timestamp() {
    let raw = record(json!({"id": "x", "created": "2025-08-29 05:20:23.570620"}));
    let line = encode_record(&raw, "created").unwrap();

    assert!(line.contains(r#""created":"2025-08-29T05:20:23.570620Z""#));
}

#[test]
fn test_encode_record_fills_missing_timestamp() {
    let raw = record(json!({"id": "x"}));
    let line = encode_record(&raw, "created").unwrap();

    let decoded = decode_line(&line).unwrap();
    let created = decoded[0].get("created").and_then(|v| v.as_str()).unwrap();
    assert!(created.ends_with('Z'));
}

#[test]
fn test_encode_record_keeps_unparseable_timestamp() {
    let raw = record(json!({"id": "x", "created": "last tuesday"}));
    let line = encode_record(&raw, "created").unwrap();

    assert!(line.contains(r#""created":"last tuesday""#));
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_object_line() {
    let records = decode_line(r#"{"id": "a", "n": 1}"#).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id(), Some("a"));
}

#[test]
fn test_decode_array_line_is_flattened() {
    let records = decode_line(r#"[{"id": "a"}, 7, {"id": "b"}]"#).unwrap();
    let ids: Vec<_> = records.iter().filter_map(|r| r.id()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn test_decode_blank_line_yields_nothing() {
    assert!(decode_line("   \r\n").unwrap().is_empty());
}

#[test]
fn test_decode_rejects_garbage_and_scalars() {
    assert!(matches!(decode_line(r#"{"id": "a""#), Err(StoreError::Decode(_))));
    assert!(matches!(decode_line("42"), Err(StoreError::Decode(_))));
    assert!(matches!(decode_line(r#""text""#), Err(StoreError::Decode(_))));
}

#[test]
fn test_decode_as_strict_for_conforming_record() {
    let line = encode(&attempt("Backend Developer", 80)).unwrap();
    let raw = decode_line(&line).unwrap().remove(0);

    match decode_as::<Attempt>(raw) {
        Decoded::Strict(a) => assert_eq!(a, attempt("Backend Developer", 80)),
        Decoded::Permissive(_) => panic!("expected strict decode"),
    }
}

#[test]
fn test_decode_as_permissive_for_out_of_range_score() {
    let raw = record(json!({
        "id": "a-1",
        "role": "Backend Developer",
        "score": 150,
        "duration_min": 10,
        "date": "2025-08-29T05:20:23Z"
    }));

    let decoded = decode_as::<Attempt>(raw.clone());
    assert!(!decoded.is_strict());
    match decoded {
        Decoded::Permissive(kept) => assert_eq!(kept, raw),
        Decoded::Strict(_) => panic!("expected permissive decode"),
    }
}

#[test]
fn test_decode_as_strict_for_naive_date() {
    let raw = record(json!({
        "id": "a-1",
        "role": "Backend Developer",
        "score": 50,
        "duration_min": 10,
        "date": "2025-08-29 05:20:23"
    }));

    let a = decode_as::<Attempt>(raw).strict().unwrap();
    assert_eq!(canonical_timestamp(&a.date), "2025-08-29T05:20:23Z");
}

#[test]
fn test_decode_as_permissive_for_unparseable_date() {
    let raw = record(json!({
        "id": "a-1",
        "role": "Backend Developer",
        "score": 50,
        "duration_min": 10,
        "date": "last tuesday"
    }));

    assert!(decode_as::<Attempt>(raw).strict().is_none());
}
