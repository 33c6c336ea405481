//! Conditional Module
//!
//! Content fingerprints and "not modified" short-circuiting.
//!
//! ## Responsibilities
//! - Serialize payloads canonically (sorted keys, compact, stable numbers)
//! - Fingerprint the exact bytes with SHA-256 (strong entity tag)
//! - Answer NOT_MODIFIED when the caller's validator matches
//!
//! ## Canonical Form
//! Payloads go through `serde_json::Value` first. Object keys are kept in
//! a `BTreeMap` there, so field order never depends on struct layout or
//! insertion order, and the same logical payload always hashes the same.

mod etag;

pub use etag::{canonical_bytes, fingerprint, validator_matches, ConditionalCache};
