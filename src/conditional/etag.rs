//! Entity tags and conditional responses

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::protocol::{CacheHeaders, Response};

/// Deterministic JSON bytes for `payload`
pub fn canonical_bytes<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(payload)?;
    Ok(serde_json::to_vec(&value)?)
}

/// Quoted strong entity tag over `bytes`
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(bytes))
}

/// Does an `If-None-Match` style header match `etag`?
///
/// Accepts `*`, a single tag, or a comma-separated list; a `W/` prefix on
/// a listed tag is ignored for this comparison.
pub fn validator_matches(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

/// Builds cacheable responses and counts validator hits
#[derive(Debug, Default)]
pub struct ConditionalCache {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ConditionalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full response, or NOT_MODIFIED if `validator` already names it
    pub fn respond<T: Serialize + ?Sized>(
        &self,
        validator: Option<&str>,
        payload: &T,
        max_age: u32,
    ) -> Result<Response> {
        let body = canonical_bytes(payload)?;
        let cache = CacheHeaders {
            etag: fingerprint(&body),
            cache_control: format!("public, max-age={}", max_age),
        };

        if validator.is_some_and(|v| validator_matches(v, &cache.etag)) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Response::not_modified(cache));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(Response::ok(body, Some(cache)))
    }

    /// (not-modified responses, full responses) served so far
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
