//! Timestamp normalization
//!
//! Every record carries one timestamp field stored as canonical UTC text,
//! e.g. `2025-08-29T05:20:23.570620Z`. Input written by older clients may be
//! naive (`2025-08-29 05:20:23.570620`, assumed UTC) or carry an offset
//! (`2025-08-27 22:41:39.197000+00:00`, converted to UTC).

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse any of the accepted timestamp spellings into UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim().replacen(' ', "T", 1);
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    // Last resort: keep whole seconds and drop whatever trails them
    s.get(..19)
        .and_then(|head| NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").ok())
        .map(|naive| naive.and_utc())
}

/// Render a UTC timestamp in the canonical on-disk form
pub fn canonical_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Canonical form of a stored timestamp value
///
/// Returns `None` when the value is not a parseable timestamp string; the
/// caller keeps such values untouched.
pub fn normalize_timestamp(value: &Value) -> Option<String> {
    value
        .as_str()
        .and_then(parse_timestamp)
        .map(|dt| canonical_timestamp(&dt))
}

/// Serde adapter for timestamp fields
///
/// Accepts every spelling [`super::parse_timestamp`] does, so legacy naive dates
/// decode as UTC instead of failing the schema.
pub mod lenient_utc {
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {:?}", raw)))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::de::Error;
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => super::super::parse_timestamp(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {:?}", raw))),
            }
        }
    }
}
