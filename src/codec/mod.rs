//! Codec Module
//!
//! Converts one logical record to and from one line of text.
//!
//! ## Responsibilities
//! - Encode records as compact, single-line JSON objects
//! - Normalize the record's timestamp field to canonical UTC
//! - Decode lines independently, flattening legacy array lines
//! - Classify decoded objects as schema-conformant or permissive
//!
//! ## Line Format
//! ```text
//! {"date":"2025-08-29T05:20:23.570620Z","id":"...","role":"...",...}\n
//! [{"id":"a",...},{"id":"b",...}]\n          <- legacy, read-only
//! ```
//!
//! Raw newlines never appear inside a line: JSON string escaping turns
//! them into `\n` sequences.

mod line;
mod record;
mod timestamp;

pub use line::{decode_as, decode_line, encode, encode_record, Decoded};
pub use record::{Record, Schema};
pub use timestamp::{canonical_timestamp, lenient_utc, normalize_timestamp, parse_timestamp};
