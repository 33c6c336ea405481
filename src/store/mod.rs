//! Store Module
//!
//! Append-only JSON-lines logs with atomic full-file rewrite.
//!
//! ## Responsibilities
//! - Append one durably synced line per record under a per-log lock
//! - Read newest-first without blocking writers
//! - Update/delete/repair by rewriting the whole file into a temp file
//!   and atomically renaming it over the original
//! - Retry the final rename while the target is transiently busy
//!
//! ## Rewrite Sequence
//! ```text
//!   lock ──► read log.jsonl ──► transform ──► write .log.jsonl.XXXX.tmp
//!                                                    │
//!                                              sync temp file
//!                                                    │
//!   unlock ◄── sync dir ◄── rename temp → log.jsonl (retry w/ backoff)
//! ```
//!
//! A crash before the rename leaves the original untouched; a crash after
//! it leaves the fully written replacement.

mod durability;
mod log;
mod retry;
mod rewrite;

pub use durability::{durable_sync, sync_dir};
pub use log::{AppendLog, RepairReport, ScanReport};
pub use retry::{is_transient_replace_error, RetryError, RetryPolicy};
pub use rewrite::{replace_with, rewrite_file, RewriteStats};
