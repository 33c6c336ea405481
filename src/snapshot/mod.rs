//! Snapshot Module
//!
//! In-memory materialized view of a read-mostly file, reloaded when the
//! file's modification time changes ("hot reload").
//!
//! ## Responsibilities
//! - Serve the cached snapshot after a single `stat` when nothing changed
//! - Reparse the whole source and swap it in atomically when it did
//! - Keep serving the last snapshot if the source disappears
//!
//! ## Data Structure Choice
//! `RwLock<Option<Arc<Snapshot>>>`: readers clone the `Arc` under a short
//! read lock and never observe a half-built snapshot; a reload builds the
//! new snapshot first and swaps the pointer under the write lock.

mod cache;

pub use cache::{Snapshot, SnapshotCache, SnapshotLoader};
