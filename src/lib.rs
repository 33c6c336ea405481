//! # linestore
//!
//! A crash-tolerant local store for small collections of JSON records:
//! - Append-only JSON-lines logs that survive torn and malformed lines
//! - Atomic whole-file rewrites for update, delete and repair
//! - A hot-reloading snapshot of a read-mostly JSON document
//! - Per-client sliding-window admission control
//! - Content fingerprints for conditional (NOT_MODIFIED) responses
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Transport (CLI / request handler)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ admit(class, client)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │        (RateGate, ConditionalCache, owned state)             │
//! └───────┬─────────────────────┬──────────────────────┬────────┘
//!         │                     │                      │
//!         ▼                     ▼                      ▼
//!  ┌─────────────┐      ┌──────────────┐       ┌──────────────┐
//!  │  AppendLog  │      │ SnapshotCache│       │ BankEditor   │
//!  │ (per file)  │      │ (mtime probe)│       │ (trainer)    │
//!  └──────┬──────┘      └──────────────┘       └──────┬───────┘
//!         │                                           │
//!         ▼                                           ▼
//!  ┌─────────────────────────────────────────────────────────────┐
//!  │       Atomic rewrite: temp file → fsync → rename (retry)     │
//!  └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod store;
pub mod snapshot;
pub mod limiter;
pub mod conditional;
pub mod protocol;
pub mod model;
pub mod bank;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::Config;
pub use engine::{Engine, Health, QuestionQuery, Stats};
pub use limiter::AdmissionClass;
pub use store::AppendLog;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of linestore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
