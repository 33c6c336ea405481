//! Bank Module
//!
//! The interview question bank: a role-grouped JSON file, read through the
//! snapshot cache and edited with atomic whole-file replaces.
//!
//! ## File Format
//! ```text
//! {
//!   "Backend Developer": [ {"id": "...", "text": "...", "topic": "...", "difficulty": "easy"}, ... ],
//!   "Data Analyst":      [ ... ]
//! }
//! ```
//! A flat list of questions (each with its own `role`) is accepted too and
//! regrouped on load.

mod editor;
mod loader;
mod query;

pub use editor::QuestionBankEditor;
pub use loader::{parse_bank, QuestionBankLoader};
pub use query::{filtered, page, pick_next, pick_random, search, PageRequest};
