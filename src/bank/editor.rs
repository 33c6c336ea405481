//! Trainer-side edits of the bank file
//!
//! Every edit loads the whole file, changes it in memory and replaces the
//! file atomically. The snapshot cache notices the new modification time
//! on its next probe.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Result, StoreError};
use crate::model::{Difficulty, Question, QuestionDraft, QuestionPatch};
use crate::store::{replace_with, RetryPolicy};

use super::loader::parse_bank;

type Bank = BTreeMap<String, Vec<Question>>;

pub struct QuestionBankEditor {
    path: PathBuf,
    replace_retry: RetryPolicy,
    /// Serializes load-modify-replace cycles
    edit_lock: Mutex<()>,
}

impl QuestionBankEditor {
    pub fn new(path: impl Into<PathBuf>, replace_retry: RetryPolicy) -> Self {
        Self {
            path: path.into(),
            replace_retry,
            edit_lock: Mutex::new(()),
        }
    }

    /// Flattened questions matching every given filter
    pub fn list(
        &self,
        role: Option<&str>,
        topic: Option<&str>,
        difficulty: Option<Difficulty>,
        include_core: bool,
    ) -> Result<Vec<Question>> {
        Ok(self
            .load()?
            .into_values()
            .flatten()
            .filter(|q| include_core || !q.is_core())
            .filter(|q| role.map_or(true, |r| q.role == r))
            .filter(|q| topic.map_or(true, |t| q.topic.as_deref().unwrap_or("") == t))
            .filter(|q| difficulty.is_none() || q.difficulty == difficulty)
            .collect())
    }

    /// Add a trainer question at the front of its role
    pub fn create(&self, draft: QuestionDraft) -> Result<Question> {
        let question = draft.into_question()?;

        let _guard = self.edit_lock.lock();
        let mut bank = self.load()?;
        bank.entry(question.role.clone())
            .or_default()
            .insert(0, question.clone());
        self.store(&bank)?;

        tracing::info!("Created question {} in {}", question.id, question.role);
        Ok(question)
    }

    /// Patch a question, moving it to the front of its new role if the
    /// role changed
    pub fn update(&self, id: &str, patch: QuestionPatch) -> Result<Question> {
        let _guard = self.edit_lock.lock();
        let mut bank = self.load()?;

        let (role, index) = locate(&bank, id).ok_or_else(|| StoreError::not_found("question", id))?;
        let current = bank[&role][index].clone();
        let updated = patch.apply(current)?;

        if updated.role == role {
            if let Some(slot) = bank.get_mut(&role).and_then(|qs| qs.get_mut(index)) {
                *slot = updated.clone();
            }
        } else {
            if let Some(qs) = bank.get_mut(&role) {
                qs.remove(index);
            }
            bank.entry(updated.role.clone())
                .or_default()
                .insert(0, updated.clone());
        }
        self.store(&bank)?;

        tracing::info!("Updated question {}", id);
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.edit_lock.lock();
        let mut bank = self.load()?;

        let (role, index) = locate(&bank, id).ok_or_else(|| StoreError::not_found("question", id))?;
        if let Some(qs) = bank.get_mut(&role) {
            qs.remove(index);
        }
        self.store(&bank)?;

        tracing::info!("Deleted question {} from {}", id, role);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Bank> {
        match fs::read_to_string(&self.path) {
            Ok(text) => parse_bank(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Bank::new()),
            Err(e) => Err(StoreError::io_at("read question bank", &self.path, e)),
        }
    }

    fn store(&self, bank: &Bank) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::io_at("create bank directory", parent, e))?;
        }
        replace_with(&self.path, &self.replace_retry, |out| {
            serde_json::to_writer_pretty(&mut *out, bank)?;
            out.write_all(b"\n")?;
            Ok(())
        })
    }
}

fn locate(bank: &Bank, id: &str) -> Option<(String, usize)> {
    bank.iter().find_map(|(role, questions)| {
        questions
            .iter()
            .position(|q| q.id == id)
            .map(|index| (role.clone(), index))
    })
}
