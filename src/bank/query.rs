//! Read-side queries over a bank snapshot

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Result, StoreError};
use crate::model::{Difficulty, Question};
use crate::snapshot::Snapshot;

/// Paging and ordering of a filtered bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    /// Shuffle before paging; with `seed`, the order is reproducible
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
            shuffle: false,
            seed: None,
        }
    }
}

/// Questions for `role`, optionally narrowed to one difficulty
pub fn filtered<'a>(
    snapshot: &'a Snapshot<Question>,
    role: &str,
    difficulty: Option<Difficulty>,
) -> Result<Vec<&'a Question>> {
    let bank = snapshot
        .partition(role)
        .ok_or_else(|| StoreError::not_found("role", role))?;

    Ok(bank
        .iter()
        .filter(|q| difficulty.is_none() || q.difficulty == difficulty)
        .collect())
}

/// One page of `bank`
pub fn page<'a>(mut bank: Vec<&'a Question>, request: PageRequest) -> Vec<&'a Question> {
    if request.shuffle {
        bank.shuffle(&mut rng(request.seed));
    }
    bank.into_iter()
        .skip(request.offset)
        .take(request.limit)
        .collect()
}

/// The `index`-th question, wrapping around the end of the bank
pub fn pick_next<'a>(bank: &[&'a Question], index: usize) -> Result<&'a Question> {
    if bank.is_empty() {
        return Err(StoreError::not_found("question", "empty selection"));
    }
    Ok(bank[index % bank.len()])
}

/// A random question; reproducible with `seed`
pub fn pick_random<'a>(bank: &[&'a Question], seed: Option<u64>) -> Result<&'a Question> {
    bank.choose(&mut rng(seed))
        .copied()
        .ok_or_else(|| StoreError::not_found("question", "empty selection"))
}

/// Case-insensitive substring search over question text and topic
pub fn search<'a>(
    snapshot: &'a Snapshot<Question>,
    query: &str,
    role: Option<&str>,
    limit: usize,
) -> Result<Vec<&'a Question>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(StoreError::Validation("search query must not be empty".into()));
    }

    let haystack: Vec<&Question> = match role {
        Some(role) => filtered(snapshot, role, None)?,
        None => snapshot.iter().collect(),
    };

    Ok(haystack
        .into_iter()
        .filter(|q| q.mentions(&needle))
        .take(limit)
        .collect())
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
