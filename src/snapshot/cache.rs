//! Snapshot cache implementation

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::error::{Result, StoreError};

/// Parses a source file into partitions of entities
pub trait SnapshotLoader: Send + Sync {
    type Entity: Send + Sync;

    fn load(&self, path: &Path) -> Result<BTreeMap<String, Vec<Self::Entity>>>;
}

/// A fully materialized copy of the source, tagged with its freshness token
#[derive(Debug)]
pub struct Snapshot<E> {
    partitions: BTreeMap<String, Vec<E>>,
    source: PathBuf,
    modified: SystemTime,
}

impl<E> Snapshot<E> {
    /// Partition keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(String::as_str)
    }

    pub fn partition(&self, key: &str) -> Option<&[E]> {
        self.partitions.get(key).map(Vec::as_slice)
    }

    pub fn partitions(&self) -> &BTreeMap<String, Vec<E>> {
        &self.partitions
    }

    /// Every entity, partition by partition
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.partitions.values().flatten()
    }

    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.partitions
            .iter()
            .map(|(key, items)| (key.clone(), items.len()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.partitions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Source modification time this snapshot was built from
    pub fn modified(&self) -> SystemTime {
        self.modified
    }
}

/// Read-through cache over a [`SnapshotLoader`]
pub struct SnapshotCache<L: SnapshotLoader> {
    loader: L,
    current: RwLock<Option<Arc<Snapshot<L::Entity>>>>,
    loads: AtomicU64,
}

impl<L: SnapshotLoader> SnapshotCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            current: RwLock::new(None),
            loads: AtomicU64::new(0),
        }
    }

    /// Current snapshot of `path`, reloading it if the file changed
    ///
    /// - unchanged modification time: cached snapshot, no parse
    /// - changed (or different path, or nothing cached): full reparse
    /// - file missing: last snapshot if any, else `SourceMissing`
    pub fn get(&self, path: &Path) -> Result<Arc<Snapshot<L::Entity>>> {
        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return match self.cached() {
                    Some(stale) => {
                        tracing::warn!(
                            "Snapshot source {} missing, serving previous snapshot",
                            path.display()
                        );
                        Ok(stale)
                    }
                    None => Err(StoreError::SourceMissing(path.to_path_buf())),
                };
            }
            Err(e) => return Err(StoreError::io_at("stat snapshot source", path, e)),
        };

        if let Some(fresh) = self.fresh(path, modified) {
            return Ok(fresh);
        }

        let mut slot = self.current.write();

        // Another caller may have reloaded while we waited for the lock
        if let Some(current) = slot.as_ref() {
            if current.modified == modified && current.source == path {
                return Ok(Arc::clone(current));
            }
        }

        let partitions = self.loader.load(path)?;
        let snapshot = Arc::new(Snapshot {
            partitions,
            source: path.to_path_buf(),
            modified,
        });
        *slot = Some(Arc::clone(&snapshot));
        self.loads.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            "Loaded snapshot of {}: {} partitions, {} entities",
            path.display(),
            snapshot.partitions.len(),
            snapshot.len()
        );
        Ok(snapshot)
    }

    /// Last loaded snapshot without probing the source
    pub fn cached(&self) -> Option<Arc<Snapshot<L::Entity>>> {
        self.current.read().clone()
    }

    /// Drop the cached snapshot; the next `get` reloads
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }

    /// How many times the source has been parsed
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    fn fresh(&self, path: &Path, modified: SystemTime) -> Option<Arc<Snapshot<L::Entity>>> {
        let current = self.current.read();
        current
            .as_ref()
            .filter(|s| s.modified == modified && s.source == path)
            .map(Arc::clone)
    }
}
