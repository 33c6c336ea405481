//! Append log
//!
//! A single JSON-lines file holding records of one schema.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::codec::{self, decode_as, decode_line, normalize_timestamp, Decoded, Record, Schema};
use crate::error::{Result, StoreError};

use super::durability::durable_sync;
use super::retry::RetryPolicy;
use super::rewrite::{rewrite_file, RewriteStats};

/// Append-only record log
///
/// ## Concurrency: Single-Writer / Multiple-Reader
///
/// - **Writes** (append, rewrite, delete, update, repair): serialized by
///   `write_lock`, which is private to this log. Separate logs never
///   contend with each other.
/// - **Reads** (read_all, scan, find): take no lock. They see whole lines
///   only; a read racing a rewrite sees either the old or the new file.
pub struct AppendLog<T> {
    /// Backing file
    path: PathBuf,

    /// Serializes every mutation of the file
    write_lock: Mutex<()>,

    /// Backoff for the rename at the end of a rewrite
    replace_retry: RetryPolicy,

    _schema: PhantomData<fn() -> T>,
}

/// Every decodable record in a log, oldest first
#[derive(Debug, Clone)]
pub struct ScanReport<T> {
    pub entries: Vec<Decoded<T>>,

    /// Lines that were not valid JSON objects/arrays
    pub malformed: usize,
}

impl<T> ScanReport<T> {
    pub fn strict_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_strict()).count()
    }

    pub fn permissive_count(&self) -> usize {
        self.entries.len() - self.strict_count()
    }
}

/// Result of normalizing a log in place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Records written back
    pub total: usize,

    /// Records whose timestamp text changed
    pub normalized: usize,

    /// Records that did not fit the schema before and do now
    pub repaired: usize,

    /// Records that still do not fit the schema
    pub still_permissive: usize,

    /// Undecodable lines left out (preserved in the backup)
    pub skipped: usize,

    /// Copy of the file taken before the rewrite
    pub backup: PathBuf,
}

impl<T: Schema> AppendLog<T> {
    /// Open a log at `path`, creating its parent directory
    ///
    /// The file itself is created lazily by the first append.
    pub fn open(path: impl Into<PathBuf>, replace_retry: RetryPolicy) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::io_at("create log directory", parent, e))?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
            replace_retry,
            _schema: PhantomData,
        })
    }

    /// Create the file if it does not exist yet
    pub fn ensure_exists(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io_at("create log", &self.path, e))?;
        Ok(())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append one record; durable on return
    pub fn append(&self, record: &T) -> Result<()> {
        let mut line = codec::encode(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io_at("open for append", &self.path, e))?;

        // A crash mid-append can leave a torn last line; start a fresh one
        if ends_mid_line(&mut file).map_err(|e| StoreError::io_at("append", &self.path, e))? {
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes())
            .map_err(|e| StoreError::io_at("append", &self.path, e))?;
        durable_sync(&file).map_err(|e| StoreError::io_at("sync", &self.path, e))?;

        tracing::debug!("Appended {} {} to {}", T::KIND, record.id(), self.path.display());
        Ok(())
    }

    /// Rewrite the whole log through `transform` (`None` drops the record)
    pub fn rewrite_where<F>(&self, transform: F) -> Result<RewriteStats>
    where
        F: FnMut(Record) -> Option<Record>,
    {
        let _guard = self.write_lock.lock();
        rewrite_file(&self.path, T::TIMESTAMP_FIELD, &self.replace_retry, transform)
    }

    /// Remove every record with `id`
    ///
    /// An absent id is reported without touching the file.
    pub fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock();

        let mut present = false;
        self.for_each_record(|record| present |= record.id() == Some(id))?;
        if !present {
            return Err(StoreError::not_found(T::KIND, id));
        }

        let stats = rewrite_file(&self.path, T::TIMESTAMP_FIELD, &self.replace_retry, |record| {
            (record.id() != Some(id)).then_some(record)
        })?;

        tracing::info!(
            "Deleted {} {} ({} records) from {}",
            T::KIND,
            id,
            stats.dropped,
            self.path.display()
        );
        Ok(())
    }

    /// Replace the record with `id` by `patch(current)`
    ///
    /// The newest record with `id` (the one `find` returns) is the target.
    /// A patch that fails, or a target that does not fit the schema, is
    /// reported before any rewrite starts and leaves the file untouched.
    /// Racing updates are applied in lock order; the last one wins.
    pub fn update<F>(&self, id: &str, patch: F) -> Result<T>
    where
        F: FnOnce(T) -> Result<T>,
    {
        let _guard = self.write_lock.lock();

        let mut target = None;
        let mut occurrences = 0usize;
        self.for_each_record(|record| {
            if record.id() == Some(id) {
                occurrences += 1;
                target = Some(record);
            }
        })?;
        let target = target.ok_or_else(|| StoreError::not_found(T::KIND, id))?;

        let current = decode_as::<T>(target).strict().ok_or_else(|| {
            StoreError::Validation(format!(
                "stored {} {} does not match its schema; repair the log first",
                T::KIND,
                id
            ))
        })?;

        let updated = patch(current)?;
        updated.validate()?;
        let mut replacement = Some(Record::from_schema(&updated)?);

        let mut seen = 0usize;
        rewrite_file(&self.path, T::TIMESTAMP_FIELD, &self.replace_retry, |record| {
            if record.id() == Some(id) {
                seen += 1;
                if seen == occurrences {
                    if let Some(replacement) = replacement.take() {
                        return Some(replacement);
                    }
                }
            }
            Some(record)
        })?;

        Ok(updated)
    }

    /// Normalize every timestamp, keeping a `.bak` of the previous file
    pub fn repair(&self) -> Result<RepairReport> {
        let _guard = self.write_lock.lock();

        let mut backup = self.path.clone().into_os_string();
        backup.push(".bak");
        let backup = PathBuf::from(backup);

        match fs::copy(&self.path, &backup) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(RepairReport {
                    total: 0,
                    normalized: 0,
                    repaired: 0,
                    still_permissive: 0,
                    skipped: 0,
                    backup,
                });
            }
            Err(e) => return Err(StoreError::io_at("backup", &self.path, e)),
        }

        let field = T::TIMESTAMP_FIELD;
        let mut normalized = 0usize;
        let mut repaired = 0usize;
        let mut still_permissive = 0usize;

        let stats = rewrite_file(&self.path, field, &self.replace_retry, |mut record| {
            let was_strict = decode_as::<T>(record.clone()).is_strict();

            if let Some(current) = record.get(field).cloned() {
                if let Some(canonical) = normalize_timestamp(&current) {
                    if current.as_str() != Some(canonical.as_str()) {
                        normalized += 1;
                        record.insert(field, Value::String(canonical));
                    }
                }
            }

            match (was_strict, decode_as::<T>(record.clone()).is_strict()) {
                (false, true) => repaired += 1,
                (_, false) => still_permissive += 1,
                _ => {}
            }
            Some(record)
        })?;

        tracing::info!(
            "Repaired {}: {} normalized, {} now valid, {} still invalid, backup at {}",
            self.path.display(),
            normalized,
            repaired,
            still_permissive,
            backup.display()
        );

        Ok(RepairReport {
            total: stats.written,
            normalized,
            repaired,
            still_permissive,
            skipped: stats.skipped,
            backup,
        })
    }

    // =========================================================================
    // Reads (never take the write lock)
    // =========================================================================

    /// The newest `limit` schema-conformant records matching `filter`,
    /// newest first
    pub fn read_all<F>(&self, limit: usize, filter: F) -> Result<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut window: VecDeque<T> = VecDeque::with_capacity(limit.min(1024));

        let mut permissive = 0usize;
        let malformed = self.for_each_record(|record| match decode_as::<T>(record) {
            Decoded::Strict(typed) => {
                if filter(&typed) {
                    if window.len() == limit {
                        window.pop_front();
                    }
                    window.push_back(typed);
                }
            }
            Decoded::Permissive(_) => permissive += 1,
        })?;

        if malformed > 0 || permissive > 0 {
            tracing::debug!(
                "Read {}: skipped {} malformed lines, {} non-conforming records",
                self.path.display(),
                malformed,
                permissive
            );
        }

        Ok(window.into_iter().rev().collect())
    }

    /// The newest `limit` records, newest first
    pub fn read_recent(&self, limit: usize) -> Result<Vec<T>> {
        self.read_all(limit, |_| true)
    }

    /// Newest record with `id`
    pub fn find(&self, id: &str) -> Result<T> {
        let mut found = None;
        self.for_each_record(|record| {
            if record.id() == Some(id) {
                if let Decoded::Strict(typed) = decode_as::<T>(record) {
                    found = Some(typed);
                }
            }
        })?;
        found.ok_or_else(|| StoreError::not_found(T::KIND, id))
    }

    /// Classify every record in the file, oldest first
    pub fn scan(&self) -> Result<ScanReport<T>> {
        let mut entries = Vec::new();
        let malformed = self.for_each_record(|record| entries.push(decode_as::<T>(record)))?;
        Ok(ScanReport { entries, malformed })
    }

    /// Number of decodable records (strict or not)
    pub fn count(&self) -> Result<usize> {
        let mut count = 0usize;
        self.for_each_record(|_| count += 1)?;
        Ok(count)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file size, 0 if missing
    pub fn size_bytes(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Feed every decodable record to `visit`; returns the malformed count
    fn for_each_record<F>(&self, mut visit: F) -> Result<usize>
    where
        F: FnMut(Record),
    {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::io_at("open for read", &self.path, e)),
        };

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut malformed = 0usize;

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| StoreError::io_at("read", &self.path, e))?;
            if n == 0 {
                break;
            }

            match std::str::from_utf8(&buf)
                .map_err(|e| StoreError::Decode(e.to_string()))
                .and_then(decode_line)
            {
                Ok(records) => records.into_iter().for_each(&mut visit),
                Err(_) => malformed += 1,
            }
        }

        Ok(malformed)
    }
}

/// Whether the file is non-empty and its last byte is not a newline
fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
