//! Atomic rewriter
//!
//! Full-file transform-and-replace. Callers are responsible for holding
//! the log's write lock for the whole call.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::codec::{decode_line, encode_record, Record};
use crate::error::{Result, StoreError};

use super::durability::{durable_sync, sync_dir};
use super::retry::{is_transient_replace_error, RetryError, RetryPolicy};

/// Outcome of one rewrite pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Records written to the replacement file
    pub written: usize,

    /// Records the transform asked to drop
    pub dropped: usize,

    /// Lines that could not be decoded and were left out
    pub skipped: usize,
}

/// Rewrite the log at `path` through `transform`
///
/// Survivors keep their original (oldest-first) order and get their
/// `timestamp_field` normalized. A missing file is a no-op.
pub fn rewrite_file<F>(
    path: &Path,
    timestamp_field: &str,
    policy: &RetryPolicy,
    mut transform: F,
) -> Result<RewriteStats>
where
    F: FnMut(Record) -> Option<Record>,
{
    let source = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RewriteStats::default()),
        Err(e) => return Err(StoreError::io_at("open for rewrite", path, e)),
    };

    let mut stats = RewriteStats::default();

    replace_with(path, policy, |out| {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| StoreError::io_at("read for rewrite", path, e))?;
            if n == 0 {
                break;
            }

            let records = match std::str::from_utf8(&buf)
                .map_err(|e| StoreError::Decode(e.to_string()))
                .and_then(decode_line)
            {
                Ok(records) => records,
                Err(e) => {
                    tracing::debug!("Skipping malformed line in {}: {}", path.display(), e);
                    stats.skipped += 1;
                    continue;
                }
            };

            for record in records {
                match transform(record) {
                    Some(kept) => {
                        let line = encode_record(&kept, timestamp_field)?;
                        out.write_all(line.as_bytes())?;
                        out.write_all(b"\n")?;
                        stats.written += 1;
                    }
                    None => stats.dropped += 1,
                }
            }
        }

        Ok(())
    })?;

    tracing::info!(
        "Rewrote {}: {} written, {} dropped, {} skipped",
        path.display(),
        stats.written,
        stats.dropped,
        stats.skipped
    );

    Ok(stats)
}

/// Write a replacement for `path` and atomically swap it in
///
/// `write` fills a temp file created next to `path`. The temp file is
/// synced, renamed over `path` (retrying transient failures per `policy`),
/// and the directory is synced. If anything fails the temp file is removed
/// and `path` is untouched.
pub fn replace_with<F>(path: &Path, policy: &RetryPolicy, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut prefix = OsString::from(".");
    prefix.push(path.file_name().unwrap_or_default());
    prefix.push(".");

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| StoreError::io_at("create temp file", dir, e))?;

    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write(&mut out)?;
        out.flush()
            .map_err(|e| StoreError::io_at("flush temp file", path, e))?;
    }
    durable_sync(tmp.as_file()).map_err(|e| StoreError::io_at("sync temp file", path, e))?;

    persist_with_retry(tmp, path, policy)?;

    sync_dir(dir).map_err(|e| StoreError::io_at("sync directory", dir, e))?;
    Ok(())
}

fn persist_with_retry(tmp: NamedTempFile, path: &Path, policy: &RetryPolicy) -> Result<()> {
    let mut pending = Some(tmp);

    let outcome = policy.run(
        |_| {
            let Some(tmp) = pending.take() else {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "temp file already persisted",
                ));
            };
            match tmp.persist(path) {
                Ok(_) => Ok(()),
                Err(e) => {
                    pending = Some(e.file);
                    Err(e.error)
                }
            }
        },
        is_transient_replace_error,
    );

    match outcome {
        Ok(()) => Ok(()),
        Err(RetryError::Fatal(e)) => Err(StoreError::io_at("replace", path, e)),
        Err(RetryError::Exhausted { attempts, last }) => Err(StoreError::ReplaceRetryExhausted {
            path: path.to_path_buf(),
            attempts,
            source: last,
        }),
    }
}
