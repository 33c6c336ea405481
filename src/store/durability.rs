//! Durable sync helpers
//!
//! Data must reach stable storage before an append returns and before a
//! rewritten file is renamed into place.

use std::fs::File;
use std::io;
use std::path::Path;

/// Flush file contents (and the size needed to read them back) to disk
pub fn durable_sync(file: &File) -> io::Result<()> {
    file.sync_data()
}

/// Persist directory entries so a completed rename survives power loss
///
/// Directories cannot be opened for sync on Windows; the rename there is
/// already journaled by the filesystem.
pub fn sync_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        File::open(dir)?.sync_all()
    }

    #[cfg(not(unix))]
    {
        let _ = dir;
        Ok(())
    }
}
