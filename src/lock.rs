//! Advisory file locking for the files this tool writes.
//!
//! Appends to a merge output or an IP ledger from two processes at once
//! would interleave records, so every writer holds an exclusive flock-style
//! lock on its target for as long as it writes.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An open file holding an exclusive advisory lock.
/// The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Open `path` for appending, creating it if missing, and lock it.
    ///
    /// The handle is readable too, so callers can load the current contents
    /// under the same lock before appending.
    pub fn acquire_append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("Failed to open {} for appending", path.display()))?;
        Self::lock(file, path)
    }

    /// Open `path` read+write without truncating, creating it if missing,
    /// and lock it. Used while a file is being rewritten in place.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Self::lock(file, path)
    }

    fn lock(file: File, path: &Path) -> Result<Self> {
        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "{} is locked by another running instance.\n\
                 Wait for it to complete and try again.",
                path.display()
            )
        })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file from the start.
    ///
    /// Appends still land at the end afterwards: files opened with
    /// [`acquire_append`](Self::acquire_append) always write at EOF.
    pub fn read_all(&mut self) -> Result<String> {
        self.file
            .seek(SeekFrom::Start(0))
            .with_context(|| format!("Failed to seek {}", self.path.display()))?;
        let mut content = String::new();
        self.file
            .read_to_string(&mut content)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(content)
    }

    /// Flush file contents to disk.
    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .with_context(|| format!("Failed to sync {}", self.path.display()))
    }
}

impl Write for LockGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
