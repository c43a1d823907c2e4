//! File-based locking to prevent concurrent runs.
//!
//! Two runs writing the same output files would race on the final rename,
//! so `update` and `build` hold an advisory lock next to the outputs.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// A guard that holds an exclusive lock on the lock file.
/// The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct LockGuard {
    _file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Attempt to acquire an exclusive lock on `path`.
    /// Returns an error if another run already holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create lock directory: {:?}", parent))?;
            }
        }

        // create+read+write without truncate: no window between create and lock
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file: {:?}", path))?;

        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "Another cidrfold run is already writing to this output directory.\n\
                 If you believe this is an error, remove the lock file: {:?}",
                path
            )
        })?;

        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
