//! Exclusive file locking for the store.
//!
//! A sibling `<store>.lock` file carries an advisory lock so two
//! processes cannot open the same store concurrently. Acquisition polls
//! until the configured timeout elapses, matching the open contract:
//! a held lock surfaces as a lock-timeout error, not a hang.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Poll interval while waiting for a contended lock.
const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// An exclusive advisory lock on a store file.
///
/// The lock is released when this value is dropped, which covers every
/// exit path including initialization failures after acquisition.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    /// Acquires the lock for the store at `store_path`, waiting up to
    /// `timeout` for another holder to release it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LockTimeout`] if the lock is still held when
    /// the timeout elapses, or an I/O error if the lock file cannot be
    /// created.
    pub fn acquire(store_path: &Path, timeout: Duration) -> CoreResult<Self> {
        let path = lock_path(store_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let deadline = Instant::now() + timeout;
        loop {
            if file.try_lock_exclusive().is_ok() {
                return Ok(Self { path, _file: file });
            }
            if Instant::now() >= deadline {
                tracing::warn!(path = %path.display(), "store lock held by another process");
                return Err(CoreError::LockTimeout);
            }
            std::thread::sleep(RETRY_INTERVAL);
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Derives the lock-file path for a store file.
fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "store".into());
    name.push(".lock");
    store_path.with_file_name(name)
}
