// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory locking for project files.
//!
//! The lock lives in `<file>.lock` beside the project file. Its content
//! is irrelevant; existence plus POSIX lock state is the signal. The
//! lock file is never deleted — removing it would race with concurrent
//! creators. All cooperating processes must take this lock for the
//! duration of every read-modify-write.

use crate::error::StorageError;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Wall-clock bound on lock acquisition.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
/// Delay between non-blocking acquisition attempts.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A held advisory lock. Unlocks on drop.
pub struct ProjectLock {
    file: File,
    path: PathBuf,
}

impl ProjectLock {
    /// Acquire an exclusive lock with the default timeout.
    pub fn exclusive(project_file: &Path) -> Result<Self, StorageError> {
        Self::acquire(project_file, true, DEFAULT_LOCK_TIMEOUT, LOCK_POLL_INTERVAL)
    }

    /// Acquire a shared lock with the default timeout.
    pub fn shared(project_file: &Path) -> Result<Self, StorageError> {
        Self::acquire(project_file, false, DEFAULT_LOCK_TIMEOUT, LOCK_POLL_INTERVAL)
    }

    /// Acquire with explicit timeout and poll interval.
    pub fn acquire(
        project_file: &Path,
        exclusive: bool,
        timeout: Duration,
        poll: Duration,
    ) -> Result<Self, StorageError> {
        let lock_path = lock_path_for(project_file);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let start = Instant::now();
        loop {
            let attempt = if exclusive {
                fs2::FileExt::try_lock_exclusive(&file)
            } else {
                fs2::FileExt::try_lock_shared(&file)
            };
            match attempt {
                Ok(()) => return Ok(Self { file, path: lock_path }),
                Err(_) if start.elapsed() >= timeout => {
                    return Err(StorageError::LockTimeout { path: lock_path, timeout });
                }
                Err(_) => std::thread::sleep(poll),
            }
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// `<file>.lock` beside the project file.
pub fn lock_path_for(project_file: &Path) -> PathBuf {
    let mut os = project_file.as_os_str().to_owned();
    os.push(".lock");
    PathBuf::from(os)
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
