//! Advisory file lock serialising writers of one project's store.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::domain::errors::{DomainError, DomainResult};
use crate::services::persistence::ensure_dir;

pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const LOCK_RETRY: Duration = Duration::from_millis(50);

/// Held exclusive lock; released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Wait up to `timeout` for the exclusive lock on `path`.
    pub fn acquire(path: &Path, timeout: Duration) -> DomainResult<Self> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| DomainError::StoreLock {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        let start = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    if start.elapsed() >= timeout {
                        return Err(DomainError::StoreLock {
                            path: path.to_path_buf(),
                            reason: format!("timed out after {}s", timeout.as_secs()),
                        });
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(err) => {
                    return Err(DomainError::StoreLock {
                        path: path.to_path_buf(),
                        reason: err.to_string(),
                    })
                }
            }
        }

        tracing::trace!(path = %path.display(), "acquired store lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release store lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_times_out_until_first_drops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".lock");

        let first = StoreLock::acquire(&path, LOCK_TIMEOUT).unwrap();
        let err = StoreLock::acquire(&path, Duration::from_millis(120)).unwrap_err();
        assert!(matches!(err, DomainError::StoreLock { .. }));

        drop(first);
        StoreLock::acquire(&path, Duration::from_millis(120)).unwrap();
    }
}
