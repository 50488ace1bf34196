use crate::StoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Exclusive advisory lock held for the duration of an answer-store write.
pub struct StoreLock {
    lock_file: File,
}

impl StoreLock {
    pub fn acquire(lock_path: &Path) -> Result<Self, StoreError> {
        let file = open_lock_file(lock_path)?;
        file.lock_exclusive()
            .map_err(|e| StoreError::LockFailed(e.to_string()))?;
        Ok(Self { lock_file: file })
    }

    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, StoreError> {
        let file = open_lock_file(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { lock_file: file })),
            Err(_) => Ok(None),
        }
    }
}

fn open_lock_file(lock_path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?)
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}
