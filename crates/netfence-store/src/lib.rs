//! Answer store for netfence.
//!
//! The answer store holds the operator's declared state as free-form JSON
//! buckets addressed by fixed string keys. This crate provides the
//! `AnswerStore` trait consumed by the reconcilers, a file-backed
//! `FileAnswerStore` with atomic writes, checksums, and an exclusive write
//! lock, an in-memory `MemoryAnswerStore` for tests, and integrity
//! verification for the `doctor` command.

pub mod file;
pub mod integrity;
pub mod layout;
pub mod lock;
pub mod memory;

pub use file::{validate_answer_key, AnswerDocument, FileAnswerStore};
pub use integrity::{verify_store_integrity, IntegrityFailure, IntegrityReport};
pub use layout::{StoreLayout, STORE_FORMAT_VERSION};
pub use lock::StoreLock;
pub use memory::MemoryAnswerStore;

use std::path::Path;
use thiserror::Error;

/// One answer bucket: a free-form JSON object.
pub type Answers = serde_json::Map<String, serde_json::Value>;

/// Keyed storage for answer buckets.
///
/// Loading a key that was never saved yields an empty bucket, not an error.
pub trait AnswerStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Answers, StoreError>;

    fn save(&self, key: &str, answers: &Answers) -> Result<(), StoreError>;
}

/// Fsync a directory so that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("integrity check failed for answers '{key}': expected {expected}, got {actual}")]
    IntegrityFailure {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("lock acquisition failed: {0}")]
    LockFailed(String),
    #[error("store format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid answer key: {0}")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display_invalid_key() {
        let e = StoreError::InvalidKey("bad".to_owned());
        assert!(e.to_string().contains("invalid answer key"));
    }

    #[test]
    fn store_error_display_version_mismatch() {
        let e = StoreError::VersionMismatch {
            expected: 2,
            found: 1,
        };
        let msg = e.to_string();
        assert!(msg.contains('2'));
        assert!(msg.contains('1'));
    }

    #[test]
    fn store_error_display_integrity_failure() {
        let e = StoreError::IntegrityFailure {
            key: "network_isolation".to_owned(),
            expected: "exp".to_owned(),
            actual: "act".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.contains("network_isolation"));
        assert!(msg.contains("exp"));
        assert!(msg.contains("act"));
    }
}
