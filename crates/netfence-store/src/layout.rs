use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Current answer store format version. Incremented on incompatible layout changes.
pub const STORE_FORMAT_VERSION: u32 = 1;
const VERSION_FILE: &str = "version";

/// Directory layout of a file-backed answer store.
///
/// ```text
/// <root>/version          format marker
/// <root>/.lock            exclusive write lock
/// <root>/answers/<key>.json
/// ```
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreVersion {
    format_version: u32,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn answers_dir(&self) -> PathBuf {
        self.root.join("answers")
    }

    #[inline]
    pub fn answer_path(&self, key: &str) -> PathBuf {
        self.answers_dir().join(format!("{key}.json"))
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".lock")
    }

    pub fn is_initialized(&self) -> bool {
        self.root.join(VERSION_FILE).exists()
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.answers_dir())?;

        let version_path = self.root.join(VERSION_FILE);
        if version_path.exists() {
            self.verify_version()?;
        } else {
            let ver = StoreVersion {
                format_version: STORE_FORMAT_VERSION,
            };
            let content = serde_json::to_string_pretty(&ver)?;
            let mut tmp = NamedTempFile::new_in(&self.root)?;
            tmp.write_all(content.as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&version_path)
                .map_err(|e| StoreError::Io(e.error))?;
            crate::fsync_dir(&self.root)?;
        }

        Ok(())
    }

    pub fn verify_version(&self) -> Result<(), StoreError> {
        let version_path = self.root.join(VERSION_FILE);
        let content = fs::read_to_string(&version_path)?;
        let ver: StoreVersion = serde_json::from_str(&content)?;

        if ver.format_version != STORE_FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: STORE_FORMAT_VERSION,
                found: ver.format_version,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_correct() {
        let layout = StoreLayout::new("/tmp/netfence-test");
        assert_eq!(
            layout.answers_dir(),
            PathBuf::from("/tmp/netfence-test/answers")
        );
        assert_eq!(
            layout.answer_path("network_isolation"),
            PathBuf::from("/tmp/netfence-test/answers/network_isolation.json")
        );
        assert_eq!(layout.lock_file(), PathBuf::from("/tmp/netfence-test/.lock"));
    }

    #[test]
    fn initialize_creates_directories_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        assert!(!layout.is_initialized());
        layout.initialize().unwrap();
        assert!(layout.answers_dir().is_dir());
        assert!(layout.is_initialized());
        layout.verify_version().unwrap();
    }

    #[test]
    fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        layout.initialize().unwrap();
        layout.initialize().unwrap();
        layout.verify_version().unwrap();
    }

    #[test]
    fn version_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("version"), r#"{"format_version": 99}"#).unwrap();
        let layout = StoreLayout::new(dir.path());
        assert!(matches!(
            layout.initialize(),
            Err(StoreError::VersionMismatch {
                expected: STORE_FORMAT_VERSION,
                found: 99
            })
        ));
    }
}
