use crate::layout::StoreLayout;
use crate::lock::StoreLock;
use crate::{fsync_dir, AnswerStore, Answers, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// On-disk envelope around one answer bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerDocument {
    pub key: String,
    pub updated_at: String,
    pub answers: Answers,
    /// blake3 checksum of the serialized `answers`. `None` for hand-written files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl AnswerDocument {
    fn compute_checksum(answers: &Answers) -> Result<String, StoreError> {
        let json = serde_json::to_string(answers)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    fn verify(&self) -> Result<(), StoreError> {
        if let Some(ref expected) = self.checksum {
            let actual = Self::compute_checksum(&self.answers)?;
            if actual != *expected {
                return Err(StoreError::IntegrityFailure {
                    key: self.key.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Ok(())
    }
}

pub fn validate_answer_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.len() > 128 {
        return Err(StoreError::InvalidKey(
            "answer key must be 1-128 characters".to_owned(),
        ));
    }
    if key.starts_with('.')
        || !key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
    {
        return Err(StoreError::InvalidKey(format!(
            "answer key '{key}' must match [a-zA-Z0-9_.-] and not start with '.'"
        )));
    }
    Ok(())
}

/// Answer store keeping one JSON document per key under a directory.
///
/// Writes are atomic (temp file + rename + directory fsync) and serialized by
/// an exclusive file lock. Reads verify the embedded checksum.
pub struct FileAnswerStore {
    layout: StoreLayout,
}

impl FileAnswerStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn get_document(&self, key: &str) -> Result<Option<AnswerDocument>, StoreError> {
        validate_answer_key(key)?;
        let path = self.layout.answer_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let doc: AnswerDocument = serde_json::from_str(&content)?;
        doc.verify()?;
        Ok(Some(doc))
    }

    /// Keys of all stored answer buckets, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.layout.answers_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_str().unwrap_or("");
            if name_str.starts_with('.') {
                continue;
            }
            match name_str.strip_suffix(".json") {
                Some(key) if validate_answer_key(key).is_ok() => keys.push(key.to_owned()),
                _ => warn!("ignoring unexpected file in answer store: '{name_str}'"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl AnswerStore for FileAnswerStore {
    fn load(&self, key: &str) -> Result<Answers, StoreError> {
        Ok(self
            .get_document(key)?
            .map(|doc| doc.answers)
            .unwrap_or_default())
    }

    fn save(&self, key: &str, answers: &Answers) -> Result<(), StoreError> {
        validate_answer_key(key)?;
        let _lock = StoreLock::acquire(&self.layout.lock_file())?;
        self.layout.initialize()?;

        let doc = AnswerDocument {
            key: key.to_owned(),
            updated_at: chrono::Utc::now().to_rfc3339(),
            answers: answers.clone(),
            checksum: Some(AnswerDocument::compute_checksum(answers)?),
        };
        let content = serde_json::to_string_pretty(&doc)?;

        let dir = self.layout.answers_dir();
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.layout.answer_path(key))
            .map_err(|e| StoreError::Io(e.error))?;
        fsync_dir(&dir)?;

        debug!("saved answers for '{key}'");
        Ok(())
    }
}
