use crate::{AnswerStore, Answers, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory answer store. Records every save so callers can assert on writes.
#[derive(Default)]
pub struct MemoryAnswerStore {
    buckets: Mutex<HashMap<String, Answers>>,
    saves: Mutex<Vec<String>>,
}

impl MemoryAnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bucket(self, key: &str, answers: Answers) -> Self {
        if let Ok(mut buckets) = self.buckets.lock() {
            buckets.insert(key.to_owned(), answers);
        }
        self
    }

    /// Keys passed to `save`, in call order.
    pub fn saved_keys(&self) -> Vec<String> {
        self.saves.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl AnswerStore for MemoryAnswerStore {
    fn load(&self, key: &str) -> Result<Answers, StoreError> {
        let buckets = self
            .buckets
            .lock()
            .map_err(|e| StoreError::LockFailed(format!("mutex poisoned: {e}")))?;
        Ok(buckets.get(key).cloned().unwrap_or_default())
    }

    fn save(&self, key: &str, answers: &Answers) -> Result<(), StoreError> {
        self.buckets
            .lock()
            .map_err(|e| StoreError::LockFailed(format!("mutex poisoned: {e}")))?
            .insert(key.to_owned(), answers.clone());
        self.saves
            .lock()
            .map_err(|e| StoreError::LockFailed(format!("mutex poisoned: {e}")))?
            .push(key.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn records_saves_in_order() {
        let store = MemoryAnswerStore::new();
        store.save("a", &Answers::new()).unwrap();
        store.save("b", &Answers::new()).unwrap();
        assert_eq!(store.saved_keys(), vec!["a", "b"]);
    }

    #[test]
    fn preloaded_bucket_is_returned() {
        let mut answers = Answers::new();
        answers.insert("k".to_owned(), Value::Bool(true));
        let store = MemoryAnswerStore::new().with_bucket("key", answers.clone());
        assert_eq!(store.load("key").unwrap(), answers);
        assert!(store.load("other").unwrap().is_empty());
        assert!(store.saved_keys().is_empty());
    }
}
