use crate::CoreError;
use netfence_schema::{import_enabled, isolation_bucket, parse_import_document, ISOLATION_KEY};
use netfence_store::{AnswerStore, Answers};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// User-facing output sink.
pub trait Console {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn info(&self, message: &str);
}

/// One-shot ingestion of an externally produced isolation document.
pub struct ConfigImporter<'a> {
    path: PathBuf,
    store: &'a dyn AnswerStore,
}

impl<'a> ConfigImporter<'a> {
    pub fn new(path: impl Into<PathBuf>, store: &'a dyn AnswerStore) -> Self {
        Self {
            path: path.into(),
            store,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Import the document if it exists, parses, and enables isolation.
    ///
    /// Returns the imported document, or an empty map when nothing was
    /// imported. Malformed input is reported on the console and is not an
    /// error; only a failed answer-store write is.
    pub fn import(&self, console: &dyn Console) -> Result<Answers, CoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no isolation document at {}", self.path.display());
                return Ok(Answers::new());
            }
            Err(e) => {
                console.error(&format!("Invalid network-isolation.json: {e}"));
                return Ok(Answers::new());
            }
        };

        let doc = match parse_import_document(&content) {
            Ok(doc) => doc,
            Err(e) => {
                console.error(&format!("Invalid network-isolation.json: {e}"));
                return Ok(Answers::new());
            }
        };

        if !import_enabled(&doc) {
            debug!(
                "{} does not enable isolation, not importing",
                self.path.display()
            );
            return Ok(Answers::new());
        }

        self.store.save(ISOLATION_KEY, &isolation_bucket(doc.clone()))?;
        info!("imported {} into '{ISOLATION_KEY}'", self.path.display());
        console.success("Imported network isolation config into answers.");
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netfence_store::memory::MemoryAnswerStore;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        lines: RefCell<Vec<(&'static str, String)>>,
    }

    impl Console for Recorder {
        fn success(&self, message: &str) {
            self.lines.borrow_mut().push(("success", message.to_owned()));
        }
        fn error(&self, message: &str) {
            self.lines.borrow_mut().push(("error", message.to_owned()));
        }
        fn info(&self, message: &str) {
            self.lines.borrow_mut().push(("info", message.to_owned()));
        }
    }

    fn write(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("network-isolation.json");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_imports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryAnswerStore::new();
        let console = Recorder::default();
        let result = ConfigImporter::new(dir.path().join("absent.json"), &store)
            .import(&console)
            .unwrap();
        assert!(result.is_empty());
        assert!(store.saved_keys().is_empty());
        assert!(console.lines.borrow().is_empty());
    }

    #[test]
    fn malformed_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryAnswerStore::new();
        let console = Recorder::default();
        let path = write(&dir, "{ not json");
        let result = ConfigImporter::new(path, &store).import(&console).unwrap();
        assert!(result.is_empty());
        assert!(store.saved_keys().is_empty());
        let lines = console.lines.borrow();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, "error");
        assert!(lines[0].1.starts_with("Invalid network-isolation.json:"));
    }

    #[test]
    fn wrong_shape_counts_as_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryAnswerStore::new();
        let console = Recorder::default();
        let path = write(&dir, r#"{"enable_isolation": true, "spaces": ["a"]}"#);
        assert!(ConfigImporter::new(path, &store)
            .import(&console)
            .unwrap()
            .is_empty());
        assert_eq!(console.lines.borrow()[0].0, "error");
    }

    #[test]
    fn enabled_document_is_saved_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryAnswerStore::new();
        let console = Recorder::default();
        let path = write(
            &dir,
            r#"{"enable_isolation": true, "spaces": {"management": {"subnets": ["10.0.0.0/24"]}}, "source": "maas"}"#,
        );
        let result = ConfigImporter::new(path, &store).import(&console).unwrap();
        assert_eq!(result["source"], "maas");

        let saved = store.load(ISOLATION_KEY).unwrap();
        assert_eq!(saved["network_isolation"]["source"], "maas");
        assert_eq!(
            saved["network_isolation"]["spaces"]["management"]["subnets"][0],
            "10.0.0.0/24"
        );
        assert_eq!(
            console.lines.borrow()[0],
            (
                "success",
                "Imported network isolation config into answers.".to_owned()
            )
        );
    }
}
