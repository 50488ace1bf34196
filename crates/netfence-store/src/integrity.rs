use crate::file::FileAnswerStore;
use crate::layout::StoreLayout;
use crate::StoreError;

#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub checked: usize,
    pub passed: usize,
    pub failed: Vec<IntegrityFailure>,
}

#[derive(Debug)]
pub struct IntegrityFailure {
    pub key: String,
    pub reason: String,
}

/// Read every answer document and verify its embedded checksum.
pub fn verify_store_integrity(layout: &StoreLayout) -> Result<IntegrityReport, StoreError> {
    let store = FileAnswerStore::new(layout.clone());
    let keys = store.keys()?;

    let mut report = IntegrityReport {
        checked: keys.len(),
        ..Default::default()
    };

    for key in keys {
        match store.get_document(&key) {
            Ok(_) => report.passed += 1,
            Err(StoreError::IntegrityFailure { actual, .. }) => {
                report.failed.push(IntegrityFailure {
                    key,
                    reason: format!("checksum mismatch: got {actual}"),
                });
            }
            Err(e) => {
                report.failed.push(IntegrityFailure {
                    key,
                    reason: format!("read error: {e}"),
                });
            }
        }
    }

    Ok(report)
}
