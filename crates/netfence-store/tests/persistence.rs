//! Answer store persistence across store instances.

use netfence_store::{verify_store_integrity, AnswerStore, Answers, FileAnswerStore, StoreLayout};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;

fn answers(value: Value) -> Answers {
    match value {
        Value::Object(m) => m,
        _ => panic!("expected object"),
    }
}

#[test]
fn answers_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let data = answers(json!({
        "network_isolation": {
            "enable_isolation": true,
            "spaces": {
                "storage": {"subnets": ["10.0.2.0/24"]},
                "management": {"subnets": ["10.0.0.0/24"]}
            }
        }
    }));

    FileAnswerStore::new(StoreLayout::new(dir.path()))
        .save("network_isolation", &data)
        .unwrap();

    let reopened = FileAnswerStore::new(StoreLayout::new(dir.path()));
    let loaded = reopened.load("network_isolation").unwrap();
    assert_eq!(loaded, data);

    // Document order of the spaces mapping is kept on disk.
    let spaces = loaded["network_isolation"]["spaces"].as_object().unwrap();
    let names: Vec<&String> = spaces.keys().collect();
    assert_eq!(names, vec!["storage", "management"]);
}

#[test]
fn concurrent_saves_leave_a_valid_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileAnswerStore::new(StoreLayout::new(dir.path())));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .save("TerraformVarsK8SAddons", &answers(json!({"writer": i})))
                    .unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let loaded = store.load("TerraformVarsK8SAddons").unwrap();
    assert!(loaded["writer"].as_i64().is_some());

    let report = verify_store_integrity(store.layout()).unwrap();
    assert_eq!(report.checked, 1);
    assert!(report.failed.is_empty());
}
