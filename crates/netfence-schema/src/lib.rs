//! Isolation configuration model, answer extraction, and settings for netfence.
//!
//! This crate defines the schema layer: the desired-state model
//! (`IsolationConfig`, spaces in document order, pool ranges with shared-range
//! fallback), extraction of that model from answer-store documents, the static
//! naming table (`IsolationNames`) shared by the reconcilers, and the TOML
//! operator settings file.

pub mod answers;
pub mod config;
pub mod names;
pub mod settings;
pub mod types;

pub use answers::{
    import_enabled, isolation_bucket, parse_import_document, set_pool_ranges, ADDONS_KEY,
    ADDONS_SECTION, ISOLATION_KEY, ISOLATION_SECTION,
};
pub use config::{
    parse_address_list, IsolationConfig, NamedSpace, PoolRanges, PoolRole, ResolvedRanges,
    SpaceSpec,
};
pub use names::{IsolationNames, ServiceAnnotationTarget};
pub use settings::{parse_settings_file, parse_settings_str, Settings, DEFAULT_IMPORT_PATH};
pub use types::{ApplicationName, ResourceName, SpaceName};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to parse JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("invalid answers for '{key}': {reason}")]
    InvalidAnswers { key: String, reason: String },
    #[error("invalid isolation document: {0}")]
    InvalidImport(String),
    #[error("{0} must not be empty")]
    EmptyName(&'static str),
    #[error("name '{0}' is used for both public and internal resources")]
    DuplicateName(String),
}
