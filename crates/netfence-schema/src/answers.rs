//! Extraction of the isolation configuration from answer-store documents.
//!
//! The deployment tooling keeps two free-form answer buckets: one for network
//! isolation (enable flag and spaces) and one for Kubernetes add-ons (load
//! balancer ranges). Absent keys mean "feature disabled".

use crate::config::{ordered_spaces, IsolationConfig, NamedSpace, PoolRanges};
use crate::SchemaError;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Answer-store key holding the network isolation bucket.
pub const ISOLATION_KEY: &str = "network_isolation";
/// Sub-key inside [`ISOLATION_KEY`] holding the imported document.
pub const ISOLATION_SECTION: &str = "network_isolation";
/// Answer-store key holding the Kubernetes add-ons bucket.
pub const ADDONS_KEY: &str = "TerraformVarsK8SAddons";
/// Sub-key inside [`ADDONS_KEY`] holding the add-on variables.
pub const ADDONS_SECTION: &str = "k8s-addons";

const PUBLIC_POOL_VAR: &str = "lb_public_pool";
const INTERNAL_POOL_VAR: &str = "lb_internal_pool";
const SHARED_POOL_VAR: &str = "loadbalancer";

/// The network isolation document, as imported and stored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IsolationSection {
    #[serde(default, deserialize_with = "false_if_null")]
    pub enable_isolation: bool,
    #[serde(default, deserialize_with = "ordered_spaces")]
    pub spaces: Vec<NamedSpace>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AddonsSection {
    #[serde(default)]
    lb_public_pool: Option<String>,
    #[serde(default)]
    lb_internal_pool: Option<String>,
    #[serde(default)]
    loadbalancer: Option<String>,
}

fn false_if_null<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn section<'a>(bucket: &'a Map<String, Value>, sub: &str) -> Option<&'a Value> {
    bucket.get(sub).filter(|v| !v.is_null())
}

/// Parse the isolation section of the isolation bucket.
pub fn isolation_section(bucket: &Map<String, Value>) -> Result<IsolationSection, SchemaError> {
    match section(bucket, ISOLATION_SECTION) {
        None => Ok(IsolationSection::default()),
        Some(value) => IsolationSection::deserialize(value).map_err(|e| {
            SchemaError::InvalidAnswers {
                key: ISOLATION_KEY.to_owned(),
                reason: e.to_string(),
            }
        }),
    }
}

/// Read the load-balancer ranges from the add-ons bucket.
pub fn pool_ranges(bucket: &Map<String, Value>) -> Result<PoolRanges, SchemaError> {
    let addons = match section(bucket, ADDONS_SECTION) {
        None => AddonsSection::default(),
        Some(value) => {
            AddonsSection::deserialize(value).map_err(|e| SchemaError::InvalidAnswers {
                key: ADDONS_KEY.to_owned(),
                reason: e.to_string(),
            })?
        }
    };
    Ok(PoolRanges {
        public: addons.lb_public_pool,
        internal: addons.lb_internal_pool,
        shared: addons.loadbalancer,
    })
}

/// Write load-balancer ranges into an add-ons bucket, keeping unrelated variables.
/// `None` removes the variable.
pub fn set_pool_ranges(bucket: &mut Map<String, Value>, ranges: &PoolRanges) {
    let entry = bucket
        .entry(ADDONS_SECTION.to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(addons) = entry {
        for (var, value) in [
            (PUBLIC_POOL_VAR, &ranges.public),
            (INTERNAL_POOL_VAR, &ranges.internal),
            (SHARED_POOL_VAR, &ranges.shared),
        ] {
            match value {
                Some(v) => {
                    addons.insert(var.to_owned(), Value::String(v.clone()));
                }
                None => {
                    addons.remove(var);
                }
            }
        }
    }
}

impl IsolationConfig {
    /// Build the desired state from the isolation and add-ons buckets.
    pub fn from_answers(
        isolation: &Map<String, Value>,
        addons: &Map<String, Value>,
    ) -> Result<Self, SchemaError> {
        let section = isolation_section(isolation)?;
        Ok(Self {
            enabled: section.enable_isolation,
            spaces: section.spaces,
            pool_ranges: pool_ranges(addons)?,
        })
    }
}

/// Parse an externally produced isolation document.
///
/// The document must be a JSON object whose `enable_isolation` and `spaces`
/// keys have the expected shape; all other keys are kept verbatim.
pub fn parse_import_document(input: &str) -> Result<Map<String, Value>, SchemaError> {
    let value: Value = serde_json::from_str(input)?;
    let Value::Object(doc) = value else {
        return Err(SchemaError::InvalidImport(
            "top-level value must be an object".to_owned(),
        ));
    };
    IsolationSection::deserialize(&Value::Object(doc.clone()))
        .map_err(|e| SchemaError::InvalidImport(e.to_string()))?;
    Ok(doc)
}

/// Whether an import document opts in to isolation.
pub fn import_enabled(doc: &Map<String, Value>) -> bool {
    doc.get("enable_isolation")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Wrap an import document the way it is stored under [`ISOLATION_KEY`].
pub fn isolation_bucket(doc: Map<String, Value>) -> Map<String, Value> {
    let mut bucket = Map::new();
    bucket.insert(ISOLATION_SECTION.to_owned(), Value::Object(doc));
    bucket
}
