use crate::names::IsolationNames;
use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the externally produced isolation document.
pub const DEFAULT_IMPORT_PATH: &str = "/var/snap/openstack/common/network-isolation.json";
/// Default fabric model targeted by the reconcilers.
pub const DEFAULT_MODEL: &str = "openstack";

/// Operator settings, read from `netfence.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub fabric: FabricSection,
    #[serde(default)]
    pub loadbalancer: LoadBalancerSection,
    #[serde(default)]
    pub import: ImportSection,
    #[serde(default)]
    pub names: IsolationNames,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FabricSection {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_juju")]
    pub juju: String,
}

impl Default for FabricSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            juju: default_juju(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoadBalancerSection {
    #[serde(default = "default_kubectl")]
    pub kubectl: String,
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
}

impl Default for LoadBalancerSection {
    fn default() -> Self {
        Self {
            kubectl: default_kubectl(),
            kubeconfig: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ImportSection {
    #[serde(default = "default_import_path")]
    pub path: PathBuf,
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            path: default_import_path(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_owned()
}

fn default_juju() -> String {
    "juju".to_owned()
}

fn default_kubectl() -> String {
    "kubectl".to_owned()
}

fn default_import_path() -> PathBuf {
    PathBuf::from(DEFAULT_IMPORT_PATH)
}

pub fn parse_settings_str(input: &str) -> Result<Settings, SchemaError> {
    let settings: Settings = toml::from_str(input)?;
    if settings.fabric.model.trim().is_empty() {
        return Err(SchemaError::EmptyName("fabric.model"));
    }
    settings.names.validate()?;
    Ok(settings)
}

pub fn parse_settings_file(path: impl AsRef<Path>) -> Result<Settings, SchemaError> {
    let content = fs::read_to_string(path)?;
    parse_settings_str(&content)
}
