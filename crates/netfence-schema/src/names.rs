use crate::config::PoolRole;
use crate::types::{ApplicationName, ResourceName, SpaceName};
use crate::SchemaError;
use serde::{Deserialize, Serialize};

/// A front-end service whose load-balancer pool is selected by annotation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceAnnotationTarget {
    pub application: ApplicationName,
    pub role: PoolRole,
}

/// Static naming table shared by the reconcilers.
///
/// Every backend object name the reconcilers touch comes from here, so tests
/// and alternate deployments can substitute their own names.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct IsolationNames {
    pub public_pool: ResourceName,
    pub internal_pool: ResourceName,
    pub public_advertisement: ResourceName,
    pub internal_advertisement: ResourceName,
    pub namespace: String,
    pub annotation_key: String,
    pub annotation_config_key: String,
    pub default_space: SpaceName,
    pub services: Vec<ServiceAnnotationTarget>,
}

impl Default for IsolationNames {
    fn default() -> Self {
        Self {
            public_pool: ResourceName::new("sunbeam-public-pool"),
            internal_pool: ResourceName::new("sunbeam-internal-pool"),
            public_advertisement: ResourceName::new("sunbeam-public-adv"),
            internal_advertisement: ResourceName::new("sunbeam-internal-adv"),
            namespace: "metallb-system".to_owned(),
            annotation_key: "metallb.universe.tf/address-pool".to_owned(),
            annotation_config_key: "kubernetes-service-annotations".to_owned(),
            default_space: SpaceName::new("management"),
            services: vec![
                ServiceAnnotationTarget {
                    application: ApplicationName::new("traefik"),
                    role: PoolRole::Internal,
                },
                ServiceAnnotationTarget {
                    application: ApplicationName::new("traefik-public"),
                    role: PoolRole::Public,
                },
                ServiceAnnotationTarget {
                    application: ApplicationName::new("traefik-rgw"),
                    role: PoolRole::Public,
                },
            ],
        }
    }
}

impl IsolationNames {
    pub fn pool(&self, role: PoolRole) -> &ResourceName {
        match role {
            PoolRole::Public => &self.public_pool,
            PoolRole::Internal => &self.internal_pool,
        }
    }

    pub fn advertisement(&self, role: PoolRole) -> &ResourceName {
        match role {
            PoolRole::Public => &self.public_advertisement,
            PoolRole::Internal => &self.internal_advertisement,
        }
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let required = [
            ("public_pool", self.public_pool.as_str()),
            ("internal_pool", self.internal_pool.as_str()),
            ("public_advertisement", self.public_advertisement.as_str()),
            ("internal_advertisement", self.internal_advertisement.as_str()),
            ("namespace", self.namespace.as_str()),
            ("annotation_key", self.annotation_key.as_str()),
            ("annotation_config_key", self.annotation_config_key.as_str()),
            ("default_space", self.default_space.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SchemaError::EmptyName(field));
            }
        }
        if self.public_pool == self.internal_pool {
            return Err(SchemaError::DuplicateName(self.public_pool.to_string()));
        }
        if self.public_advertisement == self.internal_advertisement {
            return Err(SchemaError::DuplicateName(
                self.public_advertisement.to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_names() {
        let names = IsolationNames::default();
        assert_eq!(names.pool(PoolRole::Public), "sunbeam-public-pool");
        assert_eq!(names.pool(PoolRole::Internal), "sunbeam-internal-pool");
        assert_eq!(names.advertisement(PoolRole::Public), "sunbeam-public-adv");
        assert_eq!(names.namespace, "metallb-system");
        assert_eq!(names.default_space, "management");
        assert_eq!(names.services.len(), 3);
        assert!(names.validate().is_ok());
    }

    #[test]
    fn traefik_is_internal_and_public_variants_are_public() {
        let names = IsolationNames::default();
        let role_of = |app: &str| {
            names
                .services
                .iter()
                .find(|t| t.application == app)
                .map(|t| t.role)
        };
        assert_eq!(role_of("traefik"), Some(PoolRole::Internal));
        assert_eq!(role_of("traefik-public"), Some(PoolRole::Public));
        assert_eq!(role_of("traefik-rgw"), Some(PoolRole::Public));
    }

    #[test]
    fn validate_rejects_empty_and_duplicate_names() {
        let names = IsolationNames {
            namespace: " ".to_owned(),
            ..IsolationNames::default()
        };
        assert!(matches!(
            names.validate(),
            Err(SchemaError::EmptyName("namespace"))
        ));

        let names = IsolationNames {
            internal_pool: ResourceName::new("sunbeam-public-pool"),
            ..IsolationNames::default()
        };
        assert!(matches!(
            names.validate(),
            Err(SchemaError::DuplicateName(_))
        ));
    }
}
