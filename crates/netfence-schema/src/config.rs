use crate::types::SpaceName;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Which front-end role an address pool serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolRole {
    Public,
    Internal,
}

impl PoolRole {
    pub const ALL: [PoolRole; 2] = [PoolRole::Public, PoolRole::Internal];
}

impl fmt::Display for PoolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolRole::Public => write!(f, "public"),
            PoolRole::Internal => write!(f, "internal"),
        }
    }
}

/// Desired subnets for one space.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SpaceSpec {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSpace {
    pub name: SpaceName,
    pub spec: SpaceSpec,
}

/// Address ranges as entered by the operator. Each value is a comma-separated
/// list of ranges or CIDRs.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PoolRanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<String>,
    /// Single range used for whichever side has no explicit value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<String>,
}

impl PoolRanges {
    /// Apply the shared-range fallback. Disabled isolation resolves to nothing.
    pub fn resolve(&self, enabled: bool) -> ResolvedRanges {
        if !enabled {
            return ResolvedRanges::default();
        }
        let shared = non_blank(self.shared.as_deref());
        ResolvedRanges {
            public: non_blank(self.public.as_deref()).or_else(|| shared.clone()),
            internal: non_blank(self.internal.as_deref()).or(shared),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ResolvedRanges {
    pub public: Option<String>,
    pub internal: Option<String>,
}

impl ResolvedRanges {
    pub fn get(&self, role: PoolRole) -> Option<&str> {
        match role {
            PoolRole::Public => self.public.as_deref(),
            PoolRole::Internal => self.internal.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.public.is_none() && self.internal.is_none()
    }

    /// Present ranges, public first.
    pub fn iter(&self) -> impl Iterator<Item = (PoolRole, &str)> + '_ {
        PoolRole::ALL
            .into_iter()
            .filter_map(move |role| self.get(role).map(|range| (role, range)))
    }
}

/// The desired isolation state, rebuilt from the answer store on every run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct IsolationConfig {
    pub enabled: bool,
    #[serde(serialize_with = "serialize_spaces")]
    pub spaces: Vec<NamedSpace>,
    pub pool_ranges: PoolRanges,
}

impl IsolationConfig {
    pub fn resolved_ranges(&self) -> ResolvedRanges {
        self.pool_ranges.resolve(self.enabled)
    }
}

/// Split a range string on commas, trimming whitespace and dropping empty tokens.
pub fn parse_address_list(range: &str) -> Vec<String> {
    range
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_owned)
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a `{name: spec}` object into a list that keeps document order.
/// A `null` object or a `null` spec are both treated as empty.
pub(crate) fn ordered_spaces<'de, D>(deserializer: D) -> Result<Vec<NamedSpace>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SpacesVisitor;

    impl<'de> Visitor<'de> for SpacesVisitor {
        type Value = Vec<NamedSpace>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of space name to space spec")
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_map(self)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut spaces = Vec::new();
            while let Some((name, spec)) = map.next_entry::<String, Option<SpaceSpec>>()? {
                spaces.push(NamedSpace {
                    name: SpaceName::new(name),
                    spec: spec.unwrap_or_default(),
                });
            }
            Ok(spaces)
        }
    }

    deserializer.deserialize_option(SpacesVisitor)
}

pub(crate) fn serialize_spaces<S>(spaces: &[NamedSpace], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(spaces.len()))?;
    for space in spaces {
        map.serialize_entry(space.name.as_str(), &space.spec)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_range_fills_both_roles() {
        let ranges = PoolRanges {
            shared: Some("10.20.0.10-10.20.0.50".to_owned()),
            ..PoolRanges::default()
        };
        let resolved = ranges.resolve(true);
        assert_eq!(resolved.public.as_deref(), Some("10.20.0.10-10.20.0.50"));
        assert_eq!(resolved.internal.as_deref(), Some("10.20.0.10-10.20.0.50"));
    }

    #[test]
    fn explicit_range_wins_over_shared() {
        let ranges = PoolRanges {
            public: Some("10.1.0.0/24".to_owned()),
            internal: None,
            shared: Some("10.9.0.0/24".to_owned()),
        };
        let resolved = ranges.resolve(true);
        assert_eq!(resolved.public.as_deref(), Some("10.1.0.0/24"));
        assert_eq!(resolved.internal.as_deref(), Some("10.9.0.0/24"));
    }

    #[test]
    fn public_only_leaves_internal_absent() {
        let ranges = PoolRanges {
            public: Some("10.1.0.0/24, 10.1.1.0/24".to_owned()),
            ..PoolRanges::default()
        };
        let resolved = ranges.resolve(true);
        assert!(resolved.internal.is_none());
        let present: Vec<_> = resolved.iter().map(|(role, _)| role).collect();
        assert_eq!(present, vec![PoolRole::Public]);
    }

    #[test]
    fn disabled_resolves_to_nothing() {
        let ranges = PoolRanges {
            public: Some("10.1.0.0/24".to_owned()),
            internal: Some("10.2.0.0/24".to_owned()),
            shared: Some("10.3.0.0/24".to_owned()),
        };
        assert!(ranges.resolve(false).is_empty());
    }

    #[test]
    fn blank_ranges_count_as_absent() {
        let ranges = PoolRanges {
            public: Some("   ".to_owned()),
            internal: Some(String::new()),
            shared: None,
        };
        assert!(ranges.resolve(true).is_empty());
    }

    #[test]
    fn address_list_trims_and_drops_empty_tokens() {
        assert_eq!(
            parse_address_list(" 10.1.0.0/24, ,10.1.1.0/24 ,"),
            vec!["10.1.0.0/24", "10.1.1.0/24"]
        );
        assert!(parse_address_list(" , ").is_empty());
    }

    #[test]
    fn space_spec_null_subnets_is_empty() {
        let spec: SpaceSpec = serde_json::from_str(r#"{"subnets": null}"#).unwrap();
        assert!(spec.subnets.is_empty());
        let spec: SpaceSpec = serde_json::from_str("{}").unwrap();
        assert!(spec.subnets.is_empty());
    }

    #[test]
    fn config_serializes_spaces_in_order() {
        let config = IsolationConfig {
            enabled: true,
            spaces: vec![
                NamedSpace {
                    name: SpaceName::new("storage"),
                    spec: SpaceSpec {
                        subnets: vec!["10.0.2.0/24".to_owned()],
                    },
                },
                NamedSpace {
                    name: SpaceName::new("internal"),
                    spec: SpaceSpec::default(),
                },
            ],
            pool_ranges: PoolRanges::default(),
        };
        let json = serde_json::to_string(&config).unwrap();
        let storage = json.find("storage").unwrap();
        let internal = json.find("\"internal\"").unwrap();
        assert!(storage < internal);
        assert!(config.spaces.iter().any(|s| s.name == "storage"));
    }
}
