//! scalegrid.toml configuration parser.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{AdjustmentRequest, AdjustmentType, Bounds, Tag};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalegridConfig {
    #[serde(default)]
    pub templates: BTreeMap<String, MemberTemplate>,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupConfig>,
    #[serde(default)]
    pub instance_groups: BTreeMap<String, InstanceGroupConfig>,
    #[serde(default)]
    pub policies: BTreeMap<String, PolicyConfig>,
}

/// How a single member is provisioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberTemplate {
    pub image_id: String,
    pub instance_type: String,
    pub key_name: Option<String>,
    pub user_data: Option<String>,
    pub security_groups: Option<String>,
}

/// An autoscaling group: bounded capacity with a cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Accepted and carried, never used for placement.
    pub availability_zones: Vec<String>,
    pub member_template: String,
    #[serde(deserialize_with = "de::count")]
    pub min_size: u32,
    #[serde(deserialize_with = "de::count")]
    pub max_size: u32,
    #[serde(default, deserialize_with = "de::opt_count")]
    pub desired_capacity: Option<u32>,
    /// Seconds between accepted adjustments. Absent or non-numeric means 0.
    #[serde(default, deserialize_with = "de::cooldown")]
    pub cooldown: Option<i64>,
    #[serde(default)]
    pub load_balancer_names: Vec<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A fixed-size group with no bounds and no cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceGroupConfig {
    pub availability_zones: Vec<String>,
    pub member_template: String,
    #[serde(deserialize_with = "de::count")]
    pub size: u32,
    #[serde(default)]
    pub load_balancer_names: Vec<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A named adjustment applied to a scaling group when triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub target_group: String,
    #[serde(deserialize_with = "de::signed")]
    pub adjustment_value: i64,
    pub adjustment_type: AdjustmentType,
    #[serde(default, deserialize_with = "de::cooldown")]
    pub cooldown: Option<i64>,
}

impl GroupConfig {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.min_size, self.max_size)
    }

    /// Capacity a freshly created group is brought up to.
    pub fn initial_capacity(&self) -> u32 {
        self.desired_capacity.unwrap_or(self.min_size)
    }
}

impl PolicyConfig {
    pub fn adjustment(&self) -> AdjustmentRequest {
        AdjustmentRequest::new(self.adjustment_type, self.adjustment_value)
    }
}

impl ScalegridConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        debug!(
            ?path,
            groups = config.groups.len(),
            policies = config.policies.len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Parse and validate config text.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: ScalegridConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject configurations the controller must never see.
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, group) in &self.groups {
            if group.min_size > group.max_size {
                return Err(ConfigError::InvalidBounds {
                    group: name.clone(),
                    min: group.min_size,
                    max: group.max_size,
                });
            }
            if let Some(desired) = group.desired_capacity
                && (desired < group.min_size || desired > group.max_size)
            {
                return Err(ConfigError::DesiredOutOfBounds {
                    group: name.clone(),
                    desired,
                    min: group.min_size,
                    max: group.max_size,
                });
            }
            self.check_group_common(name, &group.availability_zones, &group.member_template)?;
        }

        for (name, group) in &self.instance_groups {
            if self.groups.contains_key(name) {
                return Err(ConfigError::DuplicateGroup(name.clone()));
            }
            self.check_group_common(name, &group.availability_zones, &group.member_template)?;
        }

        for (name, policy) in &self.policies {
            if !self.groups.contains_key(&policy.target_group) {
                return Err(ConfigError::UnknownGroup {
                    policy: name.clone(),
                    group: policy.target_group.clone(),
                });
            }
        }

        Ok(())
    }

    fn check_group_common(&self, name: &str, zones: &[String], template: &str) -> ConfigResult<()> {
        if zones.is_empty() {
            return Err(ConfigError::NoAvailabilityZones {
                group: name.to_string(),
            });
        }
        if !self.templates.contains_key(template) {
            return Err(ConfigError::UnknownTemplate {
                owner: name.to_string(),
                template: template.to_string(),
            });
        }
        Ok(())
    }

    /// Scaffold a minimal config with one group and a scale-up/scale-down
    /// policy pair.
    pub fn scaffold(group: &str) -> Self {
        let mut config = ScalegridConfig::default();
        config.templates.insert(
            "default".to_string(),
            MemberTemplate {
                image_id: "ubuntu-22.04".to_string(),
                instance_type: "m1.small".to_string(),
                key_name: None,
                user_data: None,
                security_groups: None,
            },
        );
        config.groups.insert(
            group.to_string(),
            GroupConfig {
                availability_zones: vec!["zone-a".to_string()],
                member_template: "default".to_string(),
                min_size: 1,
                max_size: 5,
                desired_capacity: None,
                cooldown: Some(60),
                load_balancer_names: Vec::new(),
                tags: Vec::new(),
            },
        );
        for (policy, value) in [("scale-up", 1), ("scale-down", -1)] {
            config.policies.insert(
                format!("{group}-{policy}"),
                PolicyConfig {
                    target_group: group.to_string(),
                    adjustment_value: value,
                    adjustment_type: AdjustmentType::Delta,
                    cooldown: Some(60),
                },
            );
        }
        config
    }
}

/// Deserializers that normalize integer-or-string numeric fields.
mod de {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numeric {
        Int(i64),
        Text(String),
    }

    fn parse_i64<E: serde::de::Error>(raw: Numeric) -> Result<i64, E> {
        match raw {
            Numeric::Int(n) => Ok(n),
            Numeric::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| E::custom(format!("expected an integer, got {s:?}"))),
        }
    }

    fn to_count<E: serde::de::Error>(n: i64) -> Result<u32, E> {
        u32::try_from(n).map_err(|_| E::custom(format!("expected a non-negative count, got {n}")))
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        to_count(parse_i64(Numeric::deserialize(d)?)?)
    }

    pub fn opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        match Option::<Numeric>::deserialize(d)? {
            Some(raw) => Ok(Some(to_count(parse_i64(raw)?)?)),
            None => Ok(None),
        }
    }

    pub fn signed<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        parse_i64(Numeric::deserialize(d)?)
    }

    /// Non-numeric text is treated as "not configured".
    pub fn cooldown<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match Option::<Numeric>::deserialize(d)? {
            Some(Numeric::Int(n)) => Some(n),
            Some(Numeric::Text(s)) => s.trim().parse::<i64>().ok(),
            None => None,
        })
    }
}
