//! Wires a loaded config and state file into live groups and policies.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};

use scalegrid_autoscale::{
    Clock, GroupMap, GroupRegistry, InstanceGroup, MemberFactory, ScalingGroup, ScalingPolicy,
    SystemClock,
};
use scalegrid_core::ScalegridConfig;
use scalegrid_state::StateStore;

use crate::local::{LoggingLoadBalancer, LoggingMemberFactory};

pub struct Deployment {
    config: ScalegridConfig,
    state: StateStore,
    clock: Arc<dyn Clock>,
    registry: Arc<GroupMap>,
    instance_groups: BTreeMap<String, InstanceGroup>,
}

impl Deployment {
    pub fn load(config_path: &Path, state_path: &Path) -> Result<Self> {
        let config = ScalegridConfig::from_file(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        let state = StateStore::open(state_path)
            .with_context(|| format!("failed to open state at {}", state_path.display()))?;
        Self::assemble(config, state, Arc::new(SystemClock))
    }

    pub fn assemble(config: ScalegridConfig, state: StateStore, clock: Arc<dyn Clock>) -> Result<Self> {
        let factory: Arc<dyn MemberFactory> = Arc::new(LoggingMemberFactory);

        let mut registry = GroupMap::new();
        for (name, group_config) in &config.groups {
            let mut group =
                ScalingGroup::from_config(name, &config, state.clone(), factory.clone(), clock.clone())?;
            for lb in &group_config.load_balancer_names {
                group = group.with_load_balancer(Arc::new(LoggingLoadBalancer::new(lb)));
            }
            registry.insert(group);
        }

        let mut instance_groups = BTreeMap::new();
        for (name, group_config) in &config.instance_groups {
            let mut group =
                InstanceGroup::from_config(name, &config, state.clone(), factory.clone(), clock.clone())?;
            for lb in &group_config.load_balancer_names {
                group = group.with_load_balancer(Arc::new(LoggingLoadBalancer::new(lb)));
            }
            instance_groups.insert(name.clone(), group);
        }

        Ok(Self {
            config,
            state,
            clock,
            registry: Arc::new(registry),
            instance_groups,
        })
    }

    pub fn config(&self) -> &ScalegridConfig {
        &self.config
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn scaling_group(&self, name: &str) -> Result<Arc<ScalingGroup>> {
        Ok(self.registry.lookup(name)?)
    }

    /// All scaling groups, in name order.
    pub fn scaling_groups(&self) -> Result<Vec<Arc<ScalingGroup>>> {
        self.config
            .groups
            .keys()
            .map(|name| self.scaling_group(name))
            .collect()
    }

    pub fn instance_group(&self, name: &str) -> Option<&InstanceGroup> {
        self.instance_groups.get(name)
    }

    pub fn instance_groups(&self) -> impl Iterator<Item = &InstanceGroup> {
        self.instance_groups.values()
    }

    pub fn policy(&self, name: &str) -> Result<ScalingPolicy> {
        let config = self
            .config
            .policies
            .get(name)
            .ok_or_else(|| anyhow!("scaling policy {name} not found"))?;
        Ok(ScalingPolicy::new(
            name,
            config,
            self.registry.clone(),
            self.state.clone(),
            self.clock.clone(),
        ))
    }

    /// All configured policies, in name order.
    pub fn policies(&self) -> Result<Vec<ScalingPolicy>> {
        self.config
            .policies
            .keys()
            .map(|name| self.policy(name))
            .collect()
    }

    pub fn is_scaling_group(&self, name: &str) -> bool {
        self.config.groups.contains_key(name)
    }
}
