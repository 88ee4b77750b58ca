//! Scaling policies: named triggers that adjust a group.
//!
//! A policy resolves its target group through a [`GroupRegistry`] each time
//! it fires, so groups can be rebuilt independently of the policies that
//! point at them. The policy's cooldown is separate from the group's:
//! either one can suppress an adjustment.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use scalegrid_core::AdjustmentRequest;
use scalegrid_core::config::PolicyConfig;
use scalegrid_state::{StateStore, policy_owner_key};

use crate::clock::Clock;
use crate::cooldown::CooldownGuard;
use crate::error::{AutoscaleError, AutoscaleResult};
use crate::group::{AdjustOutcome, ScalingGroup};

/// Resolves scaling groups by name.
pub trait GroupRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> AutoscaleResult<Arc<ScalingGroup>>;
}

/// A fixed, in-memory set of groups.
#[derive(Default)]
pub struct GroupMap {
    groups: HashMap<String, Arc<ScalingGroup>>,
}

impl GroupMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, group: ScalingGroup) -> Arc<ScalingGroup> {
        let group = Arc::new(group);
        self.groups.insert(group.name().to_string(), group.clone());
        group
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl GroupRegistry for GroupMap {
    fn lookup(&self, name: &str) -> AutoscaleResult<Arc<ScalingGroup>> {
        self.groups
            .get(name)
            .cloned()
            .ok_or_else(|| AutoscaleError::Lookup(format!("scaling group {name} not found")))
    }
}

/// What `alarm` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmOutcome {
    /// The policy's own cooldown window is still open.
    Suppressed,
    /// The adjustment was handed to the group, which decided this.
    Dispatched(AdjustOutcome),
}

pub struct ScalingPolicy {
    name: String,
    target_group: String,
    adjustment: AdjustmentRequest,
    cooldown: CooldownGuard,
    registry: Arc<dyn GroupRegistry>,
}

impl ScalingPolicy {
    pub fn new(
        name: &str,
        config: &PolicyConfig,
        registry: Arc<dyn GroupRegistry>,
        state: StateStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.to_string(),
            target_group: config.target_group.clone(),
            adjustment: config.adjustment(),
            cooldown: CooldownGuard::new(policy_owner_key(name), config.cooldown, state, clock),
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target_group(&self) -> &str {
        &self.target_group
    }

    pub fn adjustment(&self) -> AdjustmentRequest {
        self.adjustment
    }

    pub fn cooldown(&self) -> &CooldownGuard {
        &self.cooldown
    }

    /// Fire the policy.
    ///
    /// The policy's cooldown is stamped whenever the adjustment is handed to
    /// the group, whatever the group then decides.
    pub async fn alarm(&self) -> AutoscaleResult<AlarmOutcome> {
        let group = self.registry.lookup(&self.target_group)?;

        if self.cooldown.in_progress()? {
            info!(
                policy = %self.name,
                cooldown_secs = self.cooldown.window().as_secs(),
                "not performing scaling action, cooldown in progress"
            );
            return Ok(AlarmOutcome::Suppressed);
        }

        info!(
            policy = %self.name,
            group = %group.name(),
            adjustment = %self.adjustment.reason(),
            "alarm, adjusting group"
        );
        let outcome = group.adjust(self.adjustment, false).await?;
        self.cooldown.stamp(&self.adjustment.reason())?;
        Ok(AlarmOutcome::Dispatched(outcome))
    }
}
