//! Scaling groups: bounded, throttled capacity adjustment.
//!
//! [`ScalingGroup`] turns an [`AdjustmentRequest`] into a target capacity,
//! checks it against the group's bounds and cooldown, and hands it to its
//! [`CapacityController`]. [`InstanceGroup`] is the fixed-size variant: a
//! configured size, no bounds, no cooldown.

use std::sync::Arc;

use tracing::{info, warn};

use scalegrid_core::config::{GroupConfig, InstanceGroupConfig, MemberTemplate};
use scalegrid_core::{AdjustmentRequest, BoundViolation, Bounds, ScalegridConfig};
use scalegrid_state::{MembershipSet, StateStore, group_owner_key};

use crate::clock::Clock;
use crate::controller::{CapacityController, ResizeSummary};
use crate::cooldown::CooldownGuard;
use crate::error::{AutoscaleError, AutoscaleResult};
use crate::member::{LoadBalancerBinding, MemberFactory};

/// What `adjust` did with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustOutcome {
    /// The group was resized.
    Applied { from: u32, to: u32 },
    /// Capacity did not move: the target equals the current capacity, or a
    /// lenient resize failed before creating any member.
    Unchanged { capacity: u32 },
    /// The group's cooldown window is still open.
    Suppressed,
    /// The computed target is outside the group's bounds.
    Rejected {
        target: i64,
        violation: BoundViolation,
    },
}

impl AdjustOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AdjustOutcome::Applied { .. } => "applied",
            AdjustOutcome::Unchanged { .. } => "unchanged",
            AdjustOutcome::Suppressed => "suppressed",
            AdjustOutcome::Rejected { .. } => "rejected",
        }
    }
}

fn resolve_template<'a>(
    config: &'a ScalegridConfig,
    owner: &str,
    template: &str,
) -> AutoscaleResult<&'a MemberTemplate> {
    config.templates.get(template).ok_or_else(|| {
        AutoscaleError::Lookup(format!("{owner}: member template {template} not found"))
    })
}

// ── ScalingGroup ───────────────────────────────────────────────────

pub struct ScalingGroup {
    name: String,
    bounds: Bounds,
    desired_capacity: Option<u32>,
    availability_zones: Vec<String>,
    controller: CapacityController,
    cooldown: CooldownGuard,
}

impl ScalingGroup {
    pub fn new(
        name: &str,
        config: &GroupConfig,
        template: MemberTemplate,
        state: StateStore,
        factory: Arc<dyn MemberFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let controller = CapacityController::new(name, template, state.clone(), factory)
            .with_tags(config.tags.clone())
            .with_clock(clock.clone());
        let cooldown = CooldownGuard::new(group_owner_key(name), config.cooldown, state, clock);
        Self {
            name: name.to_string(),
            bounds: config.bounds(),
            desired_capacity: config.desired_capacity,
            availability_zones: config.availability_zones.clone(),
            controller,
            cooldown,
        }
    }

    /// Build the named group from a loaded config.
    pub fn from_config(
        name: &str,
        config: &ScalegridConfig,
        state: StateStore,
        factory: Arc<dyn MemberFactory>,
        clock: Arc<dyn Clock>,
    ) -> AutoscaleResult<Self> {
        let group = config
            .groups
            .get(name)
            .ok_or_else(|| AutoscaleError::Lookup(format!("scaling group {name} not found")))?;
        let template = resolve_template(config, name, &group.member_template)?;
        Ok(Self::new(name, group, template.clone(), state, factory, clock))
    }

    pub fn with_load_balancer(mut self, balancer: Arc<dyn LoadBalancerBinding>) -> Self {
        self.controller = self.controller.with_load_balancer(balancer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn availability_zones(&self) -> &[String] {
        &self.availability_zones
    }

    pub fn controller(&self) -> &CapacityController {
        &self.controller
    }

    pub fn cooldown(&self) -> &CooldownGuard {
        &self.cooldown
    }

    pub fn members(&self) -> AutoscaleResult<MembershipSet> {
        self.controller.members()
    }

    pub fn capacity(&self) -> AutoscaleResult<u32> {
        self.controller.capacity()
    }

    /// Bring a new group up to its desired capacity, or its minimum size
    /// when none is configured. Any failed creation aborts.
    pub async fn handle_create(&self) -> AutoscaleResult<ResizeSummary> {
        let target = self.desired_capacity.unwrap_or(self.bounds.min);
        info!(group = %self.name, target, "creating group");
        self.controller.resize(target, true).await
    }

    /// Destroy every member and forget the last adjustment.
    pub async fn handle_delete(&self) -> AutoscaleResult<u32> {
        let destroyed = self.controller.destroy_all().await?;
        self.cooldown.clear()?;
        Ok(destroyed)
    }

    /// Apply an adjustment request.
    ///
    /// Suppression and bounds rejection are reported as outcomes, not
    /// errors. Only an applied resize stamps the group's cooldown.
    pub async fn adjust(
        &self,
        request: AdjustmentRequest,
        fail_fast: bool,
    ) -> AutoscaleResult<AdjustOutcome> {
        if self.cooldown.in_progress()? {
            info!(
                group = %self.name,
                cooldown_secs = self.cooldown.window().as_secs(),
                "not performing scaling adjustment, cooldown in progress"
            );
            return Ok(AdjustOutcome::Suppressed);
        }

        let current = self.capacity()?;
        let target = request.target_from(current);

        let target = match self.bounds.check(target) {
            Ok(t) => t,
            Err(violation) => {
                warn!(
                    group = %self.name,
                    current,
                    target,
                    adjustment = %request.reason(),
                    "{violation}"
                );
                return Ok(AdjustOutcome::Rejected { target, violation });
            }
        };

        if target == current {
            info!(group = %self.name, capacity = current, "no change in capacity");
            return Ok(AdjustOutcome::Unchanged { capacity: current });
        }

        let summary = self.controller.resize(target, fail_fast).await?;
        if !summary.changed() {
            warn!(group = %self.name, capacity = current, target, "resize made no progress");
            return Ok(AdjustOutcome::Unchanged { capacity: current });
        }
        self.cooldown.stamp(&request.reason())?;
        Ok(AdjustOutcome::Applied {
            from: summary.from,
            to: summary.to,
        })
    }
}

// ── InstanceGroup ──────────────────────────────────────────────────

pub struct InstanceGroup {
    name: String,
    size: u32,
    availability_zones: Vec<String>,
    controller: CapacityController,
}

impl InstanceGroup {
    pub fn new(
        name: &str,
        config: &InstanceGroupConfig,
        template: MemberTemplate,
        state: StateStore,
        factory: Arc<dyn MemberFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let controller = CapacityController::new(name, template, state, factory)
            .with_tags(config.tags.clone())
            .with_clock(clock);
        Self {
            name: name.to_string(),
            size: config.size,
            availability_zones: config.availability_zones.clone(),
            controller,
        }
    }

    pub fn from_config(
        name: &str,
        config: &ScalegridConfig,
        state: StateStore,
        factory: Arc<dyn MemberFactory>,
        clock: Arc<dyn Clock>,
    ) -> AutoscaleResult<Self> {
        let group = config
            .instance_groups
            .get(name)
            .ok_or_else(|| AutoscaleError::Lookup(format!("instance group {name} not found")))?;
        let template = resolve_template(config, name, &group.member_template)?;
        Ok(Self::new(name, group, template.clone(), state, factory, clock))
    }

    pub fn with_load_balancer(mut self, balancer: Arc<dyn LoadBalancerBinding>) -> Self {
        self.controller = self.controller.with_load_balancer(balancer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn availability_zones(&self) -> &[String] {
        &self.availability_zones
    }

    pub fn controller(&self) -> &CapacityController {
        &self.controller
    }

    pub fn members(&self) -> AutoscaleResult<MembershipSet> {
        self.controller.members()
    }

    pub async fn handle_create(&self) -> AutoscaleResult<ResizeSummary> {
        info!(group = %self.name, size = self.size, "creating instance group");
        self.controller.resize(self.size, true).await
    }

    pub async fn handle_delete(&self) -> AutoscaleResult<u32> {
        self.controller.destroy_all().await
    }
}
