//! scalegrid-autoscale: capacity control for groups of identical members.
//!
//! A [`ScalingGroup`] reconciles its recorded membership toward a target
//! computed from an [`AdjustmentRequest`], rejecting targets outside its
//! bounds and suppressing adjustments during its cooldown window. A
//! [`ScalingPolicy`] is a named trigger that applies one configured
//! adjustment to a group, throttled by its own independent cooldown.
//!
//! # Resize algorithm
//!
//! ```text
//! members = parse(membership field)          // ascending index order
//!
//! grow:   for i in len..target
//!             factory.create("<group>-<i>")
//!             append + persist               // one member at a time
//!
//! shrink: while len > target
//!             factory.destroy(highest index) // failures logged, ignored
//!             remove + persist
//!
//! for lb in load_balancers: lb.reload(ref ids of final members)
//! ```
//!
//! Member operations are awaited strictly one after another. Persisting
//! after every step is what makes an interrupted resize resumable: calling
//! `resize` again with the same target converges from wherever it stopped.
//! There are no locks; at most one resize per group may be in flight.

pub mod clock;
pub mod controller;
pub mod cooldown;
pub mod error;
pub mod group;
pub mod member;
pub mod policy;

#[cfg(test)]
pub(crate) mod fakes;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{CapacityController, ResizeSummary};
pub use cooldown::CooldownGuard;
pub use error::{AutoscaleError, AutoscaleResult};
pub use group::{AdjustOutcome, InstanceGroup, ScalingGroup};
pub use member::{LoadBalancerBinding, MemberFactory, MemberSpec};
pub use policy::{AlarmOutcome, GroupMap, GroupRegistry, ScalingPolicy};
pub use scalegrid_core::{AdjustmentRequest, AdjustmentType, Bounds};
