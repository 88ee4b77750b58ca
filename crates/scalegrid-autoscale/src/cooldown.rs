//! CooldownGuard: time-based throttling of accepted adjustments.
//!
//! A guard owns one persisted [`CooldownRecord`]: the timestamp and reason
//! of the last accepted adjustment. Groups and policies each embed their
//! own guard, so the two throttling layers run on independent clocks.
//! Checks are plain time comparisons, not locks.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use scalegrid_state::{CooldownRecord, StateStore};

use crate::clock::Clock;
use crate::error::AutoscaleResult;

pub struct CooldownGuard {
    owner: String,
    window: u64,
    state: StateStore,
    clock: Arc<dyn Clock>,
}

impl CooldownGuard {
    /// Create a guard for `owner`. Negative windows are clamped to zero and
    /// an absent window means no throttling.
    pub fn new(
        owner: impl Into<String>,
        configured_secs: Option<i64>,
        state: StateStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let window = configured_secs.unwrap_or(0).max(0) as u64;
        Self {
            owner: owner.into(),
            window,
            state,
            clock,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window)
    }

    /// True while the last accepted adjustment is younger than the window.
    pub fn in_progress(&self) -> AutoscaleResult<bool> {
        if self.window == 0 {
            return Ok(false);
        }
        let Some(record) = self.state.get_cooldown(&self.owner)? else {
            return Ok(false);
        };
        let elapsed = self.clock.now().saturating_sub(record.timestamp);
        let in_progress = elapsed < self.window;
        if in_progress {
            debug!(
                owner = %self.owner,
                elapsed,
                window = self.window,
                last = %record.reason,
                "cooldown in progress"
            );
        }
        Ok(in_progress)
    }

    /// Record an accepted adjustment, replacing any previous record.
    pub fn stamp(&self, reason: &str) -> AutoscaleResult<()> {
        let record = CooldownRecord {
            timestamp: self.clock.now(),
            reason: reason.to_string(),
        };
        self.state.put_cooldown(&self.owner, &record)?;
        Ok(())
    }

    /// The last accepted adjustment, if any.
    pub fn last(&self) -> AutoscaleResult<Option<CooldownRecord>> {
        Ok(self.state.get_cooldown(&self.owner)?)
    }

    /// Forget the last adjustment. Returns true if there was one.
    pub fn clear(&self) -> AutoscaleResult<bool> {
        Ok(self.state.delete_cooldown(&self.owner)?)
    }
}
