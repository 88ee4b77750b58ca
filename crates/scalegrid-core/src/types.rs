//! Shared types used across ScaleGrid crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How an adjustment value is interpreted against the current capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentType {
    /// Set capacity to exactly the given value.
    #[serde(alias = "ExactCapacity")]
    Exact,
    /// Add the given value (may be negative) to the current capacity.
    #[serde(alias = "ChangeInCapacity")]
    Delta,
    /// Add the given percentage of the current capacity.
    #[serde(alias = "PercentChangeInCapacity")]
    PercentDelta,
}

impl AdjustmentType {
    pub fn label(&self) -> &'static str {
        match self {
            AdjustmentType::Exact => "Exact",
            AdjustmentType::Delta => "Delta",
            AdjustmentType::PercentDelta => "PercentDelta",
        }
    }
}

impl fmt::Display for AdjustmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AdjustmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Exact" | "ExactCapacity" | "exact" => Ok(AdjustmentType::Exact),
            "Delta" | "ChangeInCapacity" | "delta" => Ok(AdjustmentType::Delta),
            "PercentDelta" | "PercentChangeInCapacity" | "percent" => {
                Ok(AdjustmentType::PercentDelta)
            }
            other => Err(format!("unknown adjustment type: {other}")),
        }
    }
}

/// A requested change to a group's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub kind: AdjustmentType,
    pub value: i64,
}

impl AdjustmentRequest {
    pub fn new(kind: AdjustmentType, value: i64) -> Self {
        Self { kind, value }
    }

    pub fn exact(value: i64) -> Self {
        Self::new(AdjustmentType::Exact, value)
    }

    pub fn delta(value: i64) -> Self {
        Self::new(AdjustmentType::Delta, value)
    }

    pub fn percent(value: i64) -> Self {
        Self::new(AdjustmentType::PercentDelta, value)
    }

    /// Compute the target capacity for the given current capacity.
    ///
    /// Percentage changes use integer division, so fractional members are
    /// truncated toward zero rather than rounded. The result may be negative
    /// or exceed any bound; callers check it against [`Bounds`].
    pub fn target_from(&self, current: u32) -> i64 {
        let current = i64::from(current);
        match self.kind {
            AdjustmentType::Exact => self.value,
            AdjustmentType::Delta => current.saturating_add(self.value),
            AdjustmentType::PercentDelta => {
                current.saturating_add(current.saturating_mul(self.value) / 100)
            }
        }
    }

    /// Human-readable reason recorded alongside a cooldown timestamp.
    pub fn reason(&self) -> String {
        format!("{} : {}", self.kind, self.value)
    }
}

/// Inclusive capacity range for a scaling group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
}

/// Which side of [`Bounds`] a target falls outside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundViolation {
    AboveMax(u32),
    BelowMin(u32),
}

impl fmt::Display for BoundViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundViolation::AboveMax(max) => write!(f, "can not exceed {max}"),
            BoundViolation::BelowMin(min) => write!(f, "can not be less than {min}"),
        }
    }
}

impl Bounds {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Check a target against the bounds. Targets outside are never clamped.
    pub fn check(&self, target: i64) -> Result<u32, BoundViolation> {
        if target > i64::from(self.max) {
            return Err(BoundViolation::AboveMax(self.max));
        }
        if target < i64::from(self.min) {
            return Err(BoundViolation::BelowMin(self.min));
        }
        // min >= 0 and target <= max, so this always fits.
        Ok(target as u32)
    }
}

/// A key/value tag passed through to every member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}
