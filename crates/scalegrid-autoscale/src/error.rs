//! Autoscaler error types.

use thiserror::Error;

/// Errors that can occur while resizing or adjusting a group.
///
/// Cooldown suppression and bounds rejection are not errors; they are
/// reported through [`crate::AdjustOutcome`].
#[derive(Debug, Error)]
pub enum AutoscaleError {
    /// A create or destroy call to the member factory failed.
    #[error("member operation failed for {member}: {message}")]
    MemberOperation { member: String, message: String },

    /// A referenced group or member template could not be resolved.
    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("load balancer {name} reload failed: {message}")]
    LoadBalancer { name: String, message: String },

    #[error("state store error: {0}")]
    State(#[from] scalegrid_state::StateError),

    #[error("config error: {0}")]
    Config(#[from] scalegrid_core::ConfigError),
}

pub type AutoscaleResult<T> = Result<T, AutoscaleError>;
