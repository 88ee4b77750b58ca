//! Configuration error types.

use thiserror::Error;

/// Result type alias for configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a ScaleGrid config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("group {group}: min_size {min} is greater than max_size {max}")]
    InvalidBounds { group: String, min: u32, max: u32 },

    #[error("group {group}: desired_capacity {desired} is outside [{min}, {max}]")]
    DesiredOutOfBounds {
        group: String,
        desired: u32,
        min: u32,
        max: u32,
    },

    #[error("group {group}: availability_zones must not be empty")]
    NoAvailabilityZones { group: String },

    #[error("{owner}: unknown member template: {template}")]
    UnknownTemplate { owner: String, template: String },

    #[error("policy {policy}: unknown target group: {group}")]
    UnknownGroup { policy: String, group: String },

    #[error("group name defined more than once: {0}")]
    DuplicateGroup(String),
}
