//! scalegrid-core: shared types and configuration for ScaleGrid.
//!
//! Parses `scalegrid.toml` into typed group, policy and member-template
//! definitions. Numeric fields may be written as integers or numeric
//! strings; they are normalized here so the controller never sees raw text.

pub mod config;
pub mod error;
pub mod types;

pub use config::ScalegridConfig;
pub use error::{ConfigError, ConfigResult};
pub use types::*;
