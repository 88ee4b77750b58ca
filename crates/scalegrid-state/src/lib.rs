//! scalegrid-state: embedded state store for ScaleGrid.
//!
//! Backed by [redb](https://docs.rs/redb), persists the membership set of
//! every group, one record per live member, and the latest cooldown record
//! of every group and policy.
//!
//! # Architecture
//!
//! A membership set is stored as a single comma-delimited list of member
//! names and parsed back into numeric index order on every read. Member
//! records and cooldown records are JSON-serialized into `&[u8]` columns.
//! Membership changes write the set and the affected member record in one
//! transaction, so an interrupted resize always leaves a consistent prefix.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
