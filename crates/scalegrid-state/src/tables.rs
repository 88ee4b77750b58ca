//! redb table definitions for the ScaleGrid state store.

use redb::TableDefinition;

/// Membership sets keyed by group name. Values are comma-delimited member names.
pub const MEMBERSHIPS: TableDefinition<&str, &str> = TableDefinition::new("memberships");

/// Member records keyed by `{group}:{member_name}`.
pub const MEMBERS: TableDefinition<&str, &[u8]> = TableDefinition::new("members");

/// Cooldown records keyed by owner (`group/{name}` or `policy/{name}`).
pub const COOLDOWNS: TableDefinition<&str, &[u8]> = TableDefinition::new("cooldowns");
