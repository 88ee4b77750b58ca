//! StateStore: redb-backed state persistence for ScaleGrid.
//!
//! Provides typed operations over membership sets, member records and
//! cooldown records. The store supports both on-disk and in-memory
//! backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(MEMBERSHIPS).map_err(map_err!(Table))?;
        txn.open_table(MEMBERS).map_err(map_err!(Table))?;
        txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Memberships ────────────────────────────────────────────────

    /// Read a group's membership set. Unknown groups have an empty set.
    pub fn get_membership(&self, group: &str) -> StateResult<MembershipSet> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(MEMBERSHIPS).map_err(map_err!(Table))?;
        match table.get(group).map_err(map_err!(Read))? {
            Some(guard) => MembershipSet::parse(group, guard.value()),
            None => Ok(MembershipSet::empty(group)),
        }
    }

    /// List every group that has a persisted membership field.
    pub fn list_groups(&self) -> StateResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(MEMBERSHIPS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            results.push(key.value().to_string());
        }
        Ok(results)
    }

    /// Persist a set that just gained `record`, in one transaction.
    pub fn record_member_created(
        &self,
        set: &MembershipSet,
        record: &MemberRecord,
    ) -> StateResult<()> {
        let group = set.group();
        let key = record.table_key(group);
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let encoded = set.encode();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut memberships = txn.open_table(MEMBERSHIPS).map_err(map_err!(Table))?;
            memberships
                .insert(group, encoded.as_str())
                .map_err(map_err!(Write))?;
            let mut members = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
            members
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%group, member = %record.name, size = set.len(), "member recorded");
        Ok(())
    }

    /// Persist a set that just lost `name`, in one transaction.
    pub fn record_member_removed(&self, set: &MembershipSet, name: &str) -> StateResult<()> {
        let group = set.group();
        let key = member_key(group, name);
        let encoded = set.encode();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut memberships = txn.open_table(MEMBERSHIPS).map_err(map_err!(Table))?;
            memberships
                .insert(group, encoded.as_str())
                .map_err(map_err!(Write))?;
            let mut members = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
            members.remove(key.as_str()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%group, member = %name, size = set.len(), "member removed");
        Ok(())
    }

    /// Drop a group's membership field and all of its member records.
    /// Returns true if a membership field existed.
    pub fn delete_membership(&self, group: &str) -> StateResult<bool> {
        // Collect keys in a read transaction first.
        let keys: Vec<String> = {
            let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
            let table = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
            table
                .iter()
                .map_err(map_err!(Read))?
                .filter_map(|entry| {
                    let (key, _) = entry.ok()?;
                    let k = key.value().to_string();
                    is_member_key_of(&k, group).then_some(k)
                })
                .collect()
        };
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut memberships = txn.open_table(MEMBERSHIPS).map_err(map_err!(Table))?;
            existed = memberships.remove(group).map_err(map_err!(Write))?.is_some();
            let mut members = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
            for key in &keys {
                members.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%group, existed, records = keys.len(), "membership deleted");
        Ok(existed)
    }

    // ── Member records ─────────────────────────────────────────────

    /// Get the record of a single member.
    pub fn get_member(&self, group: &str, name: &str) -> StateResult<Option<MemberRecord>> {
        let key = member_key(group, name);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: MemberRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List all member records of a group, in index order.
    pub fn list_members(&self, group: &str) -> StateResult<Vec<MemberRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if is_member_key_of(key.value(), group) {
                let record: MemberRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        results.sort_by_key(|r| r.index);
        Ok(results)
    }

    // ── Cooldowns ──────────────────────────────────────────────────

    /// Get the cooldown record of an owner, if one was ever stamped.
    pub fn get_cooldown(&self, owner: &str) -> StateResult<Option<CooldownRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;
        match table.get(owner).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: CooldownRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the cooldown record of an owner.
    pub fn put_cooldown(&self, owner: &str, record: &CooldownRecord) -> StateResult<()> {
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;
            table
                .insert(owner, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%owner, reason = %record.reason, "cooldown stamped");
        Ok(())
    }

    /// Delete an owner's cooldown record. Returns true if it existed.
    pub fn delete_cooldown(&self, owner: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;
            existed = table.remove(owner).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }
}
