//! Domain types for the ScaleGrid state store.

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// Separator between member names in a persisted membership field.
pub const MEMBER_DELIMITER: &str = ",";

// ── Membership ─────────────────────────────────────────────────────

/// One member of a group, identified by `<group>-<index>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    pub name: String,
    pub index: u32,
}

impl Member {
    /// Synthesize the member at `index` of `group`.
    pub fn new(group: &str, index: u32) -> Self {
        Self {
            name: format!("{group}-{index}"),
            index,
        }
    }

    /// Recover a member from its name. The index is the text after the
    /// group prefix; the group name itself may contain `-`.
    pub fn parse(group: &str, name: &str) -> Option<Self> {
        let suffix = name.strip_prefix(group)?.strip_prefix('-')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index = suffix.parse::<u32>().ok()?;
        Some(Self {
            name: name.to_string(),
            index,
        })
    }
}

/// Ordered members of one group, always in ascending index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipSet {
    group: String,
    members: Vec<Member>,
}

impl MembershipSet {
    pub fn empty(group: &str) -> Self {
        Self {
            group: group.to_string(),
            members: Vec::new(),
        }
    }

    /// Parse a persisted membership field.
    ///
    /// Order is numeric index order, not the lexicographic order of the raw
    /// names (`g-10` sorts after `g-9`).
    pub fn parse(group: &str, raw: &str) -> StateResult<Self> {
        let mut members = Vec::new();
        for entry in raw.split(MEMBER_DELIMITER).filter(|e| !e.is_empty()) {
            let member = Member::parse(group, entry).ok_or_else(|| StateError::Membership {
                group: group.to_string(),
                entry: entry.to_string(),
            })?;
            members.push(member);
        }
        members.sort_by_key(|m| m.index);
        if let Some(pair) = members.windows(2).find(|w| w[0].index == w[1].index) {
            return Err(StateError::Membership {
                group: group.to_string(),
                entry: pair[1].name.clone(),
            });
        }
        Ok(Self {
            group: group.to_string(),
            members,
        })
    }

    /// Render the persisted form. `parse(encode())` yields the same set.
    pub fn encode(&self) -> String {
        self.names().join(MEMBER_DELIMITER)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn indices(&self) -> Vec<u32> {
        self.members.iter().map(|m| m.index).collect()
    }

    pub fn len(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True when indices run 0, 1, .. len-1 with no gaps.
    pub fn is_contiguous(&self) -> bool {
        self.members
            .iter()
            .enumerate()
            .all(|(i, m)| m.index as usize == i)
    }

    /// Append a member. It must sort after every existing member.
    pub fn push(&mut self, member: Member) {
        debug_assert!(self.members.last().is_none_or(|last| last.index < member.index));
        self.members.push(member);
    }

    /// The highest-indexed member, if any.
    pub fn last(&self) -> Option<&Member> {
        self.members.last()
    }

    /// Remove and return the highest-indexed member.
    pub fn pop(&mut self) -> Option<Member> {
        self.members.pop()
    }
}

// ── Member records ────────────────────────────────────────────────

/// Persisted details of a live member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberRecord {
    pub name: String,
    pub index: u32,
    /// Reference id returned by the member factory on creation.
    pub ref_id: String,
    /// Unix timestamp (seconds) when the member was created.
    pub created_at: u64,
}

impl MemberRecord {
    /// Build the composite key for the members table.
    pub fn table_key(&self, group: &str) -> String {
        member_key(group, &self.name)
    }
}

pub(crate) fn member_key(group: &str, name: &str) -> String {
    format!("{group}:{name}")
}

/// True if `key` is a members-table key of `group` itself. A bare prefix
/// match would also pick up groups named `{group}:...`.
pub(crate) fn is_member_key_of(key: &str, group: &str) -> bool {
    key.strip_prefix(group)
        .and_then(|rest| rest.strip_prefix(':'))
        .is_some_and(|name| Member::parse(group, name).is_some())
}

// ── Cooldown ──────────────────────────────────────────────────────

/// The latest accepted adjustment of a group or policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CooldownRecord {
    /// Unix timestamp (seconds) of the adjustment.
    pub timestamp: u64,
    pub reason: String,
}

/// Owner key for a group's cooldown record.
pub fn group_owner_key(group: &str) -> String {
    format!("group/{group}")
}

/// Owner key for a policy's cooldown record.
pub fn policy_owner_key(policy: &str) -> String {
    format!("policy/{policy}")
}
