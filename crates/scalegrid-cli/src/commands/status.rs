//! `scalegrid status`: persisted membership and cooldowns per group, and
//! the cooldown of every policy.

use anyhow::Result;
use serde::Serialize;

use scalegrid_autoscale::CooldownGuard;

use crate::deployment::Deployment;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub groups: Vec<GroupStatus>,
    pub policies: Vec<PolicyStatus>,
}

#[derive(Debug, Serialize)]
pub struct GroupStatus {
    pub name: String,
    pub kind: &'static str,
    pub capacity: u32,
    /// `[min, max]` for scaling groups, the fixed size for instance groups.
    pub bounds: (u32, u32),
    pub members: Vec<MemberStatus>,
    pub cooldown: Option<CooldownStatus>,
}

#[derive(Debug, Serialize)]
pub struct MemberStatus {
    pub name: String,
    pub ref_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PolicyStatus {
    pub name: String,
    pub target_group: String,
    pub adjustment: String,
    pub cooldown: Option<CooldownStatus>,
}

#[derive(Debug, Serialize)]
pub struct CooldownStatus {
    pub last_adjustment: String,
    pub remaining_secs: u64,
}

pub fn collect(deployment: &Deployment, only: Option<&str>) -> Result<StatusReport> {
    let wanted = |name: &str| only.is_none_or(|o| o == name);
    let mut groups = Vec::new();

    for group in deployment.scaling_groups()? {
        if !wanted(group.name()) {
            continue;
        }
        let bounds = group.bounds();
        groups.push(GroupStatus {
            name: group.name().to_string(),
            kind: "scaling",
            capacity: group.capacity()?,
            bounds: (bounds.min, bounds.max),
            members: members(deployment, group.name())?,
            cooldown: cooldown(deployment, group.cooldown())?,
        });
    }

    for group in deployment.instance_groups() {
        if !wanted(group.name()) {
            continue;
        }
        groups.push(GroupStatus {
            name: group.name().to_string(),
            kind: "instance",
            capacity: group.members()?.len(),
            bounds: (group.size(), group.size()),
            members: members(deployment, group.name())?,
            cooldown: None,
        });
    }

    if let Some(name) = only
        && groups.is_empty()
    {
        anyhow::bail!("group {name} not found");
    }

    // With a group filter, only the policies that target it.
    let mut policies = Vec::new();
    for policy in deployment.policies()? {
        if !wanted(policy.target_group()) {
            continue;
        }
        policies.push(PolicyStatus {
            name: policy.name().to_string(),
            target_group: policy.target_group().to_string(),
            adjustment: policy.adjustment().reason(),
            cooldown: cooldown(deployment, policy.cooldown())?,
        });
    }

    Ok(StatusReport { groups, policies })
}

fn members(deployment: &Deployment, group: &str) -> Result<Vec<MemberStatus>> {
    let state = deployment.state();
    let set = state.get_membership(group)?;
    let mut out = Vec::with_capacity(set.members().len());
    for member in set.members() {
        let record = state.get_member(group, &member.name)?;
        out.push(MemberStatus {
            name: member.name.clone(),
            ref_id: record.map(|r| r.ref_id),
        });
    }
    Ok(out)
}

fn cooldown(deployment: &Deployment, guard: &CooldownGuard) -> Result<Option<CooldownStatus>> {
    let Some(record) = guard.last()? else {
        return Ok(None);
    };
    let expires = record.timestamp.saturating_add(guard.window().as_secs());
    Ok(Some(CooldownStatus {
        last_adjustment: record.reason,
        remaining_secs: expires.saturating_sub(deployment.now()),
    }))
}

pub fn status(deployment: &Deployment, only: Option<&str>, format: &str) -> Result<()> {
    let report = collect(deployment, only)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            for group in &report.groups {
                println!(
                    "{} ({}) capacity={} bounds={}..{}",
                    group.name, group.kind, group.capacity, group.bounds.0, group.bounds.1
                );
                for member in &group.members {
                    println!(
                        "  {} {}",
                        member.name,
                        member.ref_id.as_deref().unwrap_or("-")
                    );
                }
                if let Some(cd) = &group.cooldown {
                    println!(
                        "  last adjustment: {} ({}s cooldown left)",
                        cd.last_adjustment, cd.remaining_secs
                    );
                }
            }
            for policy in &report.policies {
                println!(
                    "policy {} -> {} [{}]",
                    policy.name, policy.target_group, policy.adjustment
                );
                if let Some(cd) = &policy.cooldown {
                    println!(
                        "  last alarm: {} ({}s cooldown left)",
                        cd.last_adjustment, cd.remaining_secs
                    );
                }
            }
        }
    }

    Ok(())
}
