//! `scalegrid adjust` and `scalegrid alarm`.

use anyhow::Result;

use scalegrid_autoscale::{AdjustOutcome, AdjustmentRequest, AdjustmentType, AlarmOutcome};

use crate::deployment::Deployment;

pub async fn adjust(
    deployment: &Deployment,
    group: &str,
    kind: AdjustmentType,
    value: i64,
    fail_fast: bool,
) -> Result<AdjustOutcome> {
    let group = deployment.scaling_group(group)?;
    let outcome = group
        .adjust(AdjustmentRequest::new(kind, value), fail_fast)
        .await?;
    println!("{}: {}", group.name(), describe(&outcome));
    Ok(outcome)
}

pub async fn alarm(deployment: &Deployment, policy: &str) -> Result<AlarmOutcome> {
    let policy = deployment.policy(policy)?;
    let outcome = policy.alarm().await?;
    match &outcome {
        AlarmOutcome::Suppressed => {
            println!("{}: suppressed (policy cooldown)", policy.name());
        }
        AlarmOutcome::Dispatched(adjust) => {
            println!(
                "{} -> {}: {}",
                policy.name(),
                policy.target_group(),
                describe(adjust)
            );
        }
    }
    Ok(outcome)
}

fn describe(outcome: &AdjustOutcome) -> String {
    match outcome {
        AdjustOutcome::Applied { from, to } => format!("resized {from} -> {to}"),
        AdjustOutcome::Unchanged { capacity } => format!("unchanged at {capacity}"),
        AdjustOutcome::Suppressed => "suppressed (group cooldown)".to_string(),
        AdjustOutcome::Rejected { target, violation } => {
            format!("rejected target {target}: {violation}")
        }
    }
}
