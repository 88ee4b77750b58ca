//! `scalegrid create` and `scalegrid delete`.

use anyhow::{Result, anyhow};
use tracing::info;

use crate::deployment::Deployment;

/// Bring one group, or every configured group, up to its initial size.
pub async fn create(deployment: &Deployment, name: Option<&str>) -> Result<()> {
    let Some(name) = name else {
        for group in deployment.scaling_groups()? {
            let summary = group.handle_create().await?;
            println!("{}: {} -> {}", group.name(), summary.from, summary.to);
        }
        for group in deployment.instance_groups() {
            let summary = group.handle_create().await?;
            println!("{}: {} -> {}", group.name(), summary.from, summary.to);
        }
        return Ok(());
    };

    let summary = if deployment.is_scaling_group(name) {
        deployment.scaling_group(name)?.handle_create().await?
    } else {
        deployment
            .instance_group(name)
            .ok_or_else(|| anyhow!("group {name} not found"))?
            .handle_create()
            .await?
    };
    println!("{name}: {} -> {}", summary.from, summary.to);
    Ok(())
}

/// Destroy every member of a group and drop its persisted state.
pub async fn delete(deployment: &Deployment, name: &str) -> Result<()> {
    let destroyed = if deployment.is_scaling_group(name) {
        deployment.scaling_group(name)?.handle_delete().await?
    } else {
        deployment
            .instance_group(name)
            .ok_or_else(|| anyhow!("group {name} not found"))?
            .handle_delete()
            .await?
    };
    info!(group = %name, destroyed, "group deleted");
    println!("{name}: destroyed {destroyed} member(s)");
    Ok(())
}
