//! Local stand-ins for the compute and load balancer collaborators.
//!
//! Nothing is provisioned: member operations are logged and the member
//! name doubles as its reference id, so the whole control loop can be
//! driven from a laptop against a real state file.

use async_trait::async_trait;
use tracing::info;

use scalegrid_autoscale::{LoadBalancerBinding, MemberFactory, MemberSpec};

#[derive(Debug, Default)]
pub struct LoggingMemberFactory;

#[async_trait]
impl MemberFactory for LoggingMemberFactory {
    async fn create(&self, spec: &MemberSpec<'_>) -> Result<String, String> {
        info!(
            group = %spec.group,
            member = %spec.name,
            image = %spec.template.image_id,
            flavor = %spec.template.instance_type,
            tags = spec.tags.len(),
            "create member"
        );
        Ok(spec.name.to_string())
    }

    async fn destroy(&self, spec: &MemberSpec<'_>) -> Result<(), String> {
        info!(group = %spec.group, member = %spec.name, "destroy member");
        Ok(())
    }
}

#[derive(Debug)]
pub struct LoggingLoadBalancer {
    name: String,
}

impl LoggingLoadBalancer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl LoadBalancerBinding for LoggingLoadBalancer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reload(&self, ref_ids: &[String]) -> Result<(), String> {
        info!(
            balancer = %self.name,
            backends = %ref_ids.join(","),
            "reload load balancer"
        );
        Ok(())
    }
}
