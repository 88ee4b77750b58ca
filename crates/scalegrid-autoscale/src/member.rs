//! Collaborator interfaces for provisioning members and publishing them
//! to load balancers.
//!
//! Both are implemented outside this crate (a compute API client, a load
//! balancer config writer). Errors are plain strings; the controller wraps
//! them with the member or balancer they concern.

use async_trait::async_trait;

use scalegrid_core::{Tag, config::MemberTemplate};

/// Everything a factory needs to create or destroy one member.
#[derive(Debug, Clone, Copy)]
pub struct MemberSpec<'a> {
    pub group: &'a str,
    pub name: &'a str,
    pub index: u32,
    pub template: &'a MemberTemplate,
    pub tags: &'a [Tag],
    /// Group-managed members are not template resources of their own;
    /// the factory must not emit lifecycle notifications for them.
    pub silent: bool,
}

/// Creates and destroys single members.
#[async_trait]
pub trait MemberFactory: Send + Sync {
    /// Create a member. Returns its reference id.
    async fn create(&self, spec: &MemberSpec<'_>) -> Result<String, String>;

    /// Destroy a member.
    async fn destroy(&self, spec: &MemberSpec<'_>) -> Result<(), String>;
}

/// A load balancer that routes to a group's members.
#[async_trait]
pub trait LoadBalancerBinding: Send + Sync {
    fn name(&self) -> &str;

    /// Replace the balancer's backend list with `ref_ids`, in index order.
    async fn reload(&self, ref_ids: &[String]) -> Result<(), String>;
}
