//! CapacityController: sequential, identity-stable resizing of a group.
//!
//! The controller owns a group's membership set. Members are named
//! `<group>-<index>`; growth always appends the next index and shrinkage
//! always removes the highest index, so repeated grow/shrink cycles never
//! renumber surviving members. The set is persisted after every single
//! create or destroy.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use scalegrid_core::{Tag, config::MemberTemplate};
use scalegrid_state::{Member, MemberRecord, MembershipSet, StateStore};

use crate::clock::{Clock, SystemClock};
use crate::error::{AutoscaleError, AutoscaleResult};
use crate::member::{LoadBalancerBinding, MemberFactory, MemberSpec};

/// Capacity before and after a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSummary {
    pub from: u32,
    pub to: u32,
}

impl ResizeSummary {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

pub struct CapacityController {
    group: String,
    template: MemberTemplate,
    tags: Vec<Tag>,
    state: StateStore,
    factory: Arc<dyn MemberFactory>,
    balancers: Vec<Arc<dyn LoadBalancerBinding>>,
    clock: Arc<dyn Clock>,
}

impl CapacityController {
    pub fn new(
        group: impl Into<String>,
        template: MemberTemplate,
        state: StateStore,
        factory: Arc<dyn MemberFactory>,
    ) -> Self {
        Self {
            group: group.into(),
            template,
            tags: Vec::new(),
            state,
            factory,
            balancers: Vec::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Tags passed through to every member.
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Reload this balancer after every resize that changes capacity.
    pub fn with_load_balancer(mut self, balancer: Arc<dyn LoadBalancerBinding>) -> Self {
        self.balancers.push(balancer);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn load_balancers(&self) -> impl Iterator<Item = &str> {
        self.balancers.iter().map(|lb| lb.name())
    }

    /// The recorded membership, in index order.
    pub fn members(&self) -> AutoscaleResult<MembershipSet> {
        Ok(self.state.get_membership(&self.group)?)
    }

    pub fn capacity(&self) -> AutoscaleResult<u32> {
        Ok(self.members()?.len())
    }

    /// Bring the group to exactly `target` members.
    ///
    /// With `fail_fast`, the first failed creation aborts the resize with
    /// [`AutoscaleError::MemberOperation`]; members created before it stay
    /// recorded. Without it, growth stops at the failed member and the
    /// resize completes with fewer members than requested. Destroy failures
    /// never abort a shrink.
    pub async fn resize(&self, target: u32, fail_fast: bool) -> AutoscaleResult<ResizeSummary> {
        let mut set = self.members()?;
        let from = set.len();
        if target == from {
            debug!(group = %self.group, capacity = from, "no change in capacity");
            return Ok(ResizeSummary { from, to: from });
        }
        if !set.is_contiguous() {
            warn!(
                group = %self.group,
                indices = ?set.indices(),
                "membership has index gaps"
            );
        }

        info!(group = %self.group, from, to = target, "adjusting capacity");
        if target > from {
            self.grow(&mut set, target, fail_fast).await?;
        } else {
            self.shrink(&mut set, target).await?;
        }

        self.reload(&set).await?;
        Ok(ResizeSummary {
            from,
            to: set.len(),
        })
    }

    async fn grow(
        &self,
        set: &mut MembershipSet,
        target: u32,
        fail_fast: bool,
    ) -> AutoscaleResult<()> {
        while set.len() < target {
            let index = set.last().map_or(0, |m| m.index + 1);
            let member = Member::new(&self.group, index);
            debug!(group = %self.group, member = %member.name, "creating member");

            let created = self.factory.create(&self.spec(&member)).await;
            let ref_id = match created {
                Ok(ref_id) => ref_id,
                Err(message) if fail_fast => {
                    return Err(AutoscaleError::MemberOperation {
                        member: member.name,
                        message,
                    });
                }
                Err(message) => {
                    warn!(
                        group = %self.group,
                        member = %member.name,
                        error = %message,
                        "member creation failed, stopping growth"
                    );
                    break;
                }
            };

            let record = MemberRecord {
                name: member.name.clone(),
                index: member.index,
                ref_id,
                created_at: self.clock.now(),
            };
            set.push(member);
            self.state.record_member_created(set, &record)?;
        }
        Ok(())
    }

    async fn shrink(&self, set: &mut MembershipSet, target: u32) -> AutoscaleResult<()> {
        while set.len() > target {
            let Some(victim) = set.pop() else { break };
            debug!(group = %self.group, member = %victim.name, "destroying member");
            // Best effort: the member leaves the set whether or not the
            // destroy call succeeded.
            if let Err(message) = self.factory.destroy(&self.spec(&victim)).await {
                warn!(
                    group = %self.group,
                    member = %victim.name,
                    error = %message,
                    "member destruction failed, removing from group anyway"
                );
            }
            self.state.record_member_removed(set, &victim.name)?;
        }
        Ok(())
    }

    /// Destroy every member, highest index first, then drop the membership.
    ///
    /// Unlike a shrink, a failed destroy aborts here; members not yet
    /// destroyed remain recorded so the call can be retried.
    pub async fn destroy_all(&self) -> AutoscaleResult<u32> {
        let mut set = self.members()?;
        let mut destroyed = 0;
        while let Some(victim) = set.last().cloned() {
            debug!(group = %self.group, member = %victim.name, "destroying member");
            self.factory
                .destroy(&self.spec(&victim))
                .await
                .map_err(|message| AutoscaleError::MemberOperation {
                    member: victim.name.clone(),
                    message,
                })?;
            set.pop();
            self.state.record_member_removed(&set, &victim.name)?;
            destroyed += 1;
        }
        self.state.delete_membership(&self.group)?;
        info!(group = %self.group, destroyed, "group emptied");
        Ok(destroyed)
    }

    /// Push the final membership's reference ids to every load balancer.
    async fn reload(&self, set: &MembershipSet) -> AutoscaleResult<()> {
        if self.balancers.is_empty() {
            return Ok(());
        }
        let ref_ids = self.ref_ids(set)?;
        for lb in &self.balancers {
            lb.reload(&ref_ids)
                .await
                .map_err(|message| AutoscaleError::LoadBalancer {
                    name: lb.name().to_string(),
                    message,
                })?;
            debug!(group = %self.group, lb = %lb.name(), members = ref_ids.len(), "load balancer reloaded");
        }
        Ok(())
    }

    /// Reference ids in index order. Members without a record fall back to
    /// their name.
    fn ref_ids(&self, set: &MembershipSet) -> AutoscaleResult<Vec<String>> {
        let mut records: HashMap<String, String> = self
            .state
            .list_members(&self.group)?
            .into_iter()
            .map(|r| (r.name, r.ref_id))
            .collect();
        Ok(set
            .members()
            .iter()
            .map(|m| records.remove(&m.name).unwrap_or_else(|| m.name.clone()))
            .collect())
    }

    fn spec<'a>(&'a self, member: &'a Member) -> MemberSpec<'a> {
        MemberSpec {
            group: &self.group,
            name: &member.name,
            index: member.index,
            template: &self.template,
            tags: &self.tags,
            silent: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Op, RecordingBalancer, RecordingFactory, template};

    fn controller(factory: Arc<RecordingFactory>) -> (CapacityController, StateStore) {
        let state = StateStore::open_in_memory().unwrap();
        let ctl = CapacityController::new("web", template(), state.clone(), factory);
        (ctl, state)
    }

    #[tokio::test]
    async fn grow_from_empty() {
        let factory = Arc::new(RecordingFactory::default());
        let (ctl, state) = controller(factory.clone());

        let summary = ctl.resize(3, true).await.unwrap();

        assert_eq!(summary, ResizeSummary { from: 0, to: 3 });
        assert_eq!(factory.created(), vec!["web-0", "web-1", "web-2"]);
        assert_eq!(state.get_membership("web").unwrap().indices(), vec![0, 1, 2]);
        assert_eq!(*factory.loud_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn resize_to_same_size_is_noop() {
        let factory = Arc::new(RecordingFactory::default());
        let (ctl, _) = controller(factory.clone());
        ctl.resize(2, true).await.unwrap();

        let summary = ctl.resize(2, true).await.unwrap();

        assert!(!summary.changed());
        assert_eq!(factory.ops().len(), 2);
    }

    #[tokio::test]
    async fn shrink_destroys_highest_first() {
        let factory = Arc::new(RecordingFactory::default());
        let (ctl, _) = controller(factory.clone());
        ctl.resize(5, true).await.unwrap();

        ctl.resize(2, false).await.unwrap();

        assert_eq!(factory.destroyed(), vec!["web-4", "web-3", "web-2"]);
        assert_eq!(ctl.members().unwrap().indices(), vec![0, 1]);
    }

    #[tokio::test]
    async fn fail_fast_keeps_created_members() {
        let factory = Arc::new(RecordingFactory::default());
        factory.fail_create_of("web-2");
        let (ctl, _) = controller(factory.clone());

        let err = ctl.resize(4, true).await.unwrap_err();

        assert!(matches!(
            err,
            AutoscaleError::MemberOperation { ref member, .. } if member == "web-2"
        ));
        assert_eq!(ctl.members().unwrap().indices(), vec![0, 1]);
    }

    #[tokio::test]
    async fn lenient_growth_stops_at_failure() {
        let factory = Arc::new(RecordingFactory::default());
        factory.fail_create_of("web-1");
        let lb = Arc::new(RecordingBalancer::new("web-lb"));
        let (ctl, _) = controller(factory.clone());
        let ctl = ctl.with_load_balancer(lb.clone());

        let summary = ctl.resize(3, false).await.unwrap();

        assert_eq!(summary, ResizeSummary { from: 0, to: 1 });
        assert_eq!(factory.created(), vec!["web-0"]);
        assert!(ctl.members().unwrap().is_contiguous());
        assert_eq!(lb.reloads(), vec![vec!["ref-web-0".to_string()]]);
    }

    #[tokio::test]
    async fn destroy_failure_still_removes_member() {
        let factory = Arc::new(RecordingFactory::default());
        let (ctl, state) = controller(factory.clone());
        ctl.resize(3, true).await.unwrap();
        factory.fail_destroy_of("web-2");

        ctl.resize(1, false).await.unwrap();

        assert_eq!(ctl.members().unwrap().indices(), vec![0]);
        assert!(state.get_member("web", "web-2").unwrap().is_none());
    }

    #[tokio::test]
    async fn reload_receives_final_ref_ids_once_per_balancer() {
        let factory = Arc::new(RecordingFactory::default());
        let a = Arc::new(RecordingBalancer::new("lb-a"));
        let b = Arc::new(RecordingBalancer::new("lb-b"));
        let (ctl, _) = controller(factory);
        let ctl = ctl.with_load_balancer(a.clone()).with_load_balancer(b.clone());

        ctl.resize(2, true).await.unwrap();
        ctl.resize(2, true).await.unwrap();

        let expected = vec!["ref-web-0".to_string(), "ref-web-1".to_string()];
        assert_eq!(a.reloads(), vec![expected.clone()]);
        assert_eq!(b.reloads(), vec![expected]);
        assert_eq!(ctl.load_balancers().collect::<Vec<_>>(), vec!["lb-a", "lb-b"]);
    }

    #[tokio::test]
    async fn reload_failure_is_reported() {
        let factory = Arc::new(RecordingFactory::default());
        let mut lb = RecordingBalancer::new("web-lb");
        lb.fail = true;
        let (ctl, _) = controller(factory);
        let ctl = ctl.with_load_balancer(Arc::new(lb));

        let err = ctl.resize(1, true).await.unwrap_err();

        assert!(matches!(err, AutoscaleError::LoadBalancer { ref name, .. } if name == "web-lb"));
        // The member itself was created and recorded.
        assert_eq!(ctl.capacity().unwrap(), 1);
    }

    #[tokio::test]
    async fn destroy_all_empties_group() {
        let factory = Arc::new(RecordingFactory::default());
        let (ctl, state) = controller(factory.clone());
        ctl.resize(3, true).await.unwrap();

        assert_eq!(ctl.destroy_all().await.unwrap(), 3);

        assert_eq!(factory.destroyed(), vec!["web-2", "web-1", "web-0"]);
        assert!(state.list_groups().unwrap().is_empty());
        assert!(state.list_members("web").unwrap().is_empty());
    }

    #[tokio::test]
    async fn destroy_all_stops_at_failure() {
        let factory = Arc::new(RecordingFactory::default());
        let (ctl, _) = controller(factory.clone());
        ctl.resize(3, true).await.unwrap();
        factory.fail_destroy_of("web-1");

        assert!(ctl.destroy_all().await.is_err());

        assert_eq!(ctl.members().unwrap().indices(), vec![0, 1]);
        assert_eq!(
            factory.ops().last(),
            Some(&Op::Destroy("web-1".to_string()))
        );
    }
}
