//! End-to-end scaling behaviour through the public API: config text in,
//! member factory calls and persisted membership out.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use scalegrid_autoscale::{
    AdjustOutcome, AdjustmentRequest, AlarmOutcome, CapacityController, GroupMap, LoadBalancerBinding,
    ManualClock, MemberFactory, MemberSpec, ScalingGroup, ScalingPolicy,
};
use scalegrid_core::ScalegridConfig;
use scalegrid_state::StateStore;

const CONFIG: &str = r#"
[templates.web]
image_id = "fedora-20"
instance_type = "m1.small"

[groups.web-asg]
availability_zones = ["nova"]
member_template = "web"
min_size = 1
max_size = 5
cooldown = 60
load_balancer_names = ["web-lb"]
tags = [{ key = "tier", value = "web" }]

[groups.small]
availability_zones = ["nova"]
member_template = "web"
min_size = 0
max_size = 4

[policies.web-exact]
target_group = "web-asg"
adjustment_value = 3
adjustment_type = "Exact"
"#;

/// Counts calls per member name so tests can assert nothing was recreated.
#[derive(Default)]
struct CountingFactory {
    log: Mutex<Vec<String>>,
    fail_after: Mutex<Option<usize>>,
}

impl CountingFactory {
    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn creations_of(&self, name: &str) -> usize {
        let entry = format!("create {name}");
        self.log().iter().filter(|l| **l == entry).count()
    }
}

#[async_trait]
impl MemberFactory for CountingFactory {
    async fn create(&self, spec: &MemberSpec<'_>) -> Result<String, String> {
        assert!(spec.silent);
        let mut log = self.log.lock().unwrap();
        let created = log.iter().filter(|l| l.starts_with("create")).count();
        if self.fail_after.lock().unwrap().is_some_and(|n| created >= n) {
            return Err("provisioning API unavailable".to_string());
        }
        log.push(format!("create {}", spec.name));
        Ok(format!("i-{}", spec.name))
    }

    async fn destroy(&self, spec: &MemberSpec<'_>) -> Result<(), String> {
        self.log.lock().unwrap().push(format!("destroy {}", spec.name));
        Ok(())
    }
}

#[derive(Default)]
struct Balancer {
    reloads: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl LoadBalancerBinding for Balancer {
    fn name(&self) -> &str {
        "web-lb"
    }

    async fn reload(&self, ref_ids: &[String]) -> Result<(), String> {
        self.reloads.lock().unwrap().push(ref_ids.to_vec());
        Ok(())
    }
}

struct Harness {
    config: ScalegridConfig,
    state: StateStore,
    factory: Arc<CountingFactory>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new() -> Self {
        Self {
            config: ScalegridConfig::parse(CONFIG).unwrap(),
            state: StateStore::open_in_memory().unwrap(),
            factory: Arc::new(CountingFactory::default()),
            clock: Arc::new(ManualClock::new(1_700_000_000)),
        }
    }

    fn group(&self, name: &str) -> ScalingGroup {
        ScalingGroup::from_config(
            name,
            &self.config,
            self.state.clone(),
            self.factory.clone(),
            self.clock.clone(),
        )
        .unwrap()
    }

    fn controller(&self, group: &str) -> CapacityController {
        let template = self.config.templates["web"].clone();
        CapacityController::new(group, template, self.state.clone(), self.factory.clone())
    }
}

#[tokio::test]
async fn resize_is_idempotent() {
    let h = Harness::new();
    let ctl = h.controller("web-asg");

    for k in [0, 1, 3, 7] {
        ctl.resize(k, true).await.unwrap();
        let before = ctl.members().unwrap();
        let ops = h.factory.log().len();

        ctl.resize(k, true).await.unwrap();

        assert_eq!(ctl.members().unwrap(), before);
        assert_eq!(h.factory.log().len(), ops);
    }
}

#[tokio::test]
async fn shrink_keeps_lowest_indices() {
    let h = Harness::new();
    let ctl = h.controller("web-asg");
    ctl.resize(5, true).await.unwrap();

    ctl.resize(2, true).await.unwrap();

    assert_eq!(ctl.members().unwrap().indices(), vec![0, 1]);
    let destroys: Vec<_> = h
        .factory
        .log()
        .into_iter()
        .filter(|l| l.starts_with("destroy"))
        .collect();
    assert_eq!(
        destroys,
        vec!["destroy web-asg-4", "destroy web-asg-3", "destroy web-asg-2"]
    );
}

#[tokio::test]
async fn grow_preserves_low_indices() {
    let h = Harness::new();
    let ctl = h.controller("web-asg");

    ctl.resize(2, true).await.unwrap();
    ctl.resize(5, true).await.unwrap();

    assert_eq!(ctl.members().unwrap().indices(), vec![0, 1, 2, 3, 4]);
    assert_eq!(h.factory.creations_of("web-asg-0"), 1);
    assert_eq!(h.factory.creations_of("web-asg-1"), 1);
}

#[tokio::test]
async fn bounds_rejection_leaves_capacity() {
    let h = Harness::new();
    let group = h.group("small");
    group.controller().resize(3, true).await.unwrap();

    let outcome = group.adjust(AdjustmentRequest::delta(2), false).await.unwrap();

    assert!(matches!(outcome, AdjustOutcome::Rejected { target: 5, .. }));
    assert_eq!(group.capacity().unwrap(), 3);
}

#[tokio::test]
async fn percent_adjustment_truncates() {
    let h = Harness::new();
    let group = h.group("small");
    group.controller().resize(2, true).await.unwrap();

    // 2 + 2 * 75 / 100 = 2 + 1
    let outcome = group.adjust(AdjustmentRequest::percent(75), false).await.unwrap();

    assert_eq!(outcome, AdjustOutcome::Applied { from: 2, to: 3 });
}

#[tokio::test]
async fn cooldown_suppresses_until_window_elapses() {
    let h = Harness::new();
    let group = h.group("web-asg");
    group.handle_create().await.unwrap();

    let first = group.adjust(AdjustmentRequest::delta(1), false).await.unwrap();
    let second = group.adjust(AdjustmentRequest::delta(1), false).await.unwrap();
    assert_eq!(first, AdjustOutcome::Applied { from: 1, to: 2 });
    assert_eq!(second, AdjustOutcome::Suppressed);
    assert_eq!(group.capacity().unwrap(), 2);

    h.clock.advance(61);
    let third = group.adjust(AdjustmentRequest::delta(1), false).await.unwrap();
    assert_eq!(third, AdjustOutcome::Applied { from: 2, to: 3 });
}

#[tokio::test]
async fn initial_creation_uses_min_size() {
    let h = Harness::new();
    let group = h.group("web-asg");

    group.handle_create().await.unwrap();

    assert_eq!(group.members().unwrap().names(), vec!["web-asg-0"]);
}

#[tokio::test]
async fn exact_policy_and_load_balancer_reload() {
    let h = Harness::new();
    let lb = Arc::new(Balancer::default());
    let mut registry = GroupMap::new();
    let group = registry.insert(h.group("web-asg").with_load_balancer(lb.clone()));
    group.handle_create().await.unwrap();

    let policy = ScalingPolicy::new(
        "web-exact",
        &h.config.policies["web-exact"],
        Arc::new(registry),
        h.state.clone(),
        h.clock.clone(),
    );
    let outcome = policy.alarm().await.unwrap();

    assert_eq!(
        outcome,
        AlarmOutcome::Dispatched(AdjustOutcome::Applied { from: 1, to: 3 })
    );
    assert_eq!(group.members().unwrap().indices(), vec![0, 1, 2]);
    let reloads = lb.reloads.lock().unwrap().clone();
    assert_eq!(
        reloads.last().unwrap(),
        &vec![
            "i-web-asg-0".to_string(),
            "i-web-asg-1".to_string(),
            "i-web-asg-2".to_string()
        ]
    );
}

#[tokio::test]
async fn interrupted_grow_resumes_to_target() {
    let h = Harness::new();
    let ctl = h.controller("web-asg");
    *h.factory.fail_after.lock().unwrap() = Some(2);

    assert!(ctl.resize(5, true).await.is_err());
    assert_eq!(ctl.members().unwrap().indices(), vec![0, 1]);

    *h.factory.fail_after.lock().unwrap() = None;
    ctl.resize(5, true).await.unwrap();

    assert_eq!(ctl.members().unwrap().indices(), vec![0, 1, 2, 3, 4]);
    assert_eq!(h.factory.creations_of("web-asg-0"), 1);
    assert_eq!(h.factory.creations_of("web-asg-1"), 1);
}

#[tokio::test]
async fn membership_survives_reopen_in_index_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.redb");
    let factory = Arc::new(CountingFactory::default());
    let template = ScalegridConfig::parse(CONFIG).unwrap().templates["web"].clone();

    {
        let state = StateStore::open(&path).unwrap();
        let ctl = CapacityController::new("g", template.clone(), state, factory.clone());
        ctl.resize(12, true).await.unwrap();
    }

    let state = StateStore::open(&path).unwrap();
    let ctl = CapacityController::new("g", template, state, factory);
    let members = ctl.members().unwrap();
    assert_eq!(members.indices(), (0..12).collect::<Vec<_>>());
    assert_eq!(members.last().unwrap().name, "g-11");
}
