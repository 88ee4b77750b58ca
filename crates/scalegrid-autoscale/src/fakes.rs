//! In-memory collaborators for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use scalegrid_core::config::MemberTemplate;

use crate::member::{LoadBalancerBinding, MemberFactory, MemberSpec};

pub fn template() -> MemberTemplate {
    MemberTemplate {
        image_id: "fedora-20".to_string(),
        instance_type: "m1.small".to_string(),
        key_name: None,
        user_data: None,
        security_groups: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Create(String),
    Destroy(String),
}

#[derive(Default)]
pub struct RecordingFactory {
    pub ops: Mutex<Vec<Op>>,
    pub fail_create: Mutex<HashSet<String>>,
    pub fail_destroy: Mutex<HashSet<String>>,
    pub loud_calls: Mutex<u32>,
}

impl RecordingFactory {
    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Create(n) => Some(n),
                Op::Destroy(_) => None,
            })
            .collect()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Destroy(n) => Some(n),
                Op::Create(_) => None,
            })
            .collect()
    }

    pub fn fail_create_of(&self, name: &str) {
        self.fail_create.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_destroy_of(&self, name: &str) {
        self.fail_destroy.lock().unwrap().insert(name.to_string());
    }
}

#[async_trait]
impl MemberFactory for RecordingFactory {
    async fn create(&self, spec: &MemberSpec<'_>) -> Result<String, String> {
        if !spec.silent {
            *self.loud_calls.lock().unwrap() += 1;
        }
        if self.fail_create.lock().unwrap().contains(spec.name) {
            return Err(format!("quota exceeded creating {}", spec.name));
        }
        self.ops.lock().unwrap().push(Op::Create(spec.name.to_string()));
        Ok(format!("ref-{}", spec.name))
    }

    async fn destroy(&self, spec: &MemberSpec<'_>) -> Result<(), String> {
        self.ops.lock().unwrap().push(Op::Destroy(spec.name.to_string()));
        if self.fail_destroy.lock().unwrap().contains(spec.name) {
            return Err(format!("{} is stuck", spec.name));
        }
        Ok(())
    }
}

pub struct RecordingBalancer {
    pub name: String,
    pub reloads: Mutex<Vec<Vec<String>>>,
    pub fail: bool,
}

impl RecordingBalancer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reloads: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn reloads(&self) -> Vec<Vec<String>> {
        self.reloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl LoadBalancerBinding for RecordingBalancer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reload(&self, ref_ids: &[String]) -> Result<(), String> {
        self.reloads.lock().unwrap().push(ref_ids.to_vec());
        if self.fail {
            return Err("config push rejected".to_string());
        }
        Ok(())
    }
}
