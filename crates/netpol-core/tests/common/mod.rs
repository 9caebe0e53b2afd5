//! Test doubles and common utilities for architecture contract tests
//!
//! Minimal instrumented doubles: they count every backend call, record the
//! operations in order, and can be switched into failure modes, without
//! implementing real functionality beyond what the contracts need.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netpol_core::error::{Error, Result};
use netpol_core::traits::{ErrorSink, ResourceBackend};
use netpol_core::{
    Container, ContainerPort, ControllerConfig, EntityKey, NetworkPolicy, Pod, Protocol,
};

/// One recorded backend operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOp {
    Get(String, String),
    Create(String, String),
    Update(String, String),
    Delete(String, String),
    Patch(String, String, BTreeMap<String, String>),
}

/// A ResourceBackend that tracks every call
#[derive(Default)]
pub struct MockBackend {
    policies: Mutex<HashMap<(String, String), NetworkPolicy>>,
    ops: Mutex<Vec<BackendOp>>,
    /// When set, every mutating call fails with a backend error
    pub fail_all: AtomicBool,
    /// When set, update calls report NotFound, as if the policy vanished
    /// between the existence check and the update
    pub update_not_found: AtomicBool,
    /// Extra latency injected into update calls, for in-flight tests
    pub update_delay: Mutex<Duration>,
    pub get_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub patch_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ops(&self) -> Vec<BackendOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn set_update_delay(&self, delay: Duration) {
        *self.update_delay.lock().unwrap() = delay;
    }

    pub fn policy(&self, namespace: &str, name: &str) -> Option<NetworkPolicy> {
        self.policies
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn insert_policy(&self, policy: NetworkPolicy) {
        self.policies
            .lock()
            .unwrap()
            .insert((policy.namespace.clone(), policy.name.clone()), policy);
    }

    fn record(&self, op: BackendOp) {
        self.ops.lock().unwrap().push(op);
    }

    fn failing(&self) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(Error::backend("injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl ResourceBackend for MockBackend {
    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<NetworkPolicy>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.record(BackendOp::Get(namespace.to_string(), name.to_string()));
        self.failing()?;
        Ok(self.policy(namespace, name))
    }

    async fn create_policy(&self, policy: &NetworkPolicy) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.record(BackendOp::Create(
            policy.namespace.clone(),
            policy.name.clone(),
        ));
        self.failing()?;
        self.insert_policy(policy.clone());
        Ok(())
    }

    async fn update_policy(&self, policy: &NetworkPolicy) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.record(BackendOp::Update(
            policy.namespace.clone(),
            policy.name.clone(),
        ));
        let delay = *self.update_delay.lock().unwrap();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        self.failing()?;
        if self.update_not_found.load(Ordering::SeqCst) {
            return Err(Error::not_found(
                "NetworkPolicy",
                &policy.namespace,
                &policy.name,
            ));
        }
        let mut policies = self.policies.lock().unwrap();
        let id = (policy.namespace.clone(), policy.name.clone());
        match policies.get_mut(&id) {
            Some(existing) => {
                *existing = policy.clone();
                Ok(())
            }
            None => Err(Error::not_found(
                "NetworkPolicy",
                &policy.namespace,
                &policy.name,
            )),
        }
    }

    async fn delete_policy(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.record(BackendOp::Delete(namespace.to_string(), name.to_string()));
        self.failing()?;
        match self
            .policies
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
        {
            Some(_) => Ok(()),
            None => Err(Error::not_found("NetworkPolicy", namespace, name)),
        }
    }

    async fn patch_pod_labels(
        &self,
        namespace: &str,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        self.record(BackendOp::Patch(
            namespace.to_string(),
            name.to_string(),
            labels.clone(),
        ));
        self.failing()
    }
}

/// An ErrorSink that collects every report
#[derive(Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<(EntityKey, String)>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<(EntityKey, String)> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, key: &EntityKey, error: &Error) {
        self.reports
            .lock()
            .unwrap()
            .push((key.clone(), error.to_string()));
    }
}

/// A Pod with the given (protocol, port) declarations, one container each
pub fn pod_with_ports(namespace: &str, name: &str, ports: &[(Protocol, u16)]) -> Pod {
    Pod {
        namespace: namespace.to_string(),
        name: name.to_string(),
        labels: BTreeMap::new(),
        containers: vec![Container {
            name: "main".to_string(),
            ports: ports
                .iter()
                .map(|&(protocol, container_port)| ContainerPort {
                    protocol,
                    container_port,
                })
                .collect(),
        }],
    }
}

/// A controller config tuned for fast tests
pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        workers: 2,
        max_retries: 5,
        base_delay_ms: 1,
        max_delay_secs: 1,
        event_channel_capacity: 256,
    }
}
