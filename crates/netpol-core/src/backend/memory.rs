// # Memory Backend
//
// In-memory implementation of ResourceBackend.
//
// ## Purpose
//
// Backs the controller with plain maps instead of a cluster API. Useful
// for embedding, demos, and any deployment where the derived state does
// not need to outlive the process.
//
// ## Fidelity
//
// Mirrors the error contract of a real backend:
// - update/delete of an absent policy fail with NotFound
// - create of an existing policy fails (no silent upsert)
// - label patches merge only the provided keys

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::NetworkPolicy;
use crate::traits::ResourceBackend;

#[derive(Debug, Default)]
struct Inner {
    /// (namespace, name) → policy
    policies: HashMap<(String, String), NetworkPolicy>,
    /// (namespace, name) → pod labels, as far as patches have shaped them
    pod_labels: HashMap<(String, String), BTreeMap<String, String>>,
}

/// In-memory resource backend
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBackend {
    /// Create a new empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of policies currently held
    pub async fn policy_count(&self) -> usize {
        self.inner.read().await.policies.len()
    }

    /// Labels recorded for a pod via patches, if any
    pub async fn pod_labels(&self, namespace: &str, name: &str) -> Option<BTreeMap<String, String>> {
        let guard = self.inner.read().await;
        guard
            .pod_labels
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ResourceBackend for MemoryBackend {
    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<NetworkPolicy>> {
        let guard = self.inner.read().await;
        Ok(guard
            .policies
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_policy(&self, policy: &NetworkPolicy) -> Result<()> {
        let mut guard = self.inner.write().await;
        let id = (policy.namespace.clone(), policy.name.clone());
        if guard.policies.contains_key(&id) {
            return Err(Error::backend(format!(
                "NetworkPolicy {}/{} already exists",
                policy.namespace, policy.name
            )));
        }
        guard.policies.insert(id, policy.clone());
        Ok(())
    }

    async fn update_policy(&self, policy: &NetworkPolicy) -> Result<()> {
        let mut guard = self.inner.write().await;
        let id = (policy.namespace.clone(), policy.name.clone());
        match guard.policies.get_mut(&id) {
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
        let mut guard = self.inner.write().await;
        match guard
            .policies
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
        let mut guard = self.inner.write().await;
        let entry = guard
            .pod_labels
            .entry((namespace.to_string(), name.to_string()))
            .or_default();
        for (k, v) in labels {
            entry.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}
