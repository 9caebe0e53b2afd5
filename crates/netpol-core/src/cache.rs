//! Local indexed cache of Pod snapshots
//!
//! A thread-safe key → Pod store kept in sync with the watch source.
//! Written only by the watch bridge; read by workers. The only consistency
//! guarantee between a write and a subsequent read from another task is
//! eventual visibility — the reconciler is built to tolerate acting on a
//! stale snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::key::EntityKey;
use crate::model::Pod;

/// Cloneable handle to the shared Pod cache
#[derive(Debug, Clone, Default)]
pub struct PodCache {
    inner: Arc<RwLock<HashMap<EntityKey, Pod>>>,
}

impl PodCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Point lookup, returning a cloned snapshot
    pub async fn get(&self, key: &EntityKey) -> Option<Pod> {
        let guard = self.inner.read().await;
        guard.get(key).cloned()
    }

    /// Whether a key is present
    pub async fn contains(&self, key: &EntityKey) -> bool {
        let guard = self.inner.read().await;
        guard.contains_key(key)
    }

    /// Insert or replace a Pod snapshot under its own key
    pub async fn insert(&self, pod: Pod) {
        let mut guard = self.inner.write().await;
        guard.insert(pod.key(), pod);
    }

    /// Remove a key
    pub async fn remove(&self, key: &EntityKey) {
        let mut guard = self.inner.write().await;
        guard.remove(key);
    }

    /// Number of cached Pods
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
