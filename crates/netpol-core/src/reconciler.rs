//! Reconciler: the controller's business logic
//!
//! Maps (key, current cache state) to the desired derived state and issues
//! the backend calls that converge reality to it. Deliberately free of
//! retry logic: every backend failure is returned unmodified for the retry
//! policy to classify. The single exception is absence on delete or on a
//! racing update, which already is the converged state.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::PodCache;
use crate::error::Result;
use crate::key::EntityKey;
use crate::model::{NetworkPolicy, MARKER_LABEL};
use crate::traits::ResourceBackend;

/// Converges one entity key per call
#[derive(Clone)]
pub struct Reconciler {
    cache: PodCache,
    backend: Arc<dyn ResourceBackend>,
}

impl Reconciler {
    /// Create a reconciler over the given cache and backend
    pub fn new(cache: PodCache, backend: Arc<dyn ResourceBackend>) -> Self {
        Self { cache, backend }
    }

    /// Converge the derived state for one key
    ///
    /// Safe to call repeatedly with no intervening change: the second call
    /// performs a no-op update and nothing else.
    pub async fn sync(&self, key: &EntityKey) -> Result<()> {
        let Some(pod) = self.cache.get(key).await else {
            return self.delete_policy(key).await;
        };

        let policy = NetworkPolicy::for_pod(&pod);

        // Existence check first; error-driven create-on-update-failure
        // would mask genuine update failures. The NotFound fallback only
        // covers an update racing a concurrent delete.
        match self.backend.get_policy(&policy.namespace, &policy.name).await? {
            Some(_) => {
                debug!(%key, policy = %policy.name, "updating policy");
                match self.backend.update_policy(&policy).await {
                    Err(error) if error.is_not_found() => {
                        info!(%key, policy = %policy.name, "policy vanished during update; creating");
                        self.backend.create_policy(&policy).await?;
                    }
                    other => other?,
                }
            }
            None => {
                info!(%key, policy = %policy.name, "creating policy");
                self.backend.create_policy(&policy).await?;
            }
        }

        // Guarded marker patch: re-applying when the label is already
        // present must be a no-op, so check before patching.
        if !pod.has_marker_label() {
            info!(%key, "adding marker label to pod");
            let mut labels = BTreeMap::new();
            labels.insert(MARKER_LABEL.to_string(), policy.name.clone());
            self.backend
                .patch_pod_labels(&pod.namespace, &pod.name, &labels)
                .await?;
        }

        Ok(())
    }

    /// Delete the derived policy for a key whose source Pod is gone
    ///
    /// Deleting an already-absent policy is success, not an error.
    async fn delete_policy(&self, key: &EntityKey) -> Result<()> {
        let name = key.policy_name();
        debug!(%key, policy = %name, "source pod gone; deleting policy");
        match self.backend.delete_policy(&key.namespace, &name).await {
            Err(error) if error.is_not_found() => Ok(()),
            other => other,
        }
    }
}
