// # Resource Backend Trait
//
// Defines the interface for mutating the derived NetworkPolicy and the
// source Pod's metadata.
//
// ## Implementations
//
// - In-memory: `netpol_core::backend::MemoryBackend`
// - Future: a real cluster API client
//
// ## Responsibility boundary
//
// Backends execute single-shot calls and report the outcome; everything
// else belongs to the core:
//
// - ✅ Perform the addressed mutation and return success or failure
// - ✅ Report absence of the addressed object as [`Error::NotFound`]
// - ❌ Retry or back off (owned by the retry policy)
// - ❌ Decide between create and update (owned by the reconciler)
// - ❌ Cache state between calls
//
// If a backend implements its own retries, the engine loses control of the
// per-key backoff schedule and shutdown can no longer drain deterministically.
// Return the error; the retry policy will requeue.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::NetworkPolicy;

/// Trait for resource backend implementations
///
/// All methods must be safe to call concurrently from multiple worker
/// tasks. Calls are blocking from the worker's perspective; a slow call
/// occupies one worker without blocking the others. Timeout enforcement,
/// if any, lives in the implementation.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Fetch a NetworkPolicy, `None` if it does not exist
    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<NetworkPolicy>>;

    /// Create a NetworkPolicy that does not yet exist
    async fn create_policy(&self, policy: &NetworkPolicy) -> Result<()>;

    /// Replace an existing NetworkPolicy
    ///
    /// Must fail with [`crate::Error::NotFound`] when the policy does not
    /// exist; the reconciler uses that signal to fall back to create.
    async fn update_policy(&self, policy: &NetworkPolicy) -> Result<()>;

    /// Delete a NetworkPolicy
    ///
    /// Must fail with [`crate::Error::NotFound`] when the policy does not
    /// exist; the reconciler converts that into success (idempotent absence).
    async fn delete_policy(&self, namespace: &str, name: &str) -> Result<()>;

    /// Merge labels into a Pod's metadata
    ///
    /// Label-merge semantics: only the given keys are written, all other
    /// labels are left untouched.
    async fn patch_pod_labels(
        &self,
        namespace: &str,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<()>;
}
