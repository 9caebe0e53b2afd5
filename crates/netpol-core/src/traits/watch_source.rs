// # Watch Source Trait
//
// Defines the interface for observing Pod changes.
//
// ## Implementations
//
// - Channel-backed (embedding, tests): `netpol_core::watch::ChannelWatchSource`
// - Newline-delimited JSON (files, FIFOs, stdin): `netpol-watch-json` crate
// - Future: a real cluster list/watch client
//
// ## Contract
//
// A source must deliver the initial full listing as `Added` events followed
// by exactly one `SyncComplete` marker; the controller does not start any
// worker before that marker arrives. After the marker, `Added`/`Updated`/
// `Removed` events follow in observation order. Removal notifications may
// carry only a terminal identity (a tombstone) instead of a full snapshot;
// key derivation handles both shapes identically.

use std::pin::Pin;
use std::str::FromStr;

use tokio_stream::Stream;

use crate::error::Result;
use crate::key::EntityKey;
use crate::model::Pod;

/// A removal notification
///
/// Sources that lose track of an object before its deletion can only report
/// the identity they last saw. Both shapes resolve to the same key as the
/// add/update path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removed {
    /// Full terminal snapshot of the removed Pod
    Object(Pod),
    /// Identity-only tombstone, in `"namespace/name"` form
    Tombstone {
        /// Stringified entity key of the removed Pod
        key: String,
    },
}

impl Removed {
    /// Derive the entity key of the removed Pod
    ///
    /// Fails only for a tombstone whose key does not split into namespace
    /// and name; such a notification is not a queueable unit of work and is
    /// dropped by the watch bridge.
    pub fn key(&self) -> Result<EntityKey> {
        match self {
            Removed::Object(pod) => Ok(pod.key()),
            Removed::Tombstone { key } => EntityKey::from_str(key),
        }
    }
}

/// A notification from a watch source
///
/// A closed set of variants dispatched through a single handler in the
/// watch bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A Pod was observed for the first time (or re-listed)
    Added(Pod),
    /// A previously observed Pod changed
    Updated(Pod),
    /// A Pod was removed
    Removed(Removed),
    /// The initial listing has been fully delivered
    SyncComplete,
}

/// Trait for watch source implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Responsibility boundary
///
/// Sources are observers, not decision-makers:
///
/// - ✅ Translate an external notification mechanism into [`WatchEvent`]s
/// - ✅ Spawn a task only to pump the underlying mechanism (cancellation-safe)
/// - ❌ Touch the cache or queue (owned by the watch bridge)
/// - ❌ Implement retry or backoff (owned by the retry policy)
/// - ❌ Decide whether a change warrants reconciliation
pub trait WatchSource: Send + Sync {
    /// The notification stream
    ///
    /// Yields the initial listing, the sync marker, then live changes. The
    /// stream ending is terminal for the controller: before initial sync it
    /// is an error, after it no further work arrives.
    fn events(&self) -> Pin<Box<dyn Stream<Item = WatchEvent> + Send + 'static>>;
}
