// # netpol-core
//
// Core library for the netpol level-triggered reconciliation controller.
//
// ## Architecture Overview
//
// The controller observes a stream of Pod change notifications, keeps a
// locally consistent cache of Pod snapshots, and drives one NetworkPolicy
// per Pod toward the state computed from that Pod's declared container
// ports:
//
// - **WatchSource**: Trait delivering add/update/remove notifications plus
//   an initial-sync marker
// - **ResourceBackend**: Trait for creating/updating/deleting the derived
//   NetworkPolicy and label-patching the source Pod
// - **ErrorSink**: Trait receiving keys abandoned after the retry bound
// - **PodCache**: Thread-safe key → Pod snapshot store
// - **WorkQueue**: Deduplicating, rate-limited queue of entity keys
// - **Controller**: Worker pool draining the queue through the Reconciler
//   and RetryPolicy
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Reconciliation logic never retries; retry
//    policy never reconciles
// 2. **Level-Triggered**: Workers act on the latest cached snapshot, not on
//    the notification that woke them
// 3. **Idempotency**: Every backend mutation is safe to repeat; absence on
//    delete/update is convergence, not failure
// 4. **Library-First**: The controller can be embedded and driven entirely
//    through the collaborator traits

pub mod backend;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod key;
pub mod model;
pub mod queue;
pub mod reconciler;
pub mod retry;
pub mod sink;
pub mod traits;
pub mod watch;

// Re-export core types for convenience
pub use backend::MemoryBackend;
pub use bridge::WatchBridge;
pub use cache::PodCache;
pub use config::ControllerConfig;
pub use controller::{Controller, ControllerEvent};
pub use error::{Error, Result};
pub use key::EntityKey;
pub use model::{Container, ContainerPort, NetworkPolicy, Pod, Protocol, MARKER_LABEL};
pub use queue::WorkQueue;
pub use reconciler::Reconciler;
pub use retry::{RetryOutcome, RetryPolicy};
pub use sink::TracingErrorSink;
pub use traits::{ErrorSink, Removed, ResourceBackend, WatchEvent, WatchSource};
pub use watch::{ChannelWatchSource, channel::WatchHandle};
