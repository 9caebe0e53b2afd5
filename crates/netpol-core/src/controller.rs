//! Controller: worker pool and lifecycle
//!
//! The Controller owns the cache, the work queue and the collaborator
//! handles, and wires them into the level-triggered pipeline:
//!
//! ```text
//! ┌──────────────┐   WatchEvent    ┌──────────────┐
//! │ WatchSource  │ ──────────────▶ │ WatchBridge  │── Put/Delete ──▶ PodCache
//! └──────────────┘                 └──────────────┘── Add(key) ───▶ WorkQueue
//!                                                                      │
//!                          ┌───────────────────────────────────────────┘
//!                          ▼
//!                   worker tasks ──▶ Reconciler ──▶ ResourceBackend
//!                          │
//!                          └──▶ RetryPolicy ──▶ requeue | forget | ErrorSink
//! ```
//!
//! Workers start only after the watch source reports initial sync, so the
//! first reconciliation pass sees a complete view. A single shutdown
//! signal stops the bridge, shuts the queue down, and lets every worker
//! finish its in-flight sync before exiting.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bridge::WatchBridge;
use crate::cache::PodCache;
use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::key::EntityKey;
use crate::queue::WorkQueue;
use crate::reconciler::Reconciler;
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::traits::{ErrorSink, ResourceBackend, WatchSource};

/// Events emitted by the controller for external monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Initial sync finished and workers are starting
    Started {
        /// Pods in the cache at startup
        pods_in_cache: usize,
    },

    /// One key converged successfully
    SyncSucceeded {
        /// The converged key
        key: EntityKey,
    },

    /// One sync attempt failed and the key was requeued
    SyncFailed {
        /// The failing key
        key: EntityKey,
        /// Rendered error
        error: String,
        /// Consecutive requeues recorded for the key
        requeues: u32,
    },

    /// A key exhausted its retries and was dropped
    KeyAbandoned {
        /// The abandoned key
        key: EntityKey,
        /// Rendered error
        error: String,
    },

    /// The controller stopped
    Stopped {
        /// Why it stopped
        reason: String,
    },
}

/// A running controller instance
///
/// Holds owned references to the cache, queue and backend client; no
/// process-wide singletons.
pub struct Controller {
    cache: PodCache,
    queue: Arc<WorkQueue>,
    backend: Arc<dyn ResourceBackend>,
    sink: Arc<dyn ErrorSink>,
    retry: RetryPolicy,
    config: ControllerConfig,
    event_tx: mpsc::Sender<ControllerEvent>,
}

impl Controller {
    /// Create a controller
    ///
    /// Returns the controller and the receiver for its monitoring events.
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        sink: Arc<dyn ErrorSink>,
        config: ControllerConfig,
    ) -> Result<(Self, mpsc::Receiver<ControllerEvent>)> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let queue = WorkQueue::with_backoff(config.base_delay(), config.max_delay());

        let controller = Self {
            cache: PodCache::new(),
            queue,
            backend,
            sink,
            retry: RetryPolicy::new(config.max_retries),
            config,
            event_tx,
        };

        Ok((controller, event_rx))
    }

    /// Read-only handle to the controller's cache
    pub fn cache(&self) -> PodCache {
        self.cache.clone()
    }

    /// Run until SIGINT
    pub async fn run(&self, watch_source: Box<dyn WatchSource>) -> Result<()> {
        self.run_internal(watch_source, None).await
    }

    /// Run until the given shutdown signal fires
    ///
    /// Embedders and tests use this for programmatic shutdown; `run()` is
    /// the production entry point and listens for SIGINT instead.
    pub async fn run_with_shutdown(
        &self,
        watch_source: Box<dyn WatchSource>,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<()> {
        self.run_internal(watch_source, Some(shutdown_rx)).await
    }

    async fn run_internal(
        &self,
        watch_source: Box<dyn WatchSource>,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        let mut shutdown: Pin<Box<dyn Future<Output = ()> + Send>> = match shutdown_rx {
            Some(rx) => Box::pin(async move {
                let _ = rx.await;
            }),
            None => Box::pin(async {
                let _ = tokio::signal::ctrl_c().await;
            }),
        };

        let (bridge, synced_rx) = WatchBridge::new(self.cache.clone(), Arc::clone(&self.queue));
        let bridge_task = tokio::spawn(bridge.run(watch_source.events()));

        info!("waiting for initial sync");
        tokio::select! {
            synced = wait_for_sync(synced_rx) => {
                if !synced {
                    bridge_task.abort();
                    self.queue.shut_down();
                    return Err(Error::watch_source("watch stream ended before initial sync"));
                }
            }
            _ = &mut shutdown => {
                info!("shutdown requested before initial sync");
                bridge_task.abort();
                self.queue.shut_down();
                self.emit(ControllerEvent::Stopped {
                    reason: "shutdown before initial sync".to_string(),
                });
                return Ok(());
            }
        }

        let pods_in_cache = self.cache.len().await;
        info!(pods_in_cache, workers = self.config.workers, "initial sync complete; starting workers");
        self.emit(ControllerEvent::Started { pods_in_cache });

        let workers = self.spawn_workers();

        let _ = (&mut shutdown).await;
        info!("shutdown signal received");

        // Stop new notifications first, then let the queue drain. Workers
        // finish their in-flight sync; no reconciliation is interrupted.
        bridge_task.abort();
        self.queue.shut_down();
        for worker in workers {
            if let Err(join_error) = worker.await {
                error!(%join_error, "worker task failed");
            }
        }

        self.emit(ControllerEvent::Stopped {
            reason: "shutdown signal".to_string(),
        });
        info!("controller stopped");
        Ok(())
    }

    fn spawn_workers(&self) -> Vec<JoinHandle<()>> {
        let reconciler = Reconciler::new(self.cache.clone(), Arc::clone(&self.backend));

        (0..self.config.workers)
            .map(|worker_id| {
                let queue = Arc::clone(&self.queue);
                let sink = Arc::clone(&self.sink);
                let reconciler = reconciler.clone();
                let retry = self.retry;
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, queue, reconciler, retry, sink, event_tx).await;
                })
            })
            .collect()
    }

    fn emit(&self, event: ControllerEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full or closed, dropping controller event");
        }
    }
}

/// Resolve once the sync flag is true; `false` if the bridge went away first
async fn wait_for_sync(mut synced_rx: watch::Receiver<bool>) -> bool {
    loop {
        if *synced_rx.borrow() {
            return true;
        }
        if synced_rx.changed().await.is_err() {
            return false;
        }
    }
}

/// One worker: dequeue, reconcile, classify, release — until shutdown
async fn worker_loop(
    worker_id: usize,
    queue: Arc<WorkQueue>,
    reconciler: Reconciler,
    retry: RetryPolicy,
    sink: Arc<dyn ErrorSink>,
    event_tx: mpsc::Sender<ControllerEvent>,
) {
    debug!(worker_id, "worker started");
    while let Some(key) = queue.get().await {
        let result = reconciler.sync(&key).await;
        let outcome = retry.handle(&queue, sink.as_ref(), &key, &result);

        let error_text = result
            .as_ref()
            .err()
            .map(ToString::to_string)
            .unwrap_or_default();
        let event = match outcome {
            RetryOutcome::Succeeded => ControllerEvent::SyncSucceeded { key: key.clone() },
            RetryOutcome::Retrying { requeues } => ControllerEvent::SyncFailed {
                key: key.clone(),
                error: error_text,
                requeues,
            },
            RetryOutcome::Abandoned => ControllerEvent::KeyAbandoned {
                key: key.clone(),
                error: error_text,
            },
        };
        if event_tx.try_send(event).is_err() {
            warn!("event channel full or closed, dropping controller event");
        }

        // Release the key only after the retry decision, so a concurrent
        // re-add stays deferred until this attempt is fully accounted for.
        queue.done(&key);
    }
    debug!(worker_id, "worker exiting");
}
