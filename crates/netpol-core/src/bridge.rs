//! Watch bridge: notifications → cache mutations + queue work
//!
//! Translates each [`WatchEvent`] into a cache write followed by an
//! enqueue of the affected key. No business logic lives here; a
//! notification whose key cannot be derived is logged and dropped, since
//! it is not a queueable unit of work.

use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::cache::PodCache;
use crate::queue::WorkQueue;
use crate::traits::WatchEvent;

/// Bridges a watch source's event stream into the cache and queue
pub struct WatchBridge {
    cache: PodCache,
    queue: Arc<WorkQueue>,
    synced_tx: watch::Sender<bool>,
}

impl WatchBridge {
    /// Create a bridge and the receiver half of its initial-sync flag
    ///
    /// The receiver yields `true` once the source's initial listing has
    /// been fully applied to the cache.
    pub fn new(cache: PodCache, queue: Arc<WorkQueue>) -> (Self, watch::Receiver<bool>) {
        let (synced_tx, synced_rx) = watch::channel(false);
        (
            Self {
                cache,
                queue,
                synced_tx,
            },
            synced_rx,
        )
    }

    /// Apply a single notification
    pub async fn handle(&self, event: WatchEvent) {
        match event {
            WatchEvent::Added(pod) | WatchEvent::Updated(pod) => {
                let key = pod.key();
                self.cache.insert(pod).await;
                self.queue.add(key);
            }
            WatchEvent::Removed(removed) => match removed.key() {
                Ok(key) => {
                    self.cache.remove(&key).await;
                    self.queue.add(key);
                }
                Err(error) => {
                    warn!(%error, "dropping notification with underivable key");
                }
            },
            WatchEvent::SyncComplete => {
                debug!("initial listing applied");
                let _ = self.synced_tx.send(true);
            }
        }
    }

    /// Consume a watch stream until it ends
    pub async fn run(self, mut events: Pin<Box<dyn Stream<Item = WatchEvent> + Send + 'static>>) {
        while let Some(event) = events.next().await {
            self.handle(event).await;
        }
        debug!("watch stream ended; bridge exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::EntityKey;
    use crate::model::Pod;
    use crate::traits::Removed;
    use std::collections::BTreeMap;

    fn pod(name: &str) -> Pod {
        Pod {
            namespace: "default".to_string(),
            name: name.to_string(),
            labels: BTreeMap::new(),
            containers: Vec::new(),
        }
    }

    fn bridge() -> (WatchBridge, PodCache, Arc<WorkQueue>, watch::Receiver<bool>) {
        let cache = PodCache::new();
        let queue = WorkQueue::new();
        let (bridge, synced) = WatchBridge::new(cache.clone(), Arc::clone(&queue));
        (bridge, cache, queue, synced)
    }

    #[tokio::test]
    async fn added_populates_cache_and_queue() {
        let (bridge, cache, queue, _) = bridge();
        bridge.handle(WatchEvent::Added(pod("web"))).await;

        let key = EntityKey::new("default", "web");
        assert!(cache.contains(&key).await);
        assert_eq!(queue.get().await, Some(key));
    }

    #[tokio::test]
    async fn removed_tombstone_clears_cache_and_enqueues() {
        let (bridge, cache, queue, _) = bridge();
        bridge.handle(WatchEvent::Added(pod("web"))).await;
        bridge
            .handle(WatchEvent::Removed(Removed::Tombstone {
                key: "default/web".to_string(),
            }))
            .await;

        let key = EntityKey::new("default", "web");
        assert!(!cache.contains(&key).await);
        // Deduplicated: the add and the remove collapse to one queue entry.
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn malformed_tombstone_is_dropped() {
        let (bridge, _cache, queue, _) = bridge();
        bridge
            .handle(WatchEvent::Removed(Removed::Tombstone {
                key: "garbage".to_string(),
            }))
            .await;
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn sync_complete_flips_the_flag() {
        let (bridge, _cache, _queue, synced) = bridge();
        assert!(!*synced.borrow());
        bridge.handle(WatchEvent::SyncComplete).await;
        assert!(*synced.borrow());
    }
}
