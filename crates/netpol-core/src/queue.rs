//! Deduplicating, rate-limited work queue of entity keys
//!
//! Guarantees the concurrency properties the controller is built on:
//!
//! - a key never appears twice in the ready list;
//! - at most one worker holds a given key at any instant;
//! - a key re-added while in flight is marked dirty and re-queued exactly
//!   once when the holder calls [`WorkQueue::done`];
//! - after [`WorkQueue::shut_down`], [`WorkQueue::get`] drains the
//!   remaining ready items and then reports shutdown.
//!
//! Failed keys are re-added through [`WorkQueue::add_rate_limited`] with a
//! per-key exponential backoff, independent of other keys' backoff state.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::Notify;

use crate::key::EntityKey;

/// Default backoff base delay (matches common controller workqueue tuning)
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(5);
/// Default backoff cap
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(1000);

struct QueueState {
    /// Keys ready to be handed to a worker, FIFO
    ready: VecDeque<EntityKey>,
    /// Keys that need processing: ready plus re-added-while-processing
    dirty: HashSet<EntityKey>,
    /// Keys currently held by a worker
    processing: HashSet<EntityKey>,
    shutting_down: bool,
}

/// The work queue, shared behind an `Arc`
pub struct WorkQueue {
    state: Mutex<QueueState>,
    /// Consecutive-failure counters, per key
    requeues: Mutex<HashMap<EntityKey, u32>>,
    wakeup: Notify,
    base_delay: Duration,
    max_delay: Duration,
    /// Self-handle for the delayed-add timer tasks
    this: Weak<WorkQueue>,
}

impl WorkQueue {
    /// Create a queue with default backoff tuning
    pub fn new() -> Arc<Self> {
        Self::with_backoff(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }

    /// Create a queue with explicit backoff tuning
    pub fn with_backoff(base_delay: Duration, max_delay: Duration) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            state: Mutex::new(QueueState {
                ready: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                shutting_down: false,
            }),
            requeues: Mutex::new(HashMap::new()),
            wakeup: Notify::new(),
            base_delay,
            max_delay,
            this: this.clone(),
        })
    }

    fn locked(&self) -> MutexGuard<'_, QueueState> {
        // A poisoning panic never leaves the state partially mutated here
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue a key for processing
    ///
    /// No-op while shutting down, and no-op if the key is already pending.
    /// If the key is currently held by a worker it is only marked dirty and
    /// will be re-queued on the matching [`WorkQueue::done`].
    pub fn add(&self, key: EntityKey) {
        let mut state = self.locked();
        if state.shutting_down {
            return;
        }
        if state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            return;
        }
        state.ready.push_back(key);
        drop(state);
        self.wakeup.notify_one();
    }

    /// Dequeue the next key, waiting until one is ready
    ///
    /// Returns `None` once the queue is shut down and drained. The returned
    /// key is held by the caller until it calls [`WorkQueue::done`].
    pub async fn get(&self) -> Option<EntityKey> {
        loop {
            let notified = self.wakeup.notified();
            tokio::pin!(notified);
            // Register for wakeups before checking state, so an add or
            // shutdown between the check and the await is never missed.
            notified.as_mut().enable();
            {
                let mut state = self.locked();
                if let Some(key) = state.ready.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark a key's processing complete
    ///
    /// If the key was re-added while in flight it goes straight back onto
    /// the ready list, exactly once.
    pub fn done(&self, key: &EntityKey) {
        let mut state = self.locked();
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.ready.push_back(key.clone());
            drop(state);
            self.wakeup.notify_one();
        }
    }

    /// Re-enqueue a failing key after its backoff delay
    ///
    /// The delay grows exponentially with this key's consecutive requeue
    /// count, capped at the configured maximum.
    pub fn add_rate_limited(&self, key: EntityKey) {
        let delay = self.next_delay(&key);
        let Some(queue) = self.this.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    /// Clear a key's requeue history
    pub fn forget(&self, key: &EntityKey) {
        let mut requeues = self.requeues.lock().unwrap_or_else(|e| e.into_inner());
        requeues.remove(key);
    }

    /// Consecutive requeues recorded for a key since its last forget
    pub fn num_requeues(&self, key: &EntityKey) -> u32 {
        let requeues = self.requeues.lock().unwrap_or_else(|e| e.into_inner());
        requeues.get(key).copied().unwrap_or(0)
    }

    /// Stop accepting new work
    ///
    /// Pending ready items remain dequeueable; once drained, `get` reports
    /// shutdown to every waiter.
    pub fn shut_down(&self) {
        let mut state = self.locked();
        state.shutting_down = true;
        drop(state);
        self.wakeup.notify_waiters();
    }

    /// Whether shutdown has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.locked().shutting_down
    }

    /// Number of keys in the ready list
    pub fn len(&self) -> usize {
        self.locked().ready.len()
    }

    /// Whether the ready list is empty
    pub fn is_empty(&self) -> bool {
        self.locked().ready.is_empty()
    }

    fn next_delay(&self, key: &EntityKey) -> Duration {
        let mut requeues = self.requeues.lock().unwrap_or_else(|e| e.into_inner());
        let count = requeues.entry(key.clone()).or_insert(0);
        let exponent = (*count).min(31);
        *count += 1;
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}
