//! Retry policy: bounded backoff per failing key
//!
//! Decides, after each sync attempt, whether the key's failure history is
//! cleared, the key is re-enqueued with backoff, or the key is abandoned
//! and reported out of band. This bounds retry amplification: a
//! permanently failing key consumes a fixed number of backoff-spaced
//! attempts and is then surfaced instead of looping forever.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::key::EntityKey;
use crate::queue::WorkQueue;
use crate::traits::ErrorSink;

/// Default retry bound
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// What the policy decided for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Sync succeeded; failure history cleared
    Succeeded,
    /// Sync failed; key re-enqueued with backoff
    Retrying {
        /// Consecutive requeues recorded for the key, this one included
        requeues: u32,
    },
    /// Retry bound exceeded; key dropped and reported
    Abandoned,
}

/// Per-key bounded retry policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// Create a policy with the given retry bound
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Classify one sync result
    ///
    /// Must be called while the worker still holds the key (before
    /// [`WorkQueue::done`]), so a rate-limited re-add lands after the
    /// in-flight processing is released.
    pub fn handle(
        &self,
        queue: &WorkQueue,
        sink: &dyn ErrorSink,
        key: &EntityKey,
        result: &Result<()>,
    ) -> RetryOutcome {
        let error = match result {
            Ok(()) => {
                // Clear the failure history on every success so future
                // updates for this key are not delayed by stale backoff.
                queue.forget(key);
                return RetryOutcome::Succeeded;
            }
            Err(error) => error,
        };

        let requeues = queue.num_requeues(key);
        if requeues < self.max_retries {
            info!(%key, %error, requeues, "sync failed; requeueing with backoff");
            queue.add_rate_limited(key.clone());
            return RetryOutcome::Retrying {
                requeues: requeues + 1,
            };
        }

        queue.forget(key);
        sink.report(key, error);
        warn!(%key, %error, retries = self.max_retries, "retry bound exceeded; dropping key");
        RetryOutcome::Abandoned
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingSink {
        reports: AtomicUsize,
    }

    impl ErrorSink for CountingSink {
        fn report(&self, _key: &EntityKey, _error: &Error) {
            self.reports.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn key() -> EntityKey {
        EntityKey::new("default", "web")
    }

    #[tokio::test]
    async fn success_clears_history() {
        let queue = WorkQueue::with_backoff(Duration::from_millis(1), Duration::from_secs(1));
        let sink = CountingSink::default();
        let policy = RetryPolicy::new(2);

        queue.add_rate_limited(key());
        assert_eq!(queue.num_requeues(&key()), 1);

        let outcome = policy.handle(&queue, &sink, &key(), &Ok(()));
        assert_eq!(outcome, RetryOutcome::Succeeded);
        assert_eq!(queue.num_requeues(&key()), 0);
        assert_eq!(sink.reports.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_requeue_until_the_bound_then_abandon_once() {
        let queue = WorkQueue::with_backoff(Duration::from_millis(1), Duration::from_secs(1));
        let sink = CountingSink::default();
        let policy = RetryPolicy::new(2);
        let failed: Result<()> = Err(Error::backend("boom"));

        assert_eq!(
            policy.handle(&queue, &sink, &key(), &failed),
            RetryOutcome::Retrying { requeues: 1 }
        );
        assert_eq!(
            policy.handle(&queue, &sink, &key(), &failed),
            RetryOutcome::Retrying { requeues: 2 }
        );
        assert_eq!(
            policy.handle(&queue, &sink, &key(), &failed),
            RetryOutcome::Abandoned
        );

        assert_eq!(sink.reports.load(Ordering::SeqCst), 1);
        // State cleared: a later failure starts a fresh retry cycle.
        assert_eq!(queue.num_requeues(&key()), 0);
        assert_eq!(
            policy.handle(&queue, &sink, &key(), &failed),
            RetryOutcome::Retrying { requeues: 1 }
        );
    }
}
