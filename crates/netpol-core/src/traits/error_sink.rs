//! Error sink trait
//!
//! When the retry policy gives up on a key, the failure is surfaced through
//! this out-of-band channel for operator visibility instead of looping in
//! the queue forever.

use crate::error::Error;
use crate::key::EntityKey;

/// Trait for abandoned-key reporting
///
/// Fire-and-forget: there is no response contract and no error path.
/// Implementations must be thread-safe; workers report from multiple tasks.
pub trait ErrorSink: Send + Sync {
    /// Report a key abandoned after exhausting its retries
    fn report(&self, key: &EntityKey, error: &Error);
}
