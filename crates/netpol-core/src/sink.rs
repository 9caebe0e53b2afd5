//! Built-in error sinks

use tracing::error;

use crate::error::Error;
use crate::key::EntityKey;
use crate::traits::ErrorSink;

/// Error sink that logs abandoned keys through tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, key: &EntityKey, error: &Error) {
        error!(%key, %error, "key abandoned after exhausting retries");
    }
}
