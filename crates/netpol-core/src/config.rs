//! Configuration types for the controller

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Number of worker tasks draining the queue
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum consecutive retries for a failing key before it is
    /// abandoned and reported
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds
    ///
    /// A key's n-th consecutive requeue waits `base_delay_ms * 2^n`,
    /// capped at `max_delay_secs`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff cap in seconds
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    /// Capacity of the controller event channel
    ///
    /// When full, new events are dropped (with a warning log). This keeps
    /// a slow event consumer from stalling workers.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ControllerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.workers == 0 {
            return Err(crate::Error::config("workers must be at least 1"));
        }
        if self.base_delay_ms == 0 {
            return Err(crate::Error::config("base_delay_ms must be greater than 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "event_channel_capacity must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Backoff base delay as a duration
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Backoff cap as a duration
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_secs: default_max_delay_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_workers() -> usize {
    2
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    5
}

fn default_max_delay_secs() -> u64 {
    1000
}

fn default_event_channel_capacity() -> usize {
    256
}
