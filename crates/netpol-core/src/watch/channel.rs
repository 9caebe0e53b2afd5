//! Channel-backed watch source
//!
//! Lets embedders drive the controller programmatically: events pushed
//! into the handle come out of the source's stream unchanged. The caller
//! is responsible for honoring the watch contract (initial listing, then
//! one `SyncComplete`, then live changes).

use std::pin::Pin;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::warn;

use crate::traits::{WatchEvent, WatchSource};

/// Sending half handed to the embedder
pub type WatchHandle = mpsc::UnboundedSender<WatchEvent>;

/// A watch source fed through an in-process channel
pub struct ChannelWatchSource {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<WatchEvent>>>,
}

impl ChannelWatchSource {
    /// Create the source and the handle used to feed it
    ///
    /// Dropping the handle ends the stream.
    pub fn new() -> (Self, WatchHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                receiver: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl WatchSource for ChannelWatchSource {
    /// The event stream; a second call yields an already-ended stream
    fn events(&self) -> Pin<Box<dyn Stream<Item = WatchEvent> + Send + 'static>> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match receiver {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => {
                warn!("events() called more than once on ChannelWatchSource");
                Box::pin(tokio_stream::empty())
            }
        }
    }
}
