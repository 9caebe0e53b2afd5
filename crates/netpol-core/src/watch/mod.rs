//! Built-in watch source implementations
//!
//! - [`ChannelWatchSource`]: channel-backed, for embedding and tests

pub mod channel;

pub use channel::ChannelWatchSource;
