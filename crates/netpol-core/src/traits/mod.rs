//! Collaborator traits for the controller
//!
//! This module defines the abstract interfaces the core consumes.
//!
//! - [`WatchSource`]: Deliver Pod change notifications and an initial-sync
//!   marker
//! - [`ResourceBackend`]: Mutate the derived NetworkPolicy and the source
//!   Pod's labels
//! - [`ErrorSink`]: Receive keys abandoned after the retry bound

pub mod error_sink;
pub mod resource_backend;
pub mod watch_source;

pub use error_sink::ErrorSink;
pub use resource_backend::ResourceBackend;
pub use watch_source::{Removed, WatchEvent, WatchSource};
