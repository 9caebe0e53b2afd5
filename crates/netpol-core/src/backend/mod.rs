//! Built-in resource backend implementations
//!
//! - [`MemoryBackend`]: in-memory, for embedding, demos and tests

pub mod memory;

pub use memory::MemoryBackend;
