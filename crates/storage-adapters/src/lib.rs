//! # storage-adapters
//!
//! Concrete implementations of the storage-facing ports: message and
//! moderation-event logs, key-value state stores and clocks.

pub mod clock;
pub mod kv;
pub mod memory_log;

pub use clock::{ManualClock, SystemClock};
pub use kv::{JsonFileKeyValueStore, MemoryKeyValueStore};
pub use memory_log::{MemoryMessageLog, MemoryModerationEventLog};
