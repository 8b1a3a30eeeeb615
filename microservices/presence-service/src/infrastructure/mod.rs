//! Infrastructure module

pub mod memory;
pub mod presence_store;
pub mod sweeper;

pub use memory::MemoryProbe;
pub use presence_store::{PresenceStore, StoreMetrics};
pub use sweeper::PresenceSweeper;
