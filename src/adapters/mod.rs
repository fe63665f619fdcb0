// Adapters layer: concrete implementations of the domain ports.

pub mod memory;
pub mod snapshot;
pub mod storage;
