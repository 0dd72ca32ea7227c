//! Storage backends implementing the domain ports.

pub mod in_memory;
pub mod locks;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod staging;
