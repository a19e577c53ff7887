//! Pending-queue backends.

pub mod memory;

pub use memory::InMemoryLanes;
