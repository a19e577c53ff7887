//! Infrastructure adapters backing the dispatch core.

pub mod queue;
pub use queue::InMemoryLanes;
