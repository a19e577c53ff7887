//! Runtime-agnostic task spawning.

use std::future::Future;

/// Abstraction for spawning background futures on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
