//! Builders to construct dispatchers from configuration.

use crate::config::DispatchConfig;
use crate::core::{Dispatcher, DispatchError, EventSink, PendingQueue};
use crate::infra::queue::InMemoryLanes;
use crate::util::serde::{OrderId, Timestamp};

/// Build a dispatcher from configuration using the provided queue factory.
///
/// # Errors
///
/// Invalid configuration, or whatever the factory reports.
pub fn build_dispatcher<Q, FQ>(
    cfg: &DispatchConfig,
    queue_factory: FQ,
) -> Result<Dispatcher<Q>, DispatchError>
where
    Q: PendingQueue<OrderId>,
    FQ: FnOnce(&DispatchConfig) -> Result<Q, DispatchError>,
{
    cfg.validate()
        .map_err(|e| DispatchError::InvalidConfig(format!("config invalid: {e}")))?;
    let queue = queue_factory(cfg)?;
    Dispatcher::with_queue(cfg.clone(), queue)
}

/// Fluent construction of a [`Dispatcher`] with optional subscriber, fixed
/// epoch and a starting set of workers.
pub struct DispatcherBuilder {
    config: DispatchConfig,
    epoch_ms: Option<Timestamp>,
    initial_workers: usize,
    subscriber: Option<Box<dyn EventSink>>,
}

impl DispatcherBuilder {
    /// Start from `config`.
    #[must_use]
    pub const fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            epoch_ms: None,
            initial_workers: 0,
            subscriber: None,
        }
    }

    /// Anchor timestamps at `epoch_ms`.
    #[must_use]
    pub fn with_epoch(mut self, epoch_ms: Timestamp) -> Self {
        self.epoch_ms = Some(epoch_ms);
        self
    }

    /// Add `count` workers once built.
    #[must_use]
    pub fn with_initial_workers(mut self, count: usize) -> Self {
        self.initial_workers = count;
        self
    }

    /// Register the event subscriber before any worker is added.
    #[must_use]
    pub fn with_subscriber<S: EventSink + 'static>(mut self, sink: S) -> Self {
        self.subscriber = Some(Box::new(sink));
        self
    }

    /// Build over the in-memory two-lane queue.
    ///
    /// # Errors
    ///
    /// Invalid configuration.
    pub fn build(self) -> Result<Dispatcher<InMemoryLanes<OrderId>>, DispatchError> {
        self.build_with_queue(InMemoryLanes::new())
    }

    /// Build over a caller-supplied queue.
    ///
    /// # Errors
    ///
    /// Invalid configuration.
    pub fn build_with_queue<Q: PendingQueue<OrderId>>(
        self,
        queue: Q,
    ) -> Result<Dispatcher<Q>, DispatchError> {
        let mut dispatcher = build_dispatcher(&self.config, |_| Ok(queue))?;
        if let Some(epoch) = self.epoch_ms {
            dispatcher = dispatcher.with_epoch(epoch);
        }
        if let Some(sink) = self.subscriber {
            dispatcher.set_boxed_event_subscriber(sink);
        }
        for _ in 0..self.initial_workers {
            dispatcher.add_worker();
        }
        Ok(dispatcher)
    }
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("config", &self.config)
            .field("epoch_ms", &self.epoch_ms)
            .field("initial_workers", &self.initial_workers)
            .field("has_subscriber", &self.subscriber.is_some())
            .finish()
    }
}
