//! Real-time driver for the dispatcher.
//!
//! [`DispatchService`] keeps the [`Dispatcher`] behind one
//! `parking_lot::Mutex` and runs a background driver that sleeps until the
//! next deferred callback is due, then advances the dispatcher's logical
//! clock to the real elapsed time. Every public operation takes the same
//! lock and first catches the clock up, so callbacks and external calls are
//! fully serialized and never observe each other half-applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::core::{
    ChannelSink, DispatchEvent, Dispatcher, EventSink, Order, OrderListing, PendingQueue, Spawn,
    StatusSummary, Worker,
};
use crate::infra::queue::InMemoryLanes;
use crate::util::serde::{OrderId, PriorityClass, WorkerId};

/// Sleep horizon for deadlines beyond what `Instant` can represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

struct Shared<Q> {
    dispatcher: Mutex<Dispatcher<Q>>,
    wake: Notify,
    shutdown: AtomicBool,
    started: Instant,
    base_ms: u64,
}

impl<Q> Shared<Q> {
    /// Logical time corresponding to "now".
    fn target_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.base_ms.saturating_add(elapsed)
    }

    /// Real instant at which logical time `due_ms` arrives.
    fn instant_for(&self, due_ms: u64) -> Instant {
        let offset = Duration::from_millis(due_ms.saturating_sub(self.base_ms));
        self.started
            .checked_add(offset)
            .unwrap_or_else(|| Instant::now() + FAR_FUTURE)
    }
}

/// Thread-safe handle that drives a [`Dispatcher`] from the tokio clock.
pub struct DispatchService<Q = InMemoryLanes<OrderId>>
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    shared: Arc<Shared<Q>>,
}

impl<Q> DispatchService<Q>
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    /// Take ownership of `dispatcher` and spawn its driver on `spawner`.
    ///
    /// The dispatcher's current logical time is mapped onto "now".
    pub fn start<S: Spawn>(dispatcher: Dispatcher<Q>, spawner: &S) -> Self {
        let base_ms = dispatcher.elapsed_ms();
        let shared = Arc::new(Shared {
            dispatcher: Mutex::new(dispatcher),
            wake: Notify::new(),
            shutdown: AtomicBool::new(false),
            started: Instant::now(),
            base_ms,
        });
        spawner.spawn(drive(Arc::clone(&shared)));
        info!("dispatch service started");
        Self { shared }
    }

    /// Run `f` under the dispatcher lock after catching the clock up, then
    /// wake the driver so it re-reads the next deadline.
    fn with_dispatcher<R>(&self, f: impl FnOnce(&mut Dispatcher<Q>) -> R) -> R {
        let result = {
            let mut dispatcher = self.shared.dispatcher.lock();
            if !self.shared.shutdown.load(Ordering::Acquire) {
                dispatcher.advance_to(self.shared.target_ms());
            }
            f(&mut dispatcher)
        };
        self.shared.wake.notify_one();
        result
    }

    /// Create a pending order.
    pub fn create_order(&self, priority: PriorityClass) -> Order {
        self.with_dispatcher(|d| d.create_order(priority))
    }

    /// Add a worker; it attempts a dispatch immediately.
    pub fn add_worker(&self) -> Worker {
        self.with_dispatcher(|d| d.add_worker())
    }

    /// Remove the newest worker, preempting its order. `None` if the pool is
    /// empty.
    pub fn remove_worker(&self) -> Option<Worker> {
        self.with_dispatcher(|d| d.remove_worker())
    }

    /// Workers in insertion order.
    pub fn list_workers(&self) -> Vec<Worker> {
        self.with_dispatcher(|d| d.workers())
    }

    /// Orders grouped by state.
    pub fn list_orders(&self) -> OrderListing {
        self.with_dispatcher(|d| d.orders())
    }

    /// One order by id.
    pub fn get_order(&self, id: OrderId) -> Option<Order> {
        self.with_dispatcher(|d| d.order(id))
    }

    /// One worker by id.
    pub fn get_worker(&self, id: WorkerId) -> Option<Worker> {
        self.with_dispatcher(|d| d.worker(id))
    }

    /// Workers holding an order.
    pub fn count_active_workers(&self) -> usize {
        self.with_dispatcher(|d| d.count_active_workers())
    }

    /// Workers without an order.
    pub fn count_idle_workers(&self) -> usize {
        self.with_dispatcher(|d| d.count_idle_workers())
    }

    /// Orders waiting in either lane.
    pub fn count_pending_orders(&self) -> usize {
        self.with_dispatcher(|d| d.count_pending_orders())
    }

    /// Aggregate counts.
    pub fn status(&self) -> StatusSummary {
        self.with_dispatcher(|d| d.status())
    }

    /// Replace the event subscriber. Callbacks already due are delivered to
    /// the previous subscriber first. The sink runs under the dispatcher lock
    /// and must not call back into the service.
    pub fn set_event_subscriber<S: EventSink + 'static>(&self, sink: S) -> bool {
        self.with_dispatcher(|d| d.set_event_subscriber(sink))
    }

    /// Replace the event subscriber with an unbounded channel and return its
    /// receiving end.
    pub fn subscribe(&self) -> Receiver<DispatchEvent> {
        let (sink, rx) = ChannelSink::unbounded();
        self.set_event_subscriber(sink);
        rx
    }

    /// Logical milliseconds elapsed on the dispatcher clock.
    pub fn elapsed_ms(&self) -> u64 {
        self.shared.dispatcher.lock().elapsed_ms()
    }

    /// Whether the driver is still running.
    pub fn is_running(&self) -> bool {
        !self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Stop the driver. The clock freezes; operations keep working on it.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("shutting down dispatch service");
        self.shared.wake.notify_one();
    }
}

impl<Q> Drop for DispatchService<Q>
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<Q> std::fmt::Debug for DispatchService<Q>
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchService")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Driver loop: sleep until the next deadline or a wake-up, then catch the
/// dispatcher up to real time.
async fn drive<Q>(shared: Arc<Shared<Q>>)
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    debug!("dispatch driver started");
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        let next = shared.dispatcher.lock().next_deadline_ms();
        match next {
            Some(due_ms) => {
                let at = shared.instant_for(due_ms);
                tokio::select! {
                    () = tokio::time::sleep_until(at) => {}
                    () = shared.wake.notified() => {}
                }
            }
            None => shared.wake.notified().await,
        }
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        let target = shared.target_ms();
        let fired = shared.dispatcher.lock().advance_to(target);
        if fired > 0 {
            debug!(fired, at_ms = target, "driver fired callbacks");
        }
    }
    debug!("dispatch driver exiting");
}
