//! Dispatch core: order lifecycle, worker pool and deferred callbacks.

pub mod error;
pub mod order;
pub mod worker;
pub mod ledger;
pub mod timer;
pub mod events;
pub mod dispatcher;
pub mod spawn;

pub use error::{AppResult, DispatchError};
pub use order::{Order, OrderState};
pub use worker::{Worker, WorkerState};
pub use ledger::{OrderLedger, OrderListing, PendingQueue, ORDER_ID_BASE};
pub use timer::{Deferred, FiredTimer, TimerQueue};
pub use events::{ChannelSink, DispatchEvent, EventKind, EventLog, EventNotifier, EventSink};
pub use dispatcher::{Dispatcher, StatusSummary};
pub use spawn::Spawn;
