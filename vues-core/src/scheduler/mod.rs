//! Scheduling
//!
//! Watcher runs are deferred and batched: any number of changes within one
//! tick re-run each affected watcher once, in creation order. The host
//! drives the tick by calling [`tick`].

mod queue;
mod tick;

pub use queue::{pending_watchers, queue_watcher};
pub use tick::{is_pending, next_tick, next_tick_future, tick};
