//! Subscriber types for the reactive system.
//!
//! A subscriber is anything a [`Dep`](super::Dep) can notify. In practice
//! that is always a [`Watcher`](super::Watcher), but deps only see the
//! trait so they hold weak, type-erased references.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a watcher.
///
/// Ids are handed out from a monotonic counter, so creation order is id
/// order. The scheduler relies on this: parents are created before their
/// children and user watchers before the render watcher of the same
/// component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(u64);

impl WatcherId {
    /// Generate a new unique watcher ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for WatcherId {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that reacts when a dependency changes.
pub trait Subscriber {
    fn subscriber_id(&self) -> WatcherId;

    /// Called by a dep when its value changed.
    fn update(self: Rc<Self>);
}
