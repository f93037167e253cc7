//! Dependency cells.
//!
//! A [`Dep`] stands for one observable thing: a single reactive property,
//! the shape of an observed container, or the value of a computed watcher.
//! Watchers that read it during evaluation subscribe; writers call
//! [`Dep::notify`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::{ReactiveContext, Subscriber, WatcherId};

/// Unique identifier for a dep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

impl DepId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

struct DepInner {
    id: DepId,
    subs: RefCell<Vec<(WatcherId, Weak<dyn Subscriber>)>>,
}

/// A subscription list. Cloning shares the list.
#[derive(Clone)]
pub struct Dep(Rc<DepInner>);

impl Dep {
    pub fn new() -> Self {
        Self(Rc::new(DepInner {
            id: DepId::new(),
            subs: RefCell::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> DepId {
        self.0.id
    }

    /// Append a subscriber. Duplicates are the caller's concern.
    pub fn add_sub(&self, id: WatcherId, sub: Weak<dyn Subscriber>) {
        self.0.subs.borrow_mut().push((id, sub));
    }

    pub fn remove_sub(&self, id: WatcherId) {
        let mut subs = self.0.subs.borrow_mut();
        if let Some(pos) = subs.iter().position(|(sub_id, _)| *sub_id == id) {
            subs.remove(pos);
        }
    }

    /// Register with the current target, if one is collecting.
    pub fn depend(&self) {
        if let Some(watcher) = ReactiveContext::current() {
            watcher.add_dep(self);
        }
    }

    /// Tell every subscriber that the value changed, in ascending
    /// subscriber-id order.
    ///
    /// Works on a snapshot, so subscribers added or removed during
    /// delivery do not affect this round.
    pub fn notify(&self) {
        let mut snapshot: SmallVec<[(WatcherId, Rc<dyn Subscriber>); 8]> = {
            let mut subs = self.0.subs.borrow_mut();
            subs.retain(|(_, sub)| sub.strong_count() > 0);
            subs.iter().filter_map(|(id, sub)| Some((*id, sub.upgrade()?))).collect()
        };
        snapshot.sort_by_key(|(id, _)| *id);
        tracing::trace!(dep = self.0.id.raw(), subscribers = snapshot.len(), "notify");
        for (_, sub) in snapshot {
            sub.update();
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.0
            .subs
            .borrow()
            .iter()
            .filter(|(_, sub)| sub.strong_count() > 0)
            .count()
    }

    pub fn has_subscriber(&self, id: WatcherId) -> bool {
        self.0.subs.borrow().iter().any(|(sub_id, _)| *sub_id == id)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.0.id)
            .field("subscribers", &self.0.subs.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    type Seen = Rc<RefCell<Vec<WatcherId>>>;

    struct Recorder {
        id: WatcherId,
        hits: Cell<u32>,
        seen: Seen,
    }

    impl Subscriber for Recorder {
        fn subscriber_id(&self) -> WatcherId {
            self.id
        }

        fn update(self: Rc<Self>) {
            self.hits.set(self.hits.get() + 1);
            self.seen.borrow_mut().push(self.id);
        }
    }

    fn recorder(seen: &Seen) -> Rc<Recorder> {
        Rc::new(Recorder {
            id: WatcherId::new(),
            hits: Cell::new(0),
            seen: seen.clone(),
        })
    }

    fn subscribe(dep: &Dep, r: &Rc<Recorder>) {
        let weak: Weak<dyn Subscriber> = Rc::downgrade(r) as Weak<dyn Subscriber>;
        dep.add_sub(r.subscriber_id(), weak);
    }

    #[test]
    fn notify_reaches_every_subscriber() {
        let seen = Seen::default();
        let dep = Dep::new();
        let a = recorder(&seen);
        let b = recorder(&seen);
        subscribe(&dep, &a);
        subscribe(&dep, &b);

        dep.notify();
        assert_eq!(a.hits.get(), 1);
        assert_eq!(b.hits.get(), 1);
    }

    #[test]
    fn notify_runs_in_subscriber_id_order() {
        let seen = Seen::default();
        let dep = Dep::new();
        let older = recorder(&seen);
        let newer = recorder(&seen);
        subscribe(&dep, &newer);
        subscribe(&dep, &older);

        dep.notify();
        assert_eq!(*seen.borrow(), vec![older.id, newer.id]);
    }

    #[test]
    fn remove_sub_stops_delivery() {
        let dep = Dep::new();
        let a = recorder(&Seen::default());
        subscribe(&dep, &a);
        dep.remove_sub(a.id);

        dep.notify();
        assert_eq!(a.hits.get(), 0);
        assert!(!dep.has_subscriber(a.id));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let dep = Dep::new();
        let a = recorder(&Seen::default());
        subscribe(&dep, &a);
        assert_eq!(dep.subscriber_count(), 1);

        drop(a);
        assert_eq!(dep.subscriber_count(), 0);
        dep.notify();
    }

    #[test]
    fn depend_without_target_is_noop() {
        let dep = Dep::new();
        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);
    }
}
