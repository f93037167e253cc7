//! Watcher Queue
//!
//! Queued watchers wait here until the next tick flushes them.
//!
//! # Algorithm
//!
//! 1. [`queue_watcher`] adds a watcher unless it is already pending. The
//!    first addition of a batch schedules [`flush_scheduler_queue`].
//! 2. The flush sorts the queue by watcher id. Ids are creation order, so
//!    parents run before children and a component's user watchers run
//!    before its render watcher.
//! 3. Watchers queued while flushing are spliced in at their id position
//!    among the watchers not yet run. A watcher that already ran can be
//!    queued again; if that happens more than `max_update_count` times the
//!    flush is aborted as an infinite loop.
//! 4. After the flush, `updated` hooks fire for the components whose render
//!    watcher ran, children first.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::tick;
use crate::config;
use crate::error::{warn, Error};
use crate::instance::LifecycleHook;
use crate::reactive::{Watcher, WatcherId};

#[derive(Default)]
struct SchedulerQueue {
    queue: Vec<Watcher>,
    has: HashSet<WatcherId>,
    circular: HashMap<WatcherId, u32>,
    waiting: bool,
    flushing: bool,
    index: usize,
}

impl SchedulerQueue {
    fn reset(&mut self) -> Vec<Watcher> {
        let flushed = std::mem::take(&mut self.queue);
        self.has.clear();
        self.circular.clear();
        self.waiting = false;
        self.flushing = false;
        self.index = 0;
        flushed
    }
}

thread_local! {
    static QUEUE: RefCell<SchedulerQueue> = RefCell::new(SchedulerQueue::default());
}

/// Add a watcher to the pending queue.
pub fn queue_watcher(watcher: Watcher) {
    let schedule = QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        let id = watcher.id();
        if !q.has.insert(id) {
            return false;
        }
        if !q.flushing {
            q.queue.push(watcher);
        } else {
            let mut pos = q.queue.len();
            while pos > q.index + 1 && q.queue[pos - 1].id() > id {
                pos -= 1;
            }
            q.queue.insert(pos, watcher);
        }
        if q.waiting {
            false
        } else {
            q.waiting = true;
            true
        }
    });
    if schedule {
        tick::schedule(Box::new(flush_scheduler_queue));
    }
}

/// Number of watchers waiting to run.
pub fn pending_watchers() -> usize {
    QUEUE.with(|q| {
        let q = q.borrow();
        q.queue.len().saturating_sub(if q.flushing { q.index } else { 0 })
    })
}

/// Run every queued watcher.
pub(crate) fn flush_scheduler_queue() -> Result<(), Error> {
    QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        q.flushing = true;
        q.index = 0;
        q.queue.sort_by_key(Watcher::id);
    });
    let settings = config::settings();

    let result = loop {
        let next = QUEUE.with(|q| {
            let mut q = q.borrow_mut();
            let index = q.index;
            let watcher = q.queue.get(index).cloned();
            if let Some(watcher) = &watcher {
                q.has.remove(&watcher.id());
            }
            watcher
        });
        let Some(watcher) = next else {
            break Ok(());
        };

        watcher.call_before();
        if let Err(err) = watcher.run() {
            break Err(err);
        }

        let runaway = !settings.production
            && QUEUE.with(|q| {
                let mut q = q.borrow_mut();
                let id = watcher.id();
                if !q.has.contains(&id) {
                    return false;
                }
                let count = q.circular.entry(id).or_insert(0);
                *count += 1;
                *count > settings.max_update_count
            });
        if runaway {
            let owner = watcher.owner();
            let msg = if watcher.is_user() {
                format!(
                    "You may have an infinite update loop in watcher with expression \"{}\"",
                    watcher.expression()
                )
            } else {
                "You may have an infinite update loop in a component render function.".to_owned()
            };
            warn(msg, owner.as_ref());
            break Ok(());
        }

        QUEUE.with(|q| q.borrow_mut().index += 1);
    };

    let flushed = QUEUE.with(|q| q.borrow_mut().reset());
    tracing::debug!(watchers = flushed.len(), ok = result.is_ok(), "flushed watcher queue");
    if result.is_ok() {
        call_updated_hooks(&flushed);
    }
    result
}

fn call_updated_hooks(flushed: &[Watcher]) {
    for watcher in flushed.iter().rev() {
        if !watcher.is_render() {
            continue;
        }
        let Some(vm) = watcher.owner() else {
            continue;
        };
        if vm.render_watcher_id() == Some(watcher.id()) && vm.is_mounted() && !vm.is_destroyed() {
            vm.call_hook(LifecycleHook::Updated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{observe, Value, WatcherOptions};
    use crate::scheduler::tick;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_watcher(data: &Value, key: &'static str, runs: Rc<Cell<u32>>) -> Watcher {
        let obj = data.as_object().unwrap().clone();
        Watcher::new(
            move || {
                runs.set(runs.get() + 1);
                Ok(obj.get(key))
            },
            None,
            WatcherOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn updates_are_batched_and_deduplicated() {
        let data = Value::object([("a", 1), ("b", 1)]);
        observe(&data, false);
        let runs = Rc::new(Cell::new(0));
        let _w = counting_watcher(&data, "a", runs.clone());
        let obj = data.as_object().unwrap();

        obj.set("a", 2).unwrap();
        obj.set("a", 3).unwrap();
        obj.set("a", 4).unwrap();
        assert_eq!(runs.get(), 1);
        assert_eq!(pending_watchers(), 1);

        tick::tick().unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(pending_watchers(), 0);
    }

    #[test]
    fn watchers_flush_in_creation_order() {
        let data = Value::object([("a", 1), ("b", 1)]);
        observe(&data, false);
        let order = Rc::new(RefCell::new(Vec::new()));
        let obj = data.as_object().unwrap().clone();

        let mut watchers = Vec::new();
        for name in ["first", "second"] {
            let reader = obj.clone();
            let log = order.clone();
            let key = if name == "first" { "a" } else { "b" };
            watchers.push(
                Watcher::new(
                    move || {
                        log.borrow_mut().push(name);
                        Ok(reader.get(key))
                    },
                    None,
                    WatcherOptions::default(),
                )
                .unwrap(),
            );
        }
        order.borrow_mut().clear();

        obj.set("b", 2).unwrap();
        obj.set("a", 2).unwrap();
        tick::tick().unwrap();
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn runaway_watcher_is_cut_off() {
        config::reset();
        config::configure(|c| c.settings.max_update_count = 10);
        let warned = Rc::new(Cell::new(false));
        let flag = warned.clone();
        config::configure(move |c| c.warn_handler = Some(Rc::new(move |_, _| flag.set(true))));

        let data = Value::object([("n", 0)]);
        observe(&data, false);
        let obj = data.as_object().unwrap().clone();
        let writer = obj.clone();
        let _w = Watcher::new(
            move || Ok(obj.get("n")),
            Some(Rc::new(move |new: &Value, _: &Value| {
                writer.set("n", new.as_f64().unwrap_or(0.0) + 1.0)?;
                Ok(())
            })),
            WatcherOptions::default(),
        )
        .unwrap();

        data.as_object().unwrap().set("n", 1).unwrap();
        tick::tick().unwrap();
        assert!(warned.get());
        assert!(data.as_object().unwrap().get("n").as_f64().unwrap() <= 13.0);
        config::reset();
    }
}
