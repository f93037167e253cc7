//! Reactive Context
//!
//! The reactive context tracks which watcher is currently evaluating.
//! When a reactive property is read, its dep asks the context for the
//! current watcher and registers itself with it.
//!
//! # Implementation
//!
//! A thread-local stack holds the evaluation targets. Entering a watcher's
//! getter pushes the watcher; the guard pops it when dropped, restoring
//! the outer target. Nested evaluation (a computed read from inside a
//! render) therefore just works.
//!
//! An entry can also be empty. [`ReactiveContext::untracked`] pushes such
//! an entry so that code running inside it (lifecycle hooks, for instance)
//! does not register dependencies with whatever watcher is outside.

use std::cell::RefCell;

use super::{Watcher, WatcherId};

thread_local! {
    static TARGET_STACK: RefCell<Vec<Option<Watcher>>> = RefCell::new(Vec::new());
}

/// Guard that pops the target when dropped.
pub struct ReactiveContext {
    watcher_id: Option<WatcherId>,
}

impl ReactiveContext {
    /// Make `watcher` the current target until the guard is dropped.
    pub fn enter(watcher: &Watcher) -> Self {
        TARGET_STACK.with(|stack| stack.borrow_mut().push(Some(watcher.clone())));
        Self {
            watcher_id: Some(watcher.id()),
        }
    }

    /// Suspend dependency collection until the guard is dropped.
    pub fn untracked() -> Self {
        TARGET_STACK.with(|stack| stack.borrow_mut().push(None));
        Self { watcher_id: None }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// The watcher currently collecting dependencies, if any.
    pub fn current() -> Option<Watcher> {
        TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        TARGET_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.as_ref().map(Watcher::id),
                    self.watcher_id,
                    "ReactiveContext mismatch"
                );
            }
        });
    }
}
