//! Deferred Callbacks
//!
//! There is no event loop inside the runtime. Callbacks deferred with
//! [`next_tick`] collect in a thread-local list, and the host drains that
//! list by calling [`tick`] whenever it would otherwise yield to its own
//! loop (after handling an input event, a timer, a message).
//!
//! Callbacks queued while a tick is draining run in the same call to
//! [`tick`], after the current batch, so one call always leaves the list
//! empty unless a callback fails.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;

use tokio::sync::oneshot;

use crate::error::{handle_error, Error, HandlerResult};

pub(crate) type Task = Box<dyn FnOnce() -> Result<(), Error>>;

#[derive(Default)]
struct TickState {
    callbacks: VecDeque<Task>,
}

thread_local! {
    static TICK: RefCell<TickState> = RefCell::new(TickState::default());
}

/// Defer `callback` to the next tick. Errors are reported, not returned.
pub fn next_tick<F>(callback: F)
where
    F: FnOnce() -> HandlerResult + 'static,
{
    schedule(Box::new(move || {
        if let Err(err) = callback() {
            handle_error(&*err, None, "nextTick");
        }
        Ok(())
    }));
}

/// Future that resolves once the callbacks queued so far have run.
pub fn next_tick_future() -> impl Future<Output = ()> {
    let (tx, rx) = oneshot::channel();
    schedule(Box::new(move || {
        let _ = tx.send(());
        Ok(())
    }));
    async move {
        let _ = rx.await;
    }
}

pub(crate) fn schedule(task: Task) {
    TICK.with(|state| state.borrow_mut().callbacks.push_back(task));
}

/// `true` when callbacks are waiting for [`tick`].
pub fn is_pending() -> bool {
    TICK.with(|state| !state.borrow().callbacks.is_empty())
}

/// Run deferred callbacks until none are left.
///
/// A failing internal task (a broken render, for instance) stops the
/// drain: the error is returned and the remaining callbacks stay queued for
/// the next call.
pub fn tick() -> Result<(), Error> {
    loop {
        let batch: Vec<Task> = TICK.with(|state| state.borrow_mut().callbacks.drain(..).collect());
        if batch.is_empty() {
            return Ok(());
        }
        tracing::trace!(callbacks = batch.len(), "tick");
        let mut remaining = batch.into_iter();
        while let Some(task) = remaining.next() {
            if let Err(err) = task() {
                TICK.with(|state| {
                    let mut state = state.borrow_mut();
                    let rest: Vec<Task> = remaining.collect();
                    for task in rest.into_iter().rev() {
                        state.callbacks.push_front(task);
                    }
                });
                return Err(err);
            }
        }
    }
}
