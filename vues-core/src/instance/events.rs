//! Instance event bus.
//!
//! Handlers run in registration order. A failing handler is reported
//! through [`handle_error`] and the remaining handlers still run.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{Component, EventHandler};
use crate::error::handle_error;
use crate::reactive::Value;
use crate::vdom::{listener_invoker, Listener};

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

impl EventHandler {
    fn matches(&self, handler: &Listener) -> bool {
        same_listener(&self.callback, handler) || self.original.as_ref().map_or(false, |o| same_listener(o, handler))
    }
}

impl Component {
    /// Register `handler` for `event`.
    pub fn on(&self, event: impl Into<String>, handler: Listener) {
        self.0
            .events
            .borrow_mut()
            .entry(event.into())
            .or_default()
            .push(EventHandler {
                callback: handler,
                original: None,
            });
    }

    pub fn on_many(&self, events: &[&str], handler: Listener) {
        for event in events {
            self.on(*event, handler.clone());
        }
    }

    /// Register `handler` for the next `event` only.
    pub fn once(&self, event: impl Into<String>, handler: Listener) {
        let event = event.into();
        let weak = self.downgrade();
        let original = handler.clone();
        let name = event.clone();
        let callback: Listener = Rc::new(move |args: &[Value]| {
            if let Some(vm) = weak.upgrade() {
                vm.off(&name, Some(&original));
            }
            original(args)
        });
        self.0
            .events
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(EventHandler {
                callback,
                original: Some(handler),
            });
    }

    /// Remove handlers. With `handler`, only the most recent registration
    /// of that handler is removed; without, every handler for `event`.
    pub fn off(&self, event: &str, handler: Option<&Listener>) {
        let mut events = self.0.events.borrow_mut();
        let Some(handler) = handler else {
            events.shift_remove(event);
            return;
        };
        if let Some(handlers) = events.get_mut(event) {
            if let Some(pos) = handlers.iter().rposition(|h| h.matches(handler)) {
                handlers.remove(pos);
            }
        }
    }

    pub fn off_many(&self, events: &[&str], handler: Option<&Listener>) {
        for event in events {
            self.off(event, handler);
        }
    }

    pub fn off_all(&self) {
        self.0.events.borrow_mut().clear();
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.0.events.borrow().get(event).map_or(false, |h| !h.is_empty())
    }

    /// Call every handler registered for `event` with `args`.
    pub fn emit(&self, event: &str, args: &[Value]) {
        let handlers: Vec<Listener> = match self.0.events.borrow().get(event) {
            Some(handlers) => handlers.iter().map(|h| h.callback.clone()).collect(),
            None => return,
        };
        for handler in handlers {
            if let Err(err) = handler(args) {
                handle_error(&*err, Some(self), &format!("event handler for \"{event}\""));
            }
        }
    }

    /// Sync the listeners a parent attached through the placeholder. Each
    /// event keeps one registered invoker whose handler list is swapped.
    pub(crate) fn update_parent_listeners(&self, listeners: &IndexMap<String, Vec<Listener>>) {
        let stale: Vec<(String, Listener)> = {
            let current = self.0.parent_listeners.borrow();
            current
                .iter()
                .filter(|(event, _)| !listeners.contains_key(*event))
                .map(|(event, (_, invoker))| (event.clone(), invoker.clone()))
                .collect()
        };
        for (event, invoker) in stale {
            self.off(&event, Some(&invoker));
            self.0.parent_listeners.borrow_mut().shift_remove(&event);
        }

        for (event, handlers) in listeners {
            let existing = self.0.parent_listeners.borrow().get(event).map(|(fns, _)| fns.clone());
            match existing {
                Some(fns) => *fns.borrow_mut() = handlers.clone(),
                None => {
                    let fns = Rc::new(RefCell::new(handlers.clone()));
                    let invoker = listener_invoker(fns.clone());
                    self.on(event.clone(), invoker.clone());
                    self.0.parent_listeners.borrow_mut().insert(event.clone(), (fns, invoker));
                }
            }
        }
    }
}
