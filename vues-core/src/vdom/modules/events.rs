use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{Module, PatchContext};
use crate::dom::{NodeId, NodeOps};
use crate::vdom::{listener_invoker, Listener, VNode};

type Handlers = Rc<RefCell<Vec<Listener>>>;

/// DOM event listeners.
///
/// Each `(node, event)` pair gets one invoker registered with the backend.
/// Later patches swap the handlers behind the invoker instead of
/// re-registering.
#[derive(Default)]
pub struct EventsModule {
    invokers: RefCell<HashMap<(NodeId, String), Handlers>>,
}

impl EventsModule {
    fn apply(&self, ops: &dyn NodeOps, old: Option<&VNode>, vnode: &VNode) {
        let old_on = old.map(|o| &o.data.on);
        if old_on.map_or(true, |on| on.is_empty()) && vnode.data.on.is_empty() {
            return;
        }
        let Some(elm) = vnode.elm() else {
            return;
        };

        for (event, handlers) in &vnode.data.on {
            let key = (elm, event.clone());
            let existing = self.invokers.borrow().get(&key).cloned();
            match existing {
                Some(current) => *current.borrow_mut() = handlers.clone(),
                None => {
                    let fns: Handlers = Rc::new(RefCell::new(handlers.clone()));
                    self.invokers.borrow_mut().insert(key, fns.clone());
                    ops.add_event_listener(elm, event, listener_invoker(fns));
                }
            }
        }
        if let Some(old_on) = old_on {
            for event in old_on.keys() {
                if vnode.data.on.contains_key(event) {
                    continue;
                }
                if self.invokers.borrow_mut().remove(&(elm, event.clone())).is_some() {
                    ops.remove_event_listener(elm, event);
                }
            }
        }
    }
}

impl Module for EventsModule {
    fn create(&self, cx: &mut PatchContext<'_>, vnode: &VNode) {
        self.apply(cx.ops, None, vnode);
    }

    fn update(&self, cx: &mut PatchContext<'_>, old: &VNode, vnode: &VNode) {
        self.apply(cx.ops, Some(old), vnode);
    }

    fn destroy(&self, _ops: &dyn NodeOps, vnode: &VNode) {
        if vnode.data.on.is_empty() {
            return;
        }
        if let Some(elm) = vnode.elm() {
            let mut invokers = self.invokers.borrow_mut();
            for event in vnode.data.on.keys() {
                invokers.remove(&(elm, event.clone()));
            }
        }
    }
}
