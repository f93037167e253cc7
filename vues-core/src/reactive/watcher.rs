//! Watchers
//!
//! A [`Watcher`] evaluates a getter while collecting the deps it reads,
//! and reacts when any of them fires.
//!
//! # Flavors
//!
//! - **Queued** (the default): an update enqueues the watcher with the
//!   scheduler; it re-runs once per tick, however many deps fired.
//! - **Sync**: an update re-runs the watcher immediately.
//! - **Computed**: the getter is lazy. An update only marks the watcher
//!   dirty, unless something is subscribed to the computed value itself,
//!   in which case the watcher re-evaluates eagerly and notifies those
//!   subscribers when the value actually changed.
//!
//! # Dependency Bookkeeping
//!
//! Every evaluation collects a fresh dep set. Afterwards the old and new
//! sets are swapped, and deps that were not read this time are told to
//! drop the watcher, so a branch that is no longer taken stops triggering.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::{Dep, DepId, ReactiveContext, Subscriber, Value, WatcherId};
use crate::error::{handle_error, BoxError, Error, HandlerResult};
use crate::instance::{Component, WeakComponent};
use crate::scheduler;

/// Function evaluated by a watcher.
pub type Getter = Rc<dyn Fn() -> Result<Value, BoxError>>;

/// Callback receiving `(new, old)` after a change.
pub type WatchCallback = Rc<dyn Fn(&Value, &Value) -> HandlerResult>;

/// Construction flags.
#[derive(Clone, Default)]
pub struct WatcherOptions {
    /// Traverse the result so nested reads are dependencies too.
    pub deep: bool,
    /// Errors are user errors: reported, not propagated.
    pub user: bool,
    /// Lazy, cached evaluation.
    pub computed: bool,
    /// Run on notification instead of queueing.
    pub sync: bool,
    /// Invoked by the scheduler right before a queued run.
    pub before: Option<Rc<dyn Fn()>>,
}

impl WatcherOptions {
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Self::default()
        }
    }

    pub fn sync() -> Self {
        Self {
            sync: true,
            ..Self::default()
        }
    }

    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    pub fn user(mut self, user: bool) -> Self {
        self.user = user;
        self
    }
}

pub(crate) struct WatcherInner {
    id: WatcherId,
    expression: String,
    getter: Getter,
    callback: Option<WatchCallback>,
    deep: bool,
    user: bool,
    computed: bool,
    sync: bool,
    before: Option<Rc<dyn Fn()>>,
    owner: Option<WeakComponent>,
    render: bool,
    value: RefCell<Value>,
    dirty: Cell<bool>,
    active: Cell<bool>,
    deps: RefCell<SmallVec<[Dep; 4]>>,
    dep_ids: RefCell<HashSet<DepId>>,
    new_deps: RefCell<SmallVec<[Dep; 4]>>,
    new_dep_ids: RefCell<HashSet<DepId>>,
    own_dep: Option<Dep>,
}

/// Shared handle to a watcher.
#[derive(Clone)]
pub struct Watcher(Rc<WatcherInner>);

impl Watcher {
    /// Create a standalone watcher and, unless it is computed, evaluate it.
    pub fn new<F>(getter: F, callback: Option<WatchCallback>, options: WatcherOptions) -> Result<Self, Error>
    where
        F: Fn() -> Result<Value, BoxError> + 'static,
    {
        Self::build(Rc::new(getter), "<function>".to_owned(), callback, options, None, false)
    }

    pub(crate) fn build(
        getter: Getter,
        expression: String,
        callback: Option<WatchCallback>,
        options: WatcherOptions,
        owner: Option<WeakComponent>,
        render: bool,
    ) -> Result<Self, Error> {
        let computed = options.computed;
        let watcher = Watcher(Rc::new(WatcherInner {
            id: WatcherId::new(),
            expression,
            getter,
            callback,
            deep: options.deep,
            user: options.user,
            computed,
            sync: options.sync,
            before: options.before,
            owner,
            render,
            value: RefCell::new(Value::Null),
            dirty: Cell::new(computed),
            active: Cell::new(true),
            deps: RefCell::new(SmallVec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_deps: RefCell::new(SmallVec::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
            own_dep: computed.then(Dep::new),
        }));
        tracing::trace!(id = watcher.0.id.raw(), expression = %watcher.0.expression, "watcher created");
        if !computed {
            let value = watcher.get()?;
            *watcher.0.value.borrow_mut() = value;
        }
        Ok(watcher)
    }

    pub fn id(&self) -> WatcherId {
        self.0.id
    }

    pub fn expression(&self) -> &str {
        &self.0.expression
    }

    /// Last computed value.
    pub fn value(&self) -> Value {
        self.0.value.borrow().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    pub fn is_computed(&self) -> bool {
        self.0.computed
    }

    pub fn is_user(&self) -> bool {
        self.0.user
    }

    pub fn is_deep(&self) -> bool {
        self.0.deep
    }

    /// Number of deps collected by the last evaluation.
    pub fn dep_count(&self) -> usize {
        self.0.deps.borrow().len()
    }

    pub fn depends_on(&self, dep: &Dep) -> bool {
        self.0.dep_ids.borrow().contains(&dep.id())
    }

    pub(crate) fn owner(&self) -> Option<Component> {
        self.0.owner.as_ref().and_then(WeakComponent::upgrade)
    }

    pub(crate) fn is_render(&self) -> bool {
        self.0.render
    }

    pub(crate) fn call_before(&self) {
        if let Some(before) = &self.0.before {
            before();
        }
    }

    /// Evaluate the getter with this watcher as the current target.
    pub(crate) fn get(&self) -> Result<Value, Error> {
        let result = {
            let _ctx = ReactiveContext::enter(self);
            let result = (self.0.getter)();
            if let (true, Ok(value)) = (self.0.deep, &result) {
                traverse(value);
            }
            result
        };
        self.cleanup_deps();

        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                let info = format!("getter for watcher \"{}\"", self.0.expression);
                if self.0.user {
                    handle_error(&*err, self.owner().as_ref(), &info);
                    Ok(Value::Null)
                } else {
                    Err(Error::Evaluation { info, cause: err })
                }
            }
        }
    }

    /// Record that the current evaluation read `dep`.
    pub fn add_dep(&self, dep: &Dep) {
        let id = dep.id();
        if !self.0.new_dep_ids.borrow_mut().insert(id) {
            return;
        }
        self.0.new_deps.borrow_mut().push(dep.clone());
        if !self.0.dep_ids.borrow().contains(&id) {
            dep.add_sub(self.0.id, self.subscriber());
        }
    }

    fn subscriber(&self) -> Weak<dyn Subscriber> {
        Rc::downgrade(&self.0) as Weak<dyn Subscriber>
    }

    fn cleanup_deps(&self) {
        let inner = &self.0;
        {
            let new_ids = inner.new_dep_ids.borrow();
            for dep in inner.deps.borrow().iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_sub(inner.id);
                }
            }
        }
        std::mem::swap(&mut *inner.dep_ids.borrow_mut(), &mut *inner.new_dep_ids.borrow_mut());
        inner.new_dep_ids.borrow_mut().clear();
        std::mem::swap(&mut *inner.deps.borrow_mut(), &mut *inner.new_deps.borrow_mut());
        inner.new_deps.borrow_mut().clear();
    }

    /// React to a dep change.
    pub fn update(&self) {
        if self.0.computed {
            let observed = self
                .0
                .own_dep
                .as_ref()
                .map_or(false, |dep| dep.subscriber_count() > 0);
            if !observed {
                self.0.dirty.set(true);
                return;
            }
            let own_dep = self.0.own_dep.clone();
            let notify = move |_: &Value, _: &Value| -> HandlerResult {
                if let Some(dep) = &own_dep {
                    dep.notify();
                }
                Ok(())
            };
            if let Err(err) = self.get_and_invoke(&notify) {
                handle_error(&err, self.owner().as_ref(), "computed watcher");
            }
        } else if self.0.sync {
            if let Err(err) = self.run() {
                handle_error(&err, self.owner().as_ref(), "sync watcher");
            }
        } else {
            scheduler::queue_watcher(self.clone());
        }
    }

    /// Re-evaluate and invoke the callback on change. Inactive watchers do
    /// nothing.
    pub fn run(&self) -> Result<(), Error> {
        if !self.0.active.get() {
            return Ok(());
        }
        let callback = self.0.callback.clone();
        self.get_and_invoke(&move |new: &Value, old: &Value| match &callback {
            Some(callback) => callback(new, old),
            None => Ok(()),
        })
    }

    /// Re-evaluate; call `cb(new, old)` when the value changed, when it is a
    /// container (which may have mutated in place), or when deep.
    pub fn get_and_invoke(&self, cb: &dyn Fn(&Value, &Value) -> HandlerResult) -> Result<(), Error> {
        let value = self.get()?;
        let changed = {
            let old = self.0.value.borrow();
            !value.same_value(&old) || value.is_container() || self.0.deep
        };
        if !changed {
            return Ok(());
        }
        let old = self.0.value.replace(value.clone());
        self.0.dirty.set(false);
        if let Err(err) = cb(&value, &old) {
            let info = format!("callback for watcher \"{}\"", self.0.expression);
            if self.0.user {
                handle_error(&*err, self.owner().as_ref(), &info);
            } else {
                return Err(Error::Evaluation { info, cause: err });
            }
        }
        Ok(())
    }

    /// Value of a computed watcher, re-evaluating first if dirty.
    pub fn evaluate(&self) -> Result<Value, Error> {
        if self.0.dirty.get() {
            let value = self.get()?;
            *self.0.value.borrow_mut() = value;
            self.0.dirty.set(false);
        }
        Ok(self.value())
    }

    /// Subscribe the current target to this computed watcher's value.
    pub fn depend(&self) {
        if let Some(dep) = &self.0.own_dep {
            if ReactiveContext::is_active() {
                dep.depend();
            }
        }
    }

    /// Unsubscribe from every dep and deactivate. Idempotent.
    pub fn teardown(&self) {
        if !self.0.active.get() {
            return;
        }
        if let Some(owner) = self.owner() {
            if !owner.is_being_destroyed() {
                owner.remove_watcher(self.0.id);
            }
        }
        for dep in self.0.deps.borrow().iter() {
            dep.remove_sub(self.0.id);
        }
        self.0.active.set(false);
        tracing::trace!(id = self.0.id.raw(), "watcher torn down");
    }
}

impl Subscriber for WatcherInner {
    fn subscriber_id(&self) -> WatcherId {
        self.id
    }

    fn update(self: Rc<Self>) {
        Watcher(self).update();
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.0.id)
            .field("expression", &self.0.expression)
            .field("active", &self.0.active.get())
            .field("dirty", &self.0.dirty.get())
            .field("deps", &self.0.deps.borrow().len())
            .finish()
    }
}

/// Read every nested member of `value` so that each becomes a dependency
/// of the current target. Frozen containers are skipped; shared and cyclic
/// containers are visited once.
pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    traverse_into(value, &mut seen);
}

fn traverse_into(value: &Value, seen: &mut HashSet<usize>) {
    match value {
        Value::Object(obj) => {
            if obj.is_frozen() || !seen.insert(obj.addr()) {
                return;
            }
            for key in obj.keys() {
                traverse_into(&obj.get(&key), seen);
            }
        }
        Value::Array(arr) => {
            if arr.is_frozen() || !seen.insert(arr.addr()) {
                return;
            }
            for item in arr.to_vec() {
                traverse_into(&item, seen);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::observe;
    use std::cell::Cell;

    fn state() -> Value {
        let value = Value::object([("a", Value::from(1)), ("b", Value::from(2)), ("flag", Value::from(true))]);
        observe(&value, false);
        value
    }

    #[test]
    fn sync_watcher_reruns_on_change() {
        let data = state();
        let obj = data.as_object().unwrap().clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let reader = obj.clone();

        let _w = Watcher::new(
            move || Ok(reader.get("a")),
            Some(Rc::new(move |new: &Value, old: &Value| {
                sink.borrow_mut().push((new.clone(), old.clone()));
                Ok(())
            })),
            WatcherOptions::sync(),
        )
        .unwrap();

        obj.set("a", 5).unwrap();
        obj.set("a", 5).unwrap();
        assert_eq!(seen.borrow().as_slice(), [(Value::from(5), Value::from(1))]);
    }

    #[test]
    fn branches_not_taken_are_unsubscribed() {
        let data = state();
        let obj = data.as_object().unwrap().clone();
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let reader = obj.clone();

        let w = Watcher::new(
            move || {
                counter.set(counter.get() + 1);
                Ok(if reader.get("flag").truthy() { reader.get("a") } else { reader.get("b") })
            },
            None,
            WatcherOptions::sync(),
        )
        .unwrap();
        assert_eq!(w.dep_count(), 2);

        obj.set("flag", false).unwrap();
        assert_eq!(runs.get(), 2);
        assert!(!w.depends_on(&obj.property_dep("a").unwrap()));

        obj.set("a", 100).unwrap();
        assert_eq!(runs.get(), 2);
        obj.set("b", 3).unwrap();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn computed_is_lazy_and_cached() {
        let data = state();
        let obj = data.as_object().unwrap().clone();
        let evals = Rc::new(Cell::new(0));
        let counter = evals.clone();
        let reader = obj.clone();

        let computed = Watcher::new(
            move || {
                counter.set(counter.get() + 1);
                Ok(Value::from(reader.get("a").as_f64().unwrap_or(0.0) * 2.0))
            },
            None,
            WatcherOptions::computed(),
        )
        .unwrap();
        assert_eq!(evals.get(), 0);

        assert_eq!(computed.evaluate().unwrap(), Value::from(2));
        assert_eq!(computed.evaluate().unwrap(), Value::from(2));
        assert_eq!(evals.get(), 1);

        obj.set("a", 4).unwrap();
        assert!(computed.is_dirty());
        assert_eq!(evals.get(), 1);
        assert_eq!(computed.evaluate().unwrap(), Value::from(8));
        assert_eq!(evals.get(), 2);
    }

    #[test]
    fn deep_watcher_sees_nested_mutation() {
        let data = Value::object([("nested", Value::object([("x", 1)]))]);
        observe(&data, false);
        let obj = data.as_object().unwrap().clone();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let reader = obj.clone();

        let _deep = Watcher::new(
            move || Ok(reader.get("nested")),
            Some(Rc::new(move |_: &Value, _: &Value| {
                counter.set(counter.get() + 1);
                Ok(())
            })),
            WatcherOptions::sync().deep(true),
        )
        .unwrap();

        obj.get_untracked("nested").as_object().unwrap().set("x", 2).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn teardown_stops_updates() {
        let data = state();
        let obj = data.as_object().unwrap().clone();
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let reader = obj.clone();

        let w = Watcher::new(
            move || {
                counter.set(counter.get() + 1);
                Ok(reader.get("a"))
            },
            None,
            WatcherOptions::sync(),
        )
        .unwrap();
        w.teardown();
        w.teardown();

        obj.set("a", 9).unwrap();
        assert_eq!(runs.get(), 1);
        assert!(!w.is_active());
        assert_eq!(obj.property_dep("a").unwrap().subscriber_count(), 0);
    }

    #[test]
    fn non_user_getter_errors_propagate() {
        let result = Watcher::new(|| Err("broken".into()), None, WatcherOptions::default());
        assert!(matches!(result, Err(Error::Evaluation { .. })));
    }

    #[test]
    fn traverse_handles_cycles() {
        let a = Value::object([("name", "a")]);
        let b = Value::object([("peer", a.clone())]);
        a.as_object().unwrap().set("peer", b.clone()).unwrap();
        traverse(&a);
    }
}
