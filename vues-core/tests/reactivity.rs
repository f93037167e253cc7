//! Integration Tests for the Reactive System
//!
//! These tests verify that observed state, watchers and the scheduler work
//! together: batching, deep watching, array instrumentation, dependency
//! pruning and computed laziness.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vues_core::reactive::{
    define_reactive, del, observe, set, AccessorGetter, AccessorSetter, PropertyFlags, ReactiveObject, Value,
    WatchCallback, Watcher, WatcherOptions,
};
use vues_core::scheduler;

fn counter() -> (Rc<Cell<u32>>, WatchCallback) {
    let count = Rc::new(Cell::new(0));
    let hits = count.clone();
    let callback: WatchCallback = Rc::new(move |_: &Value, _: &Value| {
        hits.set(hits.get() + 1);
        Ok(())
    });
    (count, callback)
}

/// Two writes in one task re-run a watcher reading both keys once.
#[test]
fn writes_in_one_task_are_batched() {
    let state = Value::object([("a", 1), ("b", 2)]);
    observe(&state, false);
    let obj = state.as_object().unwrap().clone();

    let reader = obj.clone();
    let runs = Rc::new(Cell::new(0));
    let runs_in_getter = runs.clone();
    let _watcher = Watcher::new(
        move || {
            runs_in_getter.set(runs_in_getter.get() + 1);
            let a = reader.get("a").as_f64().unwrap_or(0.0);
            let b = reader.get("b").as_f64().unwrap_or(0.0);
            Ok(Value::from(a + b))
        },
        None,
        WatcherOptions::default(),
    )
    .unwrap();
    assert_eq!(runs.get(), 1);

    obj.set("a", 10).unwrap();
    obj.set("b", 20).unwrap();
    obj.set("a", 11).unwrap();
    // Nothing runs until the tick
    assert_eq!(runs.get(), 1);
    assert_eq!(scheduler::pending_watchers(), 1);

    scheduler::tick().unwrap();
    assert_eq!(runs.get(), 2);
    assert!(!scheduler::is_pending());
}

/// A shallow watcher on a nested object ignores leaf writes; a deep one
/// does not.
#[test]
fn deep_and_shallow_watchers() {
    let state = Value::object([("nested", Value::object([("leaf", 1)]))]);
    observe(&state, false);
    let obj = state.as_object().unwrap().clone();

    let (shallow_hits, shallow_cb) = counter();
    let (deep_hits, deep_cb) = counter();
    let shallow_src = obj.clone();
    let deep_src = obj.clone();
    let _shallow = Watcher::new(move || Ok(shallow_src.get("nested")), Some(shallow_cb), WatcherOptions::sync()).unwrap();
    let _deep = Watcher::new(
        move || Ok(deep_src.get("nested")),
        Some(deep_cb),
        WatcherOptions::sync().deep(true),
    )
    .unwrap();

    obj.get("nested").as_object().unwrap().set("leaf", 2).unwrap();
    assert_eq!(shallow_hits.get(), 0);
    assert_eq!(deep_hits.get(), 1);

    // Replacing the reference fires both
    obj.set("nested", Value::object([("leaf", 3)])).unwrap();
    assert_eq!(shallow_hits.get(), 1);
    assert_eq!(deep_hits.get(), 2);
}

/// push then pop restores the array and notifies once per mutation.
#[test]
fn array_push_pop_round_trip() {
    let state = Value::object([("list", Value::array([1, 2]))]);
    observe(&state, false);
    let obj = state.as_object().unwrap().clone();
    let before = obj.get("list").as_array().unwrap().to_vec();

    let (hits, cb) = counter();
    let src = obj.clone();
    let _watcher = Watcher::new(move || Ok(src.get("list")), Some(cb), WatcherOptions::sync()).unwrap();

    let list = obj.get("list").as_array().unwrap().clone();
    list.push(3);
    assert_eq!(list.pop(), Some(Value::from(3)));

    assert_eq!(list.to_vec(), before);
    assert_eq!(hits.get(), 2);
}

/// Batched array mutations collapse into a single run.
#[test]
fn array_mutations_batch_in_one_task() {
    let state = Value::object([("list", Value::array(Vec::<Value>::new()))]);
    observe(&state, false);
    let obj = state.as_object().unwrap().clone();

    let (hits, cb) = counter();
    let src = obj.clone();
    let _watcher = Watcher::new(move || Ok(src.get("list")), Some(cb), WatcherOptions::default()).unwrap();

    let list = obj.get("list").as_array().unwrap().clone();
    list.push("x");
    list.pop();
    scheduler::tick().unwrap();
    assert_eq!(hits.get(), 1);
}

/// Elements pushed into an observed array are observed themselves.
#[test]
fn pushed_objects_become_reactive() {
    let list = Value::array(Vec::<Value>::new());
    observe(&list, false);
    let item = Value::object([("done", false)]);
    list.as_array().unwrap().push(item.clone());
    assert!(item.observer().is_some());
}

/// A watcher that stops reading a property is no longer triggered by it.
#[test]
fn stale_dependencies_are_pruned() {
    let state = Value::object([("flag", Value::from(true)), ("a", Value::from(1)), ("b", Value::from(2))]);
    observe(&state, false);
    let obj = state.as_object().unwrap().clone();

    let runs = Rc::new(Cell::new(0));
    let runs_in_getter = runs.clone();
    let src = obj.clone();
    let watcher = Watcher::new(
        move || {
            runs_in_getter.set(runs_in_getter.get() + 1);
            Ok(if src.get("flag").truthy() { src.get("a") } else { src.get("b") })
        },
        None,
        WatcherOptions::sync(),
    )
    .unwrap();

    obj.set("flag", false).unwrap();
    assert_eq!(runs.get(), 2);
    assert!(!watcher.depends_on(&obj.property_dep("a").unwrap()));

    obj.set("a", 100).unwrap();
    assert_eq!(runs.get(), 2);
    obj.set("b", 200).unwrap();
    assert_eq!(runs.get(), 3);
}

/// A computed watcher without subscribers only re-evaluates on read.
#[test]
fn computed_watcher_is_lazy() {
    let state = Value::object([("n", 1)]);
    observe(&state, false);
    let obj = state.as_object().unwrap().clone();

    let evaluations = Rc::new(Cell::new(0));
    let counted = evaluations.clone();
    let src = obj.clone();
    let computed = Watcher::new(
        move || {
            counted.set(counted.get() + 1);
            Ok(Value::from(src.get("n").as_f64().unwrap_or(0.0) * 10.0))
        },
        None,
        WatcherOptions::computed(),
    )
    .unwrap();
    assert_eq!(evaluations.get(), 0);
    assert!(computed.is_dirty());

    assert_eq!(computed.evaluate().unwrap(), Value::from(10));
    obj.set("n", 2).unwrap();
    obj.set("n", 3).unwrap();
    obj.set("n", 4).unwrap();
    assert!(computed.is_dirty());
    assert_eq!(evaluations.get(), 1);

    assert_eq!(computed.evaluate().unwrap(), Value::from(40));
    assert_eq!(evaluations.get(), 2);
}

/// `set` and `del` on nested objects notify watchers of the object.
#[test]
fn explicit_set_and_delete_notify() {
    let state = Value::object([("user", Value::object([("name", "ada")]))]);
    observe(&state, false);
    let obj = state.as_object().unwrap().clone();
    let user = obj.get("user");

    let keys = Rc::new(RefCell::new(Vec::new()));
    let seen = keys.clone();
    let src = obj.clone();
    let _watcher = Watcher::new(
        move || Ok(src.get("user")),
        Some(Rc::new(move |new: &Value, _: &Value| {
            *seen.borrow_mut() = new.as_object().map(|o| o.keys()).unwrap_or_default();
            Ok(())
        })),
        WatcherOptions::sync(),
    )
    .unwrap();

    set(&user, "age", 36).unwrap();
    assert_eq!(*keys.borrow(), vec!["name", "age"]);
    assert!(user.as_object().unwrap().property_dep("age").is_some());

    del(&user, "name").unwrap();
    assert_eq!(*keys.borrow(), vec!["age"]);
}

/// A watcher that keeps re-triggering itself is stopped.
#[test]
fn runaway_watcher_is_cut_off() {
    let state = Value::object([("n", 0)]);
    observe(&state, false);
    let obj = state.as_object().unwrap().clone();

    let src = obj.clone();
    let writer = obj.clone();
    let _watcher = Watcher::new(
        move || Ok(src.get("n")),
        Some(Rc::new(move |new: &Value, _: &Value| {
            writer.set("n", new.as_f64().unwrap_or(0.0) + 1.0)?;
            Ok(())
        })),
        WatcherOptions::default(),
    )
    .unwrap();

    obj.set("n", 1).unwrap();
    scheduler::tick().unwrap();
    let n = obj.get_untracked("n").as_f64().unwrap();
    assert!(n > 100.0 && n < 110.0, "stopped at {n}");
}

/// An observed computed that recomputes to the same value does not
/// re-trigger the watchers reading it.
#[test]
fn unchanged_computed_does_not_propagate() {
    let state = Value::object([("n", 1)]);
    observe(&state, false);
    let obj = state.as_object().unwrap().clone();

    let src = obj.clone();
    let parity = Watcher::new(
        move || Ok(Value::from(src.get("n").as_i64().unwrap_or(0) % 2)),
        None,
        WatcherOptions::computed(),
    )
    .unwrap();

    let runs = Rc::new(Cell::new(0));
    let runs_in_getter = runs.clone();
    let upstream = parity.clone();
    let _reader = Watcher::new(
        move || {
            runs_in_getter.set(runs_in_getter.get() + 1);
            let value = upstream.evaluate()?;
            upstream.depend();
            Ok(value)
        },
        None,
        WatcherOptions::sync(),
    )
    .unwrap();
    assert_eq!(runs.get(), 1);

    obj.set("n", 3).unwrap();
    obj.set("n", 5).unwrap();
    assert_eq!(runs.get(), 1);
    assert_eq!(parity.value(), Value::from(1));

    obj.set("n", 4).unwrap();
    assert_eq!(runs.get(), 2);
    assert_eq!(parity.value(), Value::from(0));
}

/// Writing NaN over NaN is not a change.
#[test]
fn nan_over_nan_is_ignored() {
    let state = Value::object([("x", f64::NAN)]);
    observe(&state, false);
    let obj = state.as_object().unwrap().clone();

    let (count, callback) = counter();
    let src = obj.clone();
    let _watcher = Watcher::new(move || Ok(src.get("x")), Some(callback), WatcherOptions::sync()).unwrap();

    obj.set("x", f64::NAN).unwrap();
    assert_eq!(count.get(), 0);
    assert!(!scheduler::is_pending());

    obj.set("x", 1).unwrap();
    assert_eq!(count.get(), 1);
}

/// A non-configurable slot keeps its plain definition.
#[test]
fn non_configurable_slot_stays_plain() {
    let obj = ReactiveObject::new();
    obj.define_property(
        "fixed",
        1,
        PropertyFlags {
            enumerable: true,
            configurable: false,
        },
    );

    define_reactive(&obj, "fixed", Some(Value::from(2)));
    assert!(obj.property_dep("fixed").is_none());
    assert_eq!(obj.get_untracked("fixed"), Value::from(1));
}

/// An accessor slot is wrapped: reads go through its getter, writes
/// through its setter, and both are tracked.
#[test]
fn accessor_slot_is_wrapped() {
    let backing = Rc::new(RefCell::new(Value::from(20)));
    let obj = ReactiveObject::new();
    let read = backing.clone();
    let write = backing.clone();
    let getter: AccessorGetter = Rc::new(move || read.borrow().clone());
    let setter: AccessorSetter = Rc::new(move |value| *write.borrow_mut() = value);
    obj.define_accessor("celsius", getter, Some(setter), PropertyFlags::default());

    define_reactive(&obj, "celsius", None);
    assert!(obj.property_dep("celsius").is_some());

    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let src = obj.clone();
    let _watcher = Watcher::new(
        move || Ok(src.get("celsius")),
        Some(Rc::new(move |new: &Value, _: &Value| {
            log.borrow_mut().push(new.clone());
            Ok(())
        })),
        WatcherOptions::sync(),
    )
    .unwrap();

    obj.set("celsius", 30).unwrap();
    assert_eq!(*backing.borrow(), Value::from(30));
    assert_eq!(*seen.borrow(), vec![Value::from(30)]);

    // Same value through the getter: no write, no notification
    obj.set("celsius", 30).unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

/// `next_tick_future` resolves once the tick has run.
#[tokio::test]
async fn next_tick_future_resolves_after_tick() {
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    scheduler::next_tick(move || {
        flag.set(true);
        Ok(())
    });
    let done = scheduler::next_tick_future();
    scheduler::tick().unwrap();
    done.await;
    assert!(ran.get());
}
