//! Observers and the reactive property installer.
//!
//! # How Observation Works
//!
//! [`observe`] attaches an [`Observer`] to a container the first time it is
//! seen. Attaching walks the container: every enumerable key of an object
//! becomes a reactive property (with its own dep), and every element of an
//! array is observed in turn. The observer itself carries one more dep that
//! stands for the container's *shape*; it fires when keys are added or
//! removed through [`set`]/[`del`] and on every array mutation.
//!
//! A container is observed at most once. Frozen or non-extensible objects
//! are skipped.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::{Dep, ReactiveArray, ReactiveObject, Value};
use crate::error::{invariant, warn, Error};

/// Per-container metadata created on first observation.
pub struct Observer {
    dep: Dep,
    root_count: Cell<usize>,
}

impl Observer {
    fn new() -> Self {
        Self {
            dep: Dep::new(),
            root_count: Cell::new(0),
        }
    }

    /// Dep fired on structural change.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    /// How many component instances use this container as root state.
    pub fn root_count(&self) -> usize {
        self.root_count.get()
    }

    pub(crate) fn release_root(&self) {
        self.root_count.set(self.root_count.get().saturating_sub(1));
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("dep", &self.dep)
            .field("root_count", &self.root_count.get())
            .finish()
    }
}

/// Key accepted by [`set`] and [`del`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKey {
    Index(usize),
    Name(String),
}

impl PropertyKey {
    fn as_index(&self) -> Option<usize> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            PropertyKey::Name(name) => name.parse().ok(),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(i) => write!(f, "{i}"),
            PropertyKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for PropertyKey {
    fn from(i: usize) -> Self {
        PropertyKey::Index(i)
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::Name(name.to_owned())
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        PropertyKey::Name(name)
    }
}

/// Attach an observer to `value` if it is an observable container.
///
/// Returns the existing observer for already-observed containers. With
/// `as_root`, the container is marked as a component's root state.
pub fn observe(value: &Value, as_root: bool) -> Option<Rc<Observer>> {
    let ob = match value {
        Value::Object(obj) => match obj.observer() {
            Some(ob) => ob,
            None if obj.is_extensible() && !obj.is_frozen() => {
                let ob = Rc::new(Observer::new());
                obj.set_observer(ob.clone());
                walk(obj);
                ob
            }
            None => return None,
        },
        Value::Array(arr) => match arr.observer() {
            Some(ob) => ob,
            None if !arr.is_frozen() => {
                let ob = Rc::new(Observer::new());
                arr.set_observer(ob.clone());
                observe_all(&arr.to_vec());
                ob
            }
            None => return None,
        },
        _ => return None,
    };
    if as_root {
        ob.root_count.set(ob.root_count.get() + 1);
    }
    Some(ob)
}

fn walk(obj: &ReactiveObject) {
    for key in obj.enumerable_keys() {
        define_reactive(obj, &key, None);
    }
}

pub(crate) fn observe_all(items: &[Value]) {
    for item in items {
        observe(item, false);
    }
}

/// Make `key` on `obj` a reactive property.
///
/// With `value`, the slot is (re)initialized to it; otherwise the current
/// value is kept. Non-configurable slots are left alone. The resulting
/// value is observed deeply.
pub fn define_reactive(obj: &ReactiveObject, key: &str, value: Option<Value>) {
    if obj.is_configurable(key) == Some(false) {
        return;
    }
    let initial = obj.install_reactive(key, value, Dep::new());
    observe(&initial, false);
}

/// Subscribe the current watcher to every observed element of `arr`,
/// recursively, since element reads are not intercepted.
pub(crate) fn depend_array(arr: &ReactiveArray) {
    for item in arr.to_vec() {
        if let Some(ob) = item.observer() {
            ob.dep().depend();
        }
        if let Value::Array(inner) = &item {
            depend_array(inner);
        }
    }
}

/// Set a property on a container, adding it reactively if it is new.
///
/// New keys on an observed object become reactive properties and fire the
/// object's shape dep. Array indices go through `splice`, padding with
/// nulls when writing past the end.
pub fn set(target: &Value, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Result<Value, Error> {
    let key = key.into();
    let value = value.into();
    match target {
        Value::Array(arr) => {
            let Some(index) = key.as_index() else {
                warn(format!("cannot set non-index key \"{key}\" on an array"), None);
                return Ok(value);
            };
            arr.pad_to(index);
            arr.splice(index, 1, vec![value.clone()]);
            Ok(value)
        }
        Value::Object(obj) => {
            let name = key.to_string();
            if obj.has_own(&name) {
                obj.set(&name, value.clone())?;
                return Ok(value);
            }
            let ob = obj.observer();
            if ob.as_ref().map_or(false, |ob| ob.root_count() > 0) {
                invariant(Error::RootStateAddition(name))?;
                return Ok(value);
            }
            match ob {
                None => obj.set(&name, value.clone())?,
                Some(ob) => {
                    define_reactive(obj, &name, Some(value.clone()));
                    ob.dep().notify();
                }
            }
            Ok(value)
        }
        other => {
            invariant(Error::PrimitiveTarget(other.type_name().to_owned()))?;
            Ok(value)
        }
    }
}

/// Delete a property from a container, firing its shape dep when observed.
pub fn del(target: &Value, key: impl Into<PropertyKey>) -> Result<(), Error> {
    let key = key.into();
    match target {
        Value::Array(arr) => {
            if let Some(index) = key.as_index() {
                if index < arr.len() {
                    arr.splice(index, 1, Vec::new());
                }
            }
            Ok(())
        }
        Value::Object(obj) => {
            let name = key.to_string();
            let ob = obj.observer();
            if ob.as_ref().map_or(false, |ob| ob.root_count() > 0) {
                return invariant(Error::RootStateDeletion(name));
            }
            if !obj.has_own(&name) || obj.remove(&name)?.is_none() {
                return Ok(());
            }
            if let Some(ob) = ob {
                ob.dep().notify();
            }
            Ok(())
        }
        other => invariant(Error::PrimitiveTarget(other.type_name().to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    #[test]
    fn observe_is_idempotent() {
        let value = Value::object([("a", 1)]);
        let first = observe(&value, false).unwrap();
        let second = observe(&value, false).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn observe_walks_nested_containers() {
        let value = Value::object([("list", Value::array([Value::object([("x", 1)])]))]);
        observe(&value, false);

        let obj = value.as_object().unwrap();
        assert!(obj.property_dep("list").is_some());
        let list = obj.get_untracked("list");
        assert!(list.observer().is_some());
        assert!(list.as_array().unwrap().get(0).observer().is_some());
    }

    #[test]
    fn primitives_and_frozen_containers_are_not_observed() {
        assert!(observe(&Value::from(1), false).is_none());
        let frozen = ReactiveObject::new();
        frozen.freeze();
        assert!(observe(&Value::Object(frozen), false).is_none());
    }

    #[test]
    fn set_on_primitive_fails() {
        config::reset();
        let result = set(&Value::from("text"), "a", 1);
        assert!(matches!(result, Err(Error::PrimitiveTarget(_))));
    }

    #[test]
    fn set_adds_reactive_key_to_observed_object() {
        let value = Value::object([("a", 1)]);
        observe(&value, false);
        set(&value, "b", 2).unwrap();

        let obj = value.as_object().unwrap();
        assert!(obj.property_dep("b").is_some());
        assert_eq!(obj.get("b"), Value::from(2));
    }

    #[test]
    fn set_pads_arrays() {
        let value = Value::array([1]);
        set(&value, 3usize, 4).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr.to_vec(), vec![1.into(), Value::Null, Value::Null, 4.into()]);
    }

    #[test]
    fn root_state_rejects_structural_changes() {
        config::reset();
        let value = Value::object([("a", 1)]);
        observe(&value, true);
        assert!(matches!(set(&value, "b", 1), Err(Error::RootStateAddition(_))));
        assert!(matches!(del(&value, "a"), Err(Error::RootStateDeletion(_))));
    }

    #[test]
    fn del_removes_keys_and_indices() {
        let obj = Value::object([("a", 1), ("b", 2)]);
        del(&obj, "a").unwrap();
        assert_eq!(obj.as_object().unwrap().keys(), vec!["b"]);

        let arr = Value::array([1, 2, 3]);
        del(&arr, 1usize).unwrap();
        del(&arr, 10usize).unwrap();
        assert_eq!(arr.as_array().unwrap().len(), 2);
    }
}
