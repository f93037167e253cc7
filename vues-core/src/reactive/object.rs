//! Reactive objects.
//!
//! A [`ReactiveObject`] is an ordered string-keyed map whose slots can be
//! plain data, accessors, or reactive properties. A reactive property
//! carries its own [`Dep`]; reading it inside a watcher subscribes the
//! watcher, writing a different value notifies.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::observer::{depend_array, observe};
use super::{Dep, Observer, ReactiveContext, Value};
use crate::error::{invariant, Error};

/// Custom read accessor.
pub type Getter = Rc<dyn Fn() -> Value>;

/// Custom write accessor.
pub type Setter = Rc<dyn Fn(Value)>;

/// Attributes of a property slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags {
    pub enumerable: bool,
    pub configurable: bool,
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self {
            enumerable: true,
            configurable: true,
        }
    }
}

#[derive(Clone)]
struct Slot {
    value: Value,
    getter: Option<Getter>,
    setter: Option<Setter>,
    dep: Option<Dep>,
    flags: PropertyFlags,
}

impl Slot {
    fn data(value: Value, flags: PropertyFlags) -> Self {
        Self {
            value,
            getter: None,
            setter: None,
            dep: None,
            flags,
        }
    }
}

struct ObjectInner {
    slots: RefCell<IndexMap<String, Slot>>,
    observer: RefCell<Option<Rc<Observer>>>,
    extensible: Cell<bool>,
    frozen: Cell<bool>,
}

/// Shared handle to a keyed container.
#[derive(Clone)]
pub struct ReactiveObject(Rc<ObjectInner>);

impl ReactiveObject {
    pub fn new() -> Self {
        Self(Rc::new(ObjectInner {
            slots: RefCell::new(IndexMap::new()),
            observer: RefCell::new(None),
            extensible: Cell::new(true),
            frozen: Cell::new(false),
        }))
    }

    pub fn ptr_eq(&self, other: &ReactiveObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Read a key. Missing keys read as `Null`.
    ///
    /// Reactive properties register with the current watcher, including the
    /// shape dep of a container value so that `set`/`del` on it re-trigger.
    pub fn get(&self, key: &str) -> Value {
        let (getter, stored, dep) = {
            let slots = self.0.slots.borrow();
            match slots.get(key) {
                None => return Value::Null,
                Some(slot) => (slot.getter.clone(), slot.value.clone(), slot.dep.clone()),
            }
        };
        let value = match getter {
            Some(getter) => getter(),
            None => stored,
        };

        if let Some(dep) = dep {
            if ReactiveContext::is_active() {
                dep.depend();
                if let Some(child) = value.observer() {
                    child.dep().depend();
                    if let Value::Array(items) = &value {
                        depend_array(items);
                    }
                }
            }
        }
        value
    }

    /// Read a key without registering any dependency.
    pub fn get_untracked(&self, key: &str) -> Value {
        let _quiet = ReactiveContext::untracked();
        self.get(key)
    }

    /// Write a key.
    ///
    /// Reactive properties skip identical writes, observe the new value and
    /// notify. Missing keys are added as plain data, except on root state
    /// where new keys must be declared upfront.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        let existing = {
            let slots = self.0.slots.borrow();
            slots
                .get(key)
                .map(|slot| (slot.getter.clone(), slot.setter.clone(), slot.dep.clone(), slot.value.clone()))
        };

        let Some((getter, setter, dep, stored)) = existing else {
            return self.insert_plain(key, value);
        };

        if dep.is_some() {
            let current = match &getter {
                Some(getter) => {
                    let _quiet = ReactiveContext::untracked();
                    getter()
                }
                None => stored,
            };
            if value.same_value(&current) {
                return Ok(());
            }
        }

        match (getter, setter) {
            (_, Some(setter)) => setter(value.clone()),
            (Some(_), None) => return Ok(()),
            (None, None) => {
                if self.0.frozen.get() {
                    return Ok(());
                }
                if let Some(slot) = self.0.slots.borrow_mut().get_mut(key) {
                    slot.value = value.clone();
                }
            }
        }

        if let Some(dep) = dep {
            observe(&value, false);
            dep.notify();
        }
        Ok(())
    }

    fn is_root_state(&self) -> bool {
        self.observer().map_or(false, |ob| ob.root_count() > 0)
    }

    fn insert_plain(&self, key: &str, value: Value) -> Result<(), Error> {
        if !self.0.extensible.get() {
            return Ok(());
        }
        if self.is_root_state() {
            return invariant(Error::RootStateAddition(key.to_owned()));
        }
        self.0
            .slots
            .borrow_mut()
            .insert(key.to_owned(), Slot::data(value, PropertyFlags::default()));
        Ok(())
    }

    /// Remove a key and return its stored value. No notification.
    ///
    /// Root state keeps its shape: removing from it is a
    /// [`RootStateDeletion`](Error::RootStateDeletion) error.
    pub fn remove(&self, key: &str) -> Result<Option<Value>, Error> {
        if self.is_root_state() && self.has_own(key) {
            invariant(Error::RootStateDeletion(key.to_owned()))?;
            return Ok(None);
        }
        let mut slots = self.0.slots.borrow_mut();
        match slots.get(key) {
            Some(slot) if slot.flags.configurable => Ok(slots.shift_remove(key).map(|slot| slot.value)),
            _ => Ok(None),
        }
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.0.slots.borrow().contains_key(key)
    }

    /// All own keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.slots.borrow().keys().cloned().collect()
    }

    pub fn enumerable_keys(&self) -> Vec<String> {
        self.0
            .slots
            .borrow()
            .iter()
            .filter(|(_, slot)| slot.flags.enumerable)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.slots.borrow().is_empty()
    }

    /// Enumerable entries read without tracking.
    pub fn entries_untracked(&self) -> Vec<(String, Value)> {
        let _quiet = ReactiveContext::untracked();
        self.enumerable_keys()
            .into_iter()
            .map(|key| {
                let value = self.get(&key);
                (key, value)
            })
            .collect()
    }

    /// Install or replace a plain data slot.
    ///
    /// Replacing a reactive property drops its dep, like redefining a
    /// property descriptor would.
    pub fn define_property(&self, key: &str, value: impl Into<Value>, flags: PropertyFlags) {
        let mut slots = self.0.slots.borrow_mut();
        if let Some(slot) = slots.get(key) {
            if !slot.flags.configurable {
                return;
            }
        } else if !self.0.extensible.get() {
            return;
        }
        slots.insert(key.to_owned(), Slot::data(value.into(), flags));
    }

    /// Install or replace an accessor slot.
    pub fn define_accessor(&self, key: &str, getter: Getter, setter: Option<Setter>, flags: PropertyFlags) {
        let mut slots = self.0.slots.borrow_mut();
        if let Some(slot) = slots.get(key) {
            if !slot.flags.configurable {
                return;
            }
        } else if !self.0.extensible.get() {
            return;
        }
        slots.insert(
            key.to_owned(),
            Slot {
                value: Value::Null,
                getter: Some(getter),
                setter,
                dep: None,
                flags,
            },
        );
    }

    /// Forbid new keys.
    pub fn prevent_extensions(&self) {
        self.0.extensible.set(false);
    }

    /// Forbid new keys, deletion, and plain writes. Frozen objects are
    /// never observed and never traversed.
    pub fn freeze(&self) {
        self.0.extensible.set(false);
        self.0.frozen.set(true);
        for slot in self.0.slots.borrow_mut().values_mut() {
            slot.flags.configurable = false;
        }
    }

    pub fn is_extensible(&self) -> bool {
        self.0.extensible.get()
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen.get()
    }

    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.observer.borrow().clone()
    }

    pub(crate) fn set_observer(&self, ob: Rc<Observer>) {
        *self.0.observer.borrow_mut() = Some(ob);
    }

    /// `None` when the key is missing.
    pub(crate) fn is_configurable(&self, key: &str) -> Option<bool> {
        self.0.slots.borrow().get(key).map(|slot| slot.flags.configurable)
    }

    /// Turn a slot into a reactive property guarded by `dep`.
    ///
    /// Returns the value that should be observed, or `Null` for a
    /// getter-only accessor whose value is never captured.
    pub(crate) fn install_reactive(&self, key: &str, value: Option<Value>, dep: Dep) -> Value {
        let accessor = {
            let mut slots = self.0.slots.borrow_mut();
            match slots.get_mut(key) {
                Some(slot) => {
                    if let (Some(value), None) = (value, &slot.getter) {
                        slot.value = value;
                    }
                    slot.dep = Some(dep);
                    slot.flags = PropertyFlags::default();
                    match (&slot.getter, &slot.setter) {
                        (Some(_), None) => return Value::Null,
                        (None, _) => return slot.value.clone(),
                        (Some(getter), Some(_)) => getter.clone(),
                    }
                }
                None => {
                    if !self.0.extensible.get() {
                        return Value::Null;
                    }
                    let value = value.unwrap_or_default();
                    slots.insert(
                        key.to_owned(),
                        Slot {
                            dep: Some(dep),
                            ..Slot::data(value.clone(), PropertyFlags::default())
                        },
                    );
                    return value;
                }
            }
        };
        let _quiet = ReactiveContext::untracked();
        accessor()
    }

    /// Dep guarding `key`, if it is a reactive property.
    pub fn property_dep(&self, key: &str) -> Option<Dep> {
        self.0.slots.borrow().get(key).and_then(|slot| slot.dep.clone())
    }
}

impl Default for ReactiveObject {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ReactiveObject {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let obj = ReactiveObject::new();
        {
            let mut slots = obj.0.slots.borrow_mut();
            for (key, value) in iter {
                slots.insert(key.into(), Slot::data(value.into(), PropertyFlags::default()));
            }
        }
        obj
    }
}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries_untracked()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_slots_read_and_write() {
        let obj: ReactiveObject = [("a", 1)].into_iter().collect();
        assert_eq!(obj.get("a"), Value::from(1));
        assert_eq!(obj.get("missing"), Value::Null);

        obj.set("b", "two").unwrap();
        assert_eq!(obj.keys(), vec!["a", "b"]);
        assert_eq!(obj.remove("a").unwrap(), Some(Value::from(1)));
        assert!(!obj.has_own("a"));
    }

    #[test]
    fn accessor_slots_route_through_closures() {
        let backing = Rc::new(RefCell::new(Value::from(1)));
        let obj = ReactiveObject::new();
        let read = backing.clone();
        let write = backing.clone();
        obj.define_accessor(
            "x",
            Rc::new(move || read.borrow().clone()),
            Some(Rc::new(move |v| *write.borrow_mut() = v)),
            PropertyFlags::default(),
        );

        obj.set("x", 5).unwrap();
        assert_eq!(obj.get("x"), Value::from(5));
        assert_eq!(*backing.borrow(), Value::from(5));
    }

    #[test]
    fn frozen_objects_ignore_writes_and_additions() {
        let obj: ReactiveObject = [("a", 1)].into_iter().collect();
        obj.freeze();
        obj.set("a", 2).unwrap();
        obj.set("b", 3).unwrap();
        assert_eq!(obj.get("a"), Value::from(1));
        assert!(!obj.has_own("b"));
        assert_eq!(obj.remove("a").unwrap(), None);
    }

    #[test]
    fn non_enumerable_slots_are_hidden_from_entries() {
        let obj = ReactiveObject::new();
        obj.define_property(
            "hidden",
            1,
            PropertyFlags {
                enumerable: false,
                configurable: true,
            },
        );
        obj.set("shown", 2).unwrap();
        assert_eq!(obj.enumerable_keys(), vec!["shown"]);
        assert_eq!(obj.keys().len(), 2);
    }

    #[test]
    fn root_state_keeps_its_shape() {
        crate::config::reset();
        let state = Value::object([("a", 1)]);
        observe(&state, true);
        let obj = state.as_object().unwrap();

        assert!(matches!(obj.set("b", 2), Err(Error::RootStateAddition(key)) if key == "b"));
        assert!(matches!(obj.remove("a"), Err(Error::RootStateDeletion(key)) if key == "a"));
        assert_eq!(obj.keys(), vec!["a"]);
        // Existing keys stay writable
        obj.set("a", 5).unwrap();
        assert_eq!(obj.get_untracked("a"), Value::from(5));

        crate::config::configure(|c| c.settings.production = true);
        assert_eq!(obj.remove("a").unwrap(), None);
        obj.set("b", 2).unwrap();
        assert_eq!(obj.keys(), vec!["a"]);
        crate::config::reset();
    }
}
