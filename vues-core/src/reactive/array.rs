//! Reactive arrays.
//!
//! Element slots are not individually reactive. Instead every mutating
//! method observes the values it inserts and then notifies the array's own
//! observer dep, which every watcher that read the array through a
//! reactive property is subscribed to.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::observer::observe_all;
use super::{Observer, Value};

struct ArrayInner {
    items: RefCell<Vec<Value>>,
    observer: RefCell<Option<Rc<Observer>>>,
    frozen: Cell<bool>,
}

/// Shared handle to an ordered container.
#[derive(Clone)]
pub struct ReactiveArray(Rc<ArrayInner>);

impl ReactiveArray {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(ArrayInner {
            items: RefCell::new(items),
            observer: RefCell::new(None),
            frozen: Cell::new(false),
        }))
    }

    pub fn ptr_eq(&self, other: &ReactiveArray) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    /// Element at `index`, or `Null` when out of range.
    pub fn get(&self, index: usize) -> Value {
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    pub fn push(&self, value: impl Into<Value>) -> usize {
        self.extend(std::iter::once(value.into()))
    }

    /// Append several values with a single notification.
    pub fn extend(&self, values: impl IntoIterator<Item = Value>) -> usize {
        if self.is_frozen() {
            return self.len();
        }
        let inserted: Vec<Value> = values.into_iter().collect();
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.extend(inserted.iter().cloned());
            items.len()
        };
        self.mutated(&inserted);
        len
    }

    pub fn pop(&self) -> Option<Value> {
        if self.is_frozen() {
            return None;
        }
        let popped = self.0.items.borrow_mut().pop();
        self.mutated(&[]);
        popped
    }

    pub fn shift(&self) -> Option<Value> {
        if self.is_frozen() {
            return None;
        }
        let shifted = {
            let mut items = self.0.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.mutated(&[]);
        shifted
    }

    pub fn unshift(&self, values: Vec<Value>) -> usize {
        if self.is_frozen() {
            return self.len();
        }
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.splice(0..0, values.iter().cloned());
            items.len()
        };
        self.mutated(&values);
        len
    }

    /// Remove `delete_count` elements at `start` and insert `values` there.
    /// Both bounds are clamped to the array.
    pub fn splice(&self, start: usize, delete_count: usize, values: Vec<Value>) -> Vec<Value> {
        if self.is_frozen() {
            return Vec::new();
        }
        let removed = {
            let mut items = self.0.items.borrow_mut();
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, values.iter().cloned()).collect()
        };
        self.mutated(&values);
        removed
    }

    /// Sort by display string with nulls last.
    pub fn sort(&self) {
        self.sort_by(|a, b| match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.to_display_string().cmp(&b.to_display_string()),
        });
    }

    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        if self.is_frozen() {
            return;
        }
        self.0.items.borrow_mut().sort_by(compare);
        self.mutated(&[]);
    }

    pub fn reverse(&self) {
        if self.is_frozen() {
            return;
        }
        self.0.items.borrow_mut().reverse();
        self.mutated(&[]);
    }

    /// Forbid mutation. Frozen arrays are never observed or traversed.
    pub fn freeze(&self) {
        self.0.frozen.set(true);
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

    /// Grow to `len` with nulls, silently.
    pub(crate) fn pad_to(&self, len: usize) {
        let mut items = self.0.items.borrow_mut();
        if items.len() < len {
            items.resize(len, Value::Null);
        }
    }

    fn mutated(&self, inserted: &[Value]) {
        if let Some(ob) = self.observer() {
            observe_all(inserted);
            ob.dep().notify();
        }
    }
}

impl Default for ReactiveArray {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Value> for ReactiveArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl fmt::Debug for ReactiveArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}
