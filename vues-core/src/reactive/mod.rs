//! Reactive State
//!
//! This module implements dependency tracking for plain data: deps,
//! observers, reactive containers and watchers.
//!
//! # Concepts
//!
//! ## Deps
//!
//! A [`Dep`] is a subscription list standing for one observable thing.
//! Each reactive property owns one, and so does each observed container
//! (for its shape) and each computed watcher (for its value).
//!
//! ## Observation
//!
//! [`observe`] converts a container in place: object keys become reactive
//! properties, array elements are observed recursively, and array mutators
//! notify. Containers are shared handles, so every clone of an observed
//! [`Value`] sees the same reactive slots.
//!
//! ## Watchers
//!
//! A [`Watcher`] runs a getter with itself as the current target. Every
//! reactive read during that run subscribes the watcher. When a dep fires,
//! the watcher is queued with the scheduler, run synchronously, or (for
//! computed watchers) marked dirty.
//!
//! # Implementation Notes
//!
//! The current target lives on a thread-local stack (see
//! [`ReactiveContext`]). Everything here is single-threaded: handles are
//! `Rc` and interior state is `RefCell`/`Cell`. Deps hold watchers weakly
//! so that a dropped watcher simply stops receiving notifications.

mod array;
mod context;
mod dep;
mod object;
mod observer;
mod subscriber;
mod value;
mod watcher;

pub use array::ReactiveArray;
pub use context::ReactiveContext;
pub use dep::{Dep, DepId};
pub use object::{Getter as AccessorGetter, PropertyFlags, ReactiveObject, Setter as AccessorSetter};
pub use observer::{define_reactive, del, observe, set, Observer, PropertyKey};
pub use subscriber::{Subscriber, WatcherId};
pub use value::Value;
pub use watcher::{traverse, Getter, WatchCallback, Watcher, WatcherOptions};
