//! Vues Core
//!
//! This crate provides the core runtime for the Vues reactive component
//! framework. It implements:
//!
//! - Dependency-tracking reactivity over explicit reactive containers
//! - Watchers and a batching scheduler
//! - Virtual DOM creation and a keyed diff/patch algorithm
//! - Component instances with props, state, computed properties, watchers,
//!   events and lifecycle hooks
//!
//! Everything runs on one thread. Reactive state, scheduler queues and
//! configuration are per-thread.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: values, observers, deps and watchers
//! - `scheduler`: batched watcher flushes and the next-tick queue
//! - `vdom`: vnodes, the `h` builder, the patcher and its modules
//! - `dom`: the `NodeOps` backend seam and an in-memory DOM
//! - `instance`: component declarations and instances
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use vues_core::dom::MemoryDom;
//! use vues_core::instance::{Component, ComponentOptions};
//! use vues_core::vdom::{Patcher, VNodeData};
//!
//! let counter = ComponentOptions::new("counter")
//!     .state("count", 0)
//!     .render(|vm, h| {
//!         let text = vm.get("count").to_display_string();
//!         Ok(h.element("span", VNodeData::new(), vec![text.into()]).into())
//!     })
//!     .define();
//!
//! let dom = Rc::new(MemoryDom::new());
//! let target = dom.mount_point("div");
//! let vm = Component::new(&counter, Rc::new(Patcher::new(dom.clone()))).unwrap();
//! vm.mount(Some(target)).unwrap();
//! assert_eq!(dom.inner_html(dom.body()), "<span>0</span>");
//!
//! vm.set("count", 1).unwrap();
//! vues_core::scheduler::tick().unwrap();
//! assert_eq!(dom.inner_html(dom.body()), "<span>1</span>");
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod instance;
pub mod reactive;
pub mod scheduler;
pub mod util;
pub mod vdom;

pub use error::{BoxError, Error, HandlerResult};
pub use instance::{Component, ComponentCtor, ComponentOptions, LifecycleHook, Rendered};
pub use reactive::{ReactiveArray, ReactiveObject, Value, Watcher, WatcherOptions};
