//! Virtual DOM
//!
//! Render functions build a [`VNode`] tree through [`CreateElement`]; the
//! [`Patcher`] reconciles it with the previous tree and applies the
//! difference to a [`NodeOps`](crate::dom::NodeOps) backend. Per-aspect
//! work (attributes, classes, styles, listeners, refs, directives) lives in
//! [`modules`].

mod create_component;
mod create_element;
pub mod modules;
pub mod patch;
mod vnode;

pub use create_component::{create_component, ComponentVNodeOptions};
pub use create_element::{normalize_children, Child, CreateElement, Tag};
pub use patch::{same_vnode, InsertQueue, OldRoot, Patcher};
pub(crate) use vnode::listener_invoker;
pub use vnode::{listener, ClassBinding, Key, Listener, VNode, VNodeData, VNodeDirective, VNodeHook, VNodeHooks};
