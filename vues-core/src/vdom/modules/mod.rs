//! Patch Modules
//!
//! Modules apply one aspect of vnode data to real nodes: attributes,
//! classes, styles, DOM listeners, refs, directives. The patcher calls each
//! module at fixed points of a node's life:
//!
//! - `create` after the node and its children exist, before insertion
//! - `update` when a vnode is patched against its previous version
//! - `post_patch` after the node's children have been patched
//! - `destroy` when the node leaves the tree
//!
//! Modules only write when the data actually changed, so patching a tree
//! against an identical one is free.

mod attrs;
mod class;
mod directives;
mod events;
mod refs;
mod style;

pub use attrs::AttrsModule;
pub use class::ClassModule;
pub use directives::{Directive, DirectiveBinding, DirectiveHook, DirectivesModule};
pub use events::EventsModule;
pub(crate) use refs::register_ref;
pub use refs::RefsModule;
pub use style::StyleModule;

use crate::dom::NodeOps;
use crate::vdom::patch::InsertQueue;
use crate::vdom::VNode;

/// What a module can reach while a patch is running.
pub struct PatchContext<'a> {
    pub ops: &'a dyn NodeOps,
    pub(crate) queue: &'a mut InsertQueue,
}

impl PatchContext<'_> {
    /// Run `f` once the whole patch has been applied and new nodes are
    /// attached.
    pub fn defer(&mut self, f: impl FnOnce() + 'static) {
        self.queue.push_callback(Box::new(f));
    }
}

/// One aspect of vnode data applied to the DOM.
pub trait Module {
    fn create(&self, cx: &mut PatchContext<'_>, vnode: &VNode) {
        let _ = (cx, vnode);
    }

    fn update(&self, cx: &mut PatchContext<'_>, old: &VNode, vnode: &VNode) {
        let _ = (cx, old, vnode);
    }

    fn post_patch(&self, cx: &mut PatchContext<'_>, old: &VNode, vnode: &VNode) {
        let _ = (cx, old, vnode);
    }

    fn destroy(&self, ops: &dyn NodeOps, vnode: &VNode) {
        let _ = (ops, vnode);
    }
}

/// The standard module set, in application order.
pub fn default_modules() -> Vec<Box<dyn Module>> {
    vec![
        Box::new(AttrsModule),
        Box::new(ClassModule),
        Box::new(EventsModule::default()),
        Box::new(StyleModule),
        Box::new(RefsModule),
        Box::new(DirectivesModule),
    ]
}
