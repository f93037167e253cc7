//! Component Instances
//!
//! A [`Component`] ties the rest of the crate together. It owns its
//! reactive props and state, its computed and user watchers, the single
//! render watcher that re-renders it, its child instances, and the vnode
//! tree it last rendered.
//!
//! # Lifecycle
//!
//! ```text
//! beforeCreate -> (props, state, computed, watch) -> created
//!   -> beforeMount -> render watcher -> mounted
//!   -> beforeUpdate / updated (repeated)
//!   -> beforeDestroy -> teardown -> destroyed
//! ```
//!
//! Every hook also emits an event named `hook:<name>` on the instance.
//!
//! # Ownership
//!
//! A parent owns its children through the vnodes it rendered and its
//! child list. Links pointing upward (`parent`, a vnode's context, a
//! watcher's owner) are weak, and teardown clears the rest.

mod events;
mod lifecycle;
mod options;
mod render;
mod state;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

pub(crate) use lifecycle::active_instance;
pub use options::{
    ComponentCtor, ComponentOptions, ComputedGetter, ComputedSetter, ComputedSpec, HookFn, LifecycleHook, PropSpec,
    RenderFn, Rendered, WatchHandler, WatchSpec,
};
pub use state::{WatchHandle, WatchOptions, WatchSource};

use crate::dom::NodeId;
use crate::reactive::{ReactiveObject, Watcher, WatcherId};
use crate::vdom::{InsertQueue, Listener, Patcher, VNode};

static NEXT_UID: AtomicU64 = AtomicU64::new(0);

/// What a `ref` name points at.
#[derive(Clone, PartialEq)]
pub enum RefTarget {
    Element(NodeId),
    Component(Component),
}

/// A registered ref: one target, or a list for refs inside loops.
#[derive(Clone, PartialEq)]
pub enum RefValue {
    Single(RefTarget),
    List(Vec<RefTarget>),
}

pub(crate) struct EventHandler {
    callback: Listener,
    /// Handler the caller registered, when `callback` wraps it.
    original: Option<Listener>,
}

pub(crate) struct ComponentInner {
    uid: u64,
    options: ComponentCtor,
    patcher: Rc<Patcher>,
    props: ReactiveObject,
    state: ReactiveObject,
    computed: RefCell<IndexMap<String, Watcher>>,
    provided_props: RefCell<Vec<String>>,
    watchers: RefCell<Vec<Watcher>>,
    render_watcher: RefCell<Option<Watcher>>,
    parent: RefCell<Option<WeakComponent>>,
    children: RefCell<Vec<Component>>,
    /// Root of the last rendered tree.
    vnode: RefCell<Option<VNode>>,
    /// Root created mid-patch, readable until the patch stores it in `vnode`.
    rendering: RefCell<Option<VNode>>,
    /// Childless copy of the placeholder this instance was created for.
    placeholder: RefCell<Option<VNode>>,
    slot_children: RefCell<Vec<VNode>>,
    el: Cell<Option<NodeId>>,
    events: RefCell<IndexMap<String, Vec<EventHandler>>>,
    parent_listeners: RefCell<IndexMap<String, (Rc<RefCell<Vec<Listener>>>, Listener)>>,
    refs: RefCell<IndexMap<String, RefValue>>,
    pending_insert: RefCell<InsertQueue>,
    mounted: Cell<bool>,
    being_destroyed: Cell<bool>,
    destroyed: Cell<bool>,
}

/// Shared handle to a component instance.
#[derive(Clone)]
pub struct Component(Rc<ComponentInner>);

/// Non-owning handle to a component instance.
#[derive(Clone)]
pub struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(Component)
    }
}

impl fmt::Debug for WeakComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(vm) => write!(f, "WeakComponent({})", vm.display_name()),
            None => f.write_str("WeakComponent(<dropped>)"),
        }
    }
}

impl Component {
    pub fn uid(&self) -> u64 {
        self.0.uid
    }

    pub fn options(&self) -> &ComponentOptions {
        &self.0.options
    }

    pub fn ctor(&self) -> &ComponentCtor {
        &self.0.options
    }

    pub fn patcher(&self) -> &Rc<Patcher> {
        &self.0.patcher
    }

    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// `<name>` for warnings, `<Anonymous>` when unnamed.
    pub fn display_name(&self) -> String {
        match self.0.options.name() {
            Some(name) => format!("<{name}>"),
            None if self.parent().is_none() => "<Root>".to_owned(),
            None => "<Anonymous>".to_owned(),
        }
    }

    /// Root DOM node, once rendered.
    pub fn el(&self) -> Option<NodeId> {
        let from_tree = self
            .0
            .vnode
            .try_borrow()
            .ok()
            .and_then(|vnode| vnode.as_ref().and_then(VNode::elm));
        from_tree.or(self.0.el.get())
    }

    pub(crate) fn set_el(&self, el: Option<NodeId>) {
        self.0.el.set(el);
    }

    pub fn parent(&self) -> Option<Component> {
        self.0.parent.borrow().as_ref().and_then(WeakComponent::upgrade)
    }

    pub fn root(&self) -> Component {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn children(&self) -> Vec<Component> {
        self.0.children.borrow().clone()
    }

    pub(crate) fn remove_child(&self, child: &Component) {
        self.0.children.borrow_mut().retain(|c| !c.ptr_eq(child));
    }

    pub fn is_mounted(&self) -> bool {
        self.0.mounted.get()
    }

    pub fn is_being_destroyed(&self) -> bool {
        self.0.being_destroyed.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }

    pub fn render_watcher_id(&self) -> Option<WatcherId> {
        self.0.render_watcher.borrow().as_ref().map(Watcher::id)
    }

    pub(crate) fn remove_watcher(&self, id: WatcherId) {
        self.0.watchers.borrow_mut().retain(|w| w.id() != id);
    }

    /// Run `f` on the last rendered root vnode.
    ///
    /// While this instance is being patched, only a root that replaced the
    /// old element is visible. Otherwise this is `None` until the patch ends.
    pub fn with_root_vnode<R>(&self, f: impl FnOnce(&VNode) -> R) -> Option<R> {
        if let Some(vnode) = self.0.vnode.try_borrow().ok()?.as_ref() {
            return Some(f(vnode));
        }
        let rendering = self.0.rendering.try_borrow().ok()?;
        rendering.as_ref().map(f)
    }

    pub(crate) fn set_rendering(&self, root: Option<VNode>) {
        *self.0.rendering.borrow_mut() = root;
    }

    /// Run `f` on the placeholder vnode standing for this instance in its
    /// parent's tree.
    pub fn with_placeholder<R>(&self, f: impl FnOnce(&VNode) -> R) -> Option<R> {
        let placeholder = self.0.placeholder.try_borrow().ok()?;
        placeholder.as_ref().map(f)
    }

    /// The placeholder bound to this instance and its current element.
    pub(crate) fn placeholder_vnode(&self) -> Option<VNode> {
        let mut vnode = self.with_placeholder(VNode::snapshot)?;
        vnode.component_instance = Some(self.clone());
        vnode.elm = self.el();
        Some(vnode)
    }

    pub(crate) fn placeholder_ns(&self) -> Option<String> {
        self.with_placeholder(|p| p.ns.clone()).flatten()
    }

    pub fn refs(&self) -> IndexMap<String, RefValue> {
        self.0.refs.borrow().clone()
    }

    pub fn get_ref(&self, name: &str) -> Option<RefValue> {
        self.0.refs.borrow().get(name).cloned()
    }

    pub(crate) fn register_ref(&self, name: &str, target: RefTarget, in_for: bool) {
        let mut refs = self.0.refs.borrow_mut();
        if !in_for {
            refs.insert(name.to_owned(), RefValue::Single(target));
            return;
        }
        match refs.get_mut(name) {
            Some(RefValue::List(list)) => {
                if !list.contains(&target) {
                    list.push(target);
                }
            }
            _ => {
                refs.insert(name.to_owned(), RefValue::List(vec![target]));
            }
        }
    }

    pub(crate) fn unregister_ref(&self, name: &str, target: &RefTarget) {
        let mut refs = self.0.refs.borrow_mut();
        let remove = match refs.get_mut(name) {
            Some(RefValue::Single(current)) => current == target,
            Some(RefValue::List(list)) => {
                list.retain(|t| t != target);
                false
            }
            None => false,
        };
        if remove {
            refs.shift_remove(name);
        }
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("uid", &self.0.uid)
            .field("name", &self.0.options.name())
            .field("mounted", &self.0.mounted.get())
            .field("destroyed", &self.0.destroyed.get())
            .finish_non_exhaustive()
    }
}

fn next_uid() -> u64 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}
