use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use super::{next_uid, Component, ComponentCtor, ComponentInner, LifecycleHook};
use crate::error::{handle_error, warn, BoxError, Error, HandlerResult};
use crate::reactive::{ReactiveContext, ReactiveObject, Value, Watcher, WatcherOptions};
use crate::scheduler;
use crate::vdom::{InsertQueue, OldRoot, Patcher, VNode};

thread_local! {
    static ACTIVE_INSTANCE: RefCell<Vec<Component>> = RefCell::new(Vec::new());
}

/// The instance whose tree is being patched. Child components created by
/// the patch attach to it.
pub(crate) fn active_instance() -> Option<Component> {
    ACTIVE_INSTANCE.with(|stack| stack.borrow().last().cloned())
}

struct ActiveInstance;

impl ActiveInstance {
    fn enter(vm: &Component) -> Self {
        ACTIVE_INSTANCE.with(|stack| stack.borrow_mut().push(vm.clone()));
        ActiveInstance
    }
}

impl Drop for ActiveInstance {
    fn drop(&mut self) {
        ACTIVE_INSTANCE.with(|stack| stack.borrow_mut().pop());
    }
}

impl Component {
    /// Create a root instance. Hooks up to `created` run immediately.
    pub fn new(ctor: &ComponentCtor, patcher: Rc<Patcher>) -> Result<Component, Error> {
        Self::build(ctor.clone(), patcher, None, None, IndexMap::new())
    }

    /// Create a root instance with prop values.
    pub fn with_props<K, V>(
        ctor: &ComponentCtor,
        patcher: Rc<Patcher>,
        props: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Component, Error>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let props = props.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self::build(ctor.clone(), patcher, None, None, props)
    }

    fn build(
        ctor: ComponentCtor,
        patcher: Rc<Patcher>,
        parent: Option<&Component>,
        placeholder: Option<&VNode>,
        props_data: IndexMap<String, Value>,
    ) -> Result<Component, Error> {
        let slot_children = placeholder
            .and_then(|p| p.component_options.as_ref())
            .map(|opts| opts.children.iter().map(VNode::clone_fresh).collect())
            .unwrap_or_default();
        let vm = Component(Rc::new(ComponentInner {
            uid: next_uid(),
            options: ctor,
            patcher,
            props: ReactiveObject::new(),
            state: ReactiveObject::new(),
            computed: RefCell::new(IndexMap::new()),
            provided_props: RefCell::new(Vec::new()),
            watchers: RefCell::new(Vec::new()),
            render_watcher: RefCell::new(None),
            parent: RefCell::new(parent.map(Component::downgrade)),
            children: RefCell::new(Vec::new()),
            vnode: RefCell::new(None),
            rendering: RefCell::new(None),
            placeholder: RefCell::new(placeholder.map(store_placeholder)),
            slot_children: RefCell::new(slot_children),
            el: Cell::new(None),
            events: RefCell::new(IndexMap::new()),
            parent_listeners: RefCell::new(IndexMap::new()),
            refs: RefCell::new(IndexMap::new()),
            pending_insert: RefCell::new(InsertQueue::default()),
            mounted: Cell::new(false),
            being_destroyed: Cell::new(false),
            destroyed: Cell::new(false),
        }));
        if let Some(parent) = parent {
            parent.0.children.borrow_mut().push(vm.clone());
        }
        tracing::debug!(uid = vm.0.uid, name = %vm.display_name(), "component created");

        if let Some(opts) = placeholder.and_then(|p| p.component_options.as_ref()) {
            vm.update_parent_listeners(&opts.listeners);
        }
        vm.call_hook(LifecycleHook::BeforeCreate);
        vm.init_props(&props_data);
        vm.init_state()?;
        vm.init_computed()?;
        vm.init_watch()?;
        vm.call_hook(LifecycleHook::Created);
        Ok(vm)
    }

    /// Instantiate the child component described by the placeholder `vnode`.
    pub(crate) fn create_child(host: &Component, vnode: &VNode) -> Result<Component, Error> {
        let opts = vnode
            .component_options
            .as_ref()
            .ok_or_else(|| Error::OrphanComponent(vnode.tag.clone().unwrap_or_default()))?;
        Self::build(
            opts.ctor.clone(),
            host.0.patcher.clone(),
            Some(host),
            Some(vnode),
            opts.props_data.clone(),
        )
    }

    /// Mount a root instance. With `el`, the rendered tree replaces that
    /// element; without, it stays detached.
    pub fn mount(&self, el: Option<crate::dom::NodeId>) -> Result<(), Error> {
        if self.is_destroyed() {
            return Err(Error::Destroyed(self.display_name()));
        }
        self.0.el.set(el);
        self.mount_component()?;
        if self.0.placeholder.borrow().is_none() {
            self.0.mounted.set(true);
            self.call_hook(LifecycleHook::Mounted);
        }
        Ok(())
    }

    /// Mount as a child during the parent's patch. The returned queue holds
    /// the insert hooks of this subtree, for the parent's patch to run.
    pub(crate) fn mount_as_child(&self) -> Result<InsertQueue, Error> {
        self.mount_component()?;
        Ok(std::mem::take(&mut *self.0.pending_insert.borrow_mut()))
    }

    fn mount_component(&self) -> Result<(), Error> {
        if self.0.options.render_fn().is_none() {
            warn("Failed to mount component: template or render function not defined.", Some(self));
        }
        self.call_hook(LifecycleHook::BeforeMount);

        let weak = self.downgrade();
        let getter = Rc::new(move || -> Result<Value, BoxError> {
            if let Some(vm) = weak.upgrade() {
                if let Some(vnode) = vm.render() {
                    vm.update(vnode)?;
                }
            }
            Ok(Value::Null)
        });
        let weak = self.downgrade();
        let before: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(vm) = weak.upgrade() {
                if vm.is_mounted() && !vm.is_destroyed() {
                    vm.call_hook(LifecycleHook::BeforeUpdate);
                }
            }
        });
        let options = WatcherOptions {
            before: Some(before),
            ..WatcherOptions::default()
        };
        let expression = format!("render {}", self.display_name());
        let watcher = Watcher::build(getter, expression, None, options, Some(self.downgrade()), true)?;
        *self.0.render_watcher.borrow_mut() = Some(watcher);
        Ok(())
    }

    /// Patch `vnode` against the previous tree and make it current.
    fn update(&self, mut vnode: VNode) -> Result<(), Error> {
        if self.0.placeholder.borrow().is_some() {
            vnode.parent = Some(self.downgrade());
        }
        let prev = self.0.vnode.borrow_mut().take();
        let initial = prev.is_none();
        let old = match prev {
            Some(prev) => Some(OldRoot::VNode(prev)),
            None => self.0.el.get().map(OldRoot::Element),
        };

        let patched = {
            let _active = ActiveInstance::enter(self);
            self.0.patcher.patch_root(old, Some(&mut vnode))
        };
        self.0.el.set(vnode.elm());
        self.set_rendering(None);
        *self.0.vnode.borrow_mut() = Some(vnode);
        let (_, queue) = patched?;

        if initial && self.0.placeholder.borrow().is_some() {
            self.0.pending_insert.borrow_mut().append(queue);
        } else {
            queue.flush();
        }
        tracing::trace!(uid = self.0.uid, initial, "component patched");
        Ok(())
    }

    /// Called once this instance's element is attached to the document.
    pub(crate) fn on_inserted(&self) {
        if !self.0.mounted.get() && !self.is_destroyed() {
            self.0.mounted.set(true);
            self.call_hook(LifecycleHook::Mounted);
        }
    }

    /// Queue a re-render even though no tracked state changed.
    pub fn force_update(&self) {
        let watcher = self.0.render_watcher.borrow().clone();
        if let Some(watcher) = watcher {
            watcher.update();
        }
    }

    /// Run `f` after the pending flush, if this instance still exists.
    pub fn next_tick<F>(&self, f: F)
    where
        F: FnOnce(&Component) -> HandlerResult + 'static,
    {
        let weak = self.downgrade();
        scheduler::next_tick(move || match weak.upgrade() {
            Some(vm) => f(&vm),
            None => Ok(()),
        });
    }

    /// Prepatch: the parent re-rendered the placeholder for this instance.
    pub(crate) fn update_from_placeholder(&self, vnode: &VNode) -> Result<(), Error> {
        let Some(opts) = vnode.component_options.as_ref() else {
            return Ok(());
        };
        let had_slots = !self.0.slot_children.borrow().is_empty();
        *self.0.placeholder.borrow_mut() = Some(store_placeholder(vnode));

        let provided_before = std::mem::take(&mut *self.0.provided_props.borrow_mut());
        for spec in self.0.options.props() {
            match opts.props_data.get(&spec.name) {
                Some(value) => {
                    self.0.props.set(&spec.name, value.clone())?;
                    self.0.provided_props.borrow_mut().push(spec.name.clone());
                }
                None if provided_before.contains(&spec.name) => {
                    let default = spec.default.as_ref().map(Value::deep_clone).unwrap_or_default();
                    self.0.props.set(&spec.name, default)?;
                }
                None => {}
            }
        }

        self.update_parent_listeners(&opts.listeners);

        if had_slots || !opts.children.is_empty() {
            *self.0.slot_children.borrow_mut() = opts.children.iter().map(VNode::clone_fresh).collect();
            self.force_update();
        }
        Ok(())
    }

    /// Run the hooks registered for `hook`, then emit `hook:<name>`.
    ///
    /// Hooks run untracked so that reads inside them do not subscribe the
    /// watcher that triggered them.
    pub(crate) fn call_hook(&self, hook: LifecycleHook) {
        let _untracked = ReactiveContext::untracked();
        for f in self.0.options.hooks(hook) {
            if let Err(err) = f(self) {
                handle_error(&*err, Some(self), &format!("{hook} hook"));
            }
        }
        self.emit(&format!("hook:{hook}"), &[]);
    }

    /// Tear the instance down. Safe to call more than once.
    pub fn destroy(&self) -> Result<(), Error> {
        if self.0.being_destroyed.get() {
            return Ok(());
        }
        self.call_hook(LifecycleHook::BeforeDestroy);
        self.0.being_destroyed.set(true);
        tracing::debug!(uid = self.0.uid, name = %self.display_name(), "destroying component");

        if let Some(parent) = self.parent() {
            if !parent.is_being_destroyed() {
                parent.remove_child(self);
            }
        }

        let render_watcher = self.0.render_watcher.borrow_mut().take();
        if let Some(watcher) = render_watcher {
            watcher.teardown();
        }
        let watchers = std::mem::take(&mut *self.0.watchers.borrow_mut());
        for watcher in watchers {
            watcher.teardown();
        }
        let computed = std::mem::take(&mut *self.0.computed.borrow_mut());
        for watcher in computed.values() {
            watcher.teardown();
        }
        if let Some(ob) = self.0.state.observer() {
            ob.release_root();
        }

        self.0.destroyed.set(true);
        let old = self.0.vnode.borrow_mut().take();
        let patched = self.0.patcher.patch(old.map(OldRoot::VNode), None);

        self.call_hook(LifecycleHook::Destroyed);
        self.off_all();

        *self.0.parent.borrow_mut() = None;
        *self.0.placeholder.borrow_mut() = None;
        self.0.children.borrow_mut().clear();
        self.0.refs.borrow_mut().clear();
        self.0.slot_children.borrow_mut().clear();
        self.0.parent_listeners.borrow_mut().clear();
        patched.map(|_| ())
    }
}

/// Placeholders are kept without children or an instance link, so the
/// stored copy does not keep the instance alive.
fn store_placeholder(vnode: &VNode) -> VNode {
    let mut placeholder = vnode.snapshot();
    placeholder.component_instance = None;
    placeholder.elm = None;
    placeholder
}
