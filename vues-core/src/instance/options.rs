//! Component declarations.
//!
//! A [`ComponentOptions`] value is the resolved declaration bundle of one
//! component type: its props, state, computed properties, watchers,
//! lifecycle hooks, render function and local registries. [`define`]
//! resolves inheritance and freezes it into a shared [`ComponentCtor`].
//!
//! [`define`]: ComponentOptions::define

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::{Component, WatchOptions};
use crate::error::{BoxError, HandlerResult};
use crate::reactive::Value;
use crate::util::{camelize, capitalize};
use crate::vdom::modules::Directive;
use crate::vdom::{CreateElement, VNode};

static NEXT_CID: AtomicU64 = AtomicU64::new(1);

/// Shared, immutable component type.
pub type ComponentCtor = Rc<ComponentOptions>;

pub type HookFn = Rc<dyn Fn(&Component) -> HandlerResult>;
pub type RenderFn = Rc<dyn Fn(&Component, &CreateElement) -> Result<Rendered, BoxError>>;
pub type ComputedGetter = Rc<dyn Fn(&Component) -> Result<Value, BoxError>>;
pub type ComputedSetter = Rc<dyn Fn(&Component, Value) -> HandlerResult>;
pub type WatchHandler = Rc<dyn Fn(&Component, &Value, &Value) -> HandlerResult>;

/// Points in a component's life where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    BeforeCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeDestroy,
    Destroyed,
}

impl LifecycleHook {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleHook::BeforeCreate => "beforeCreate",
            LifecycleHook::Created => "created",
            LifecycleHook::BeforeMount => "beforeMount",
            LifecycleHook::Mounted => "mounted",
            LifecycleHook::BeforeUpdate => "beforeUpdate",
            LifecycleHook::Updated => "updated",
            LifecycleHook::BeforeDestroy => "beforeDestroy",
            LifecycleHook::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a render function returned. Anything but a single node is a
/// usage error and renders an empty placeholder.
pub enum Rendered {
    Node(VNode),
    Nodes(Vec<VNode>),
    Empty,
}

impl From<VNode> for Rendered {
    fn from(vnode: VNode) -> Self {
        Rendered::Node(vnode)
    }
}

impl From<Vec<VNode>> for Rendered {
    fn from(nodes: Vec<VNode>) -> Self {
        Rendered::Nodes(nodes)
    }
}

#[derive(Clone)]
pub struct PropSpec {
    pub name: String,
    /// Copied fresh into every instance that does not receive the prop.
    pub default: Option<Value>,
}

#[derive(Clone)]
pub struct ComputedSpec {
    pub getter: ComputedGetter,
    pub setter: Option<ComputedSetter>,
}

#[derive(Clone)]
pub struct WatchSpec {
    pub path: String,
    pub handler: WatchHandler,
    pub options: WatchOptions,
}

/// Declaration of a component type.
#[derive(Clone, Default)]
pub struct ComponentOptions {
    cid: u64,
    name: Option<String>,
    props: Vec<PropSpec>,
    state: IndexMap<String, Value>,
    computed: IndexMap<String, ComputedSpec>,
    watch: Vec<WatchSpec>,
    hooks: HashMap<LifecycleHook, Vec<HookFn>>,
    render: Option<RenderFn>,
    components: IndexMap<String, ComponentCtor>,
    directives: IndexMap<String, Directive>,
    extends: Option<ComponentCtor>,
}

impl ComponentOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Declaration without a name.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn prop(self, name: impl Into<String>) -> Self {
        self.push_prop(PropSpec {
            name: name.into(),
            default: None,
        })
    }

    pub fn prop_with_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.push_prop(PropSpec {
            name: name.into(),
            default: Some(default.into()),
        })
    }

    fn push_prop(mut self, spec: PropSpec) -> Self {
        match self.props.iter_mut().find(|p| p.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.props.push(spec),
        }
        self
    }

    /// Declare a state key with its initial value. Containers are deep
    /// cloned per instance.
    pub fn state(mut self, key: impl Into<String>, initial: impl Into<Value>) -> Self {
        self.state.insert(key.into(), initial.into());
        self
    }

    pub fn computed<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Component) -> Result<Value, BoxError> + 'static,
    {
        self.computed.insert(
            name.into(),
            ComputedSpec {
                getter: Rc::new(getter),
                setter: None,
            },
        );
        self
    }

    pub fn computed_with_setter<F, S>(mut self, name: impl Into<String>, getter: F, setter: S) -> Self
    where
        F: Fn(&Component) -> Result<Value, BoxError> + 'static,
        S: Fn(&Component, Value) -> HandlerResult + 'static,
    {
        self.computed.insert(
            name.into(),
            ComputedSpec {
                getter: Rc::new(getter),
                setter: Some(Rc::new(setter)),
            },
        );
        self
    }

    /// Watch a dot-delimited path on the instance.
    pub fn watch<F>(mut self, path: impl Into<String>, handler: F, options: WatchOptions) -> Self
    where
        F: Fn(&Component, &Value, &Value) -> HandlerResult + 'static,
    {
        self.watch.push(WatchSpec {
            path: path.into(),
            handler: Rc::new(handler),
            options,
        });
        self
    }

    pub fn hook<F>(mut self, hook: LifecycleHook, f: F) -> Self
    where
        F: Fn(&Component) -> HandlerResult + 'static,
    {
        self.hooks.entry(hook).or_default().push(Rc::new(f));
        self
    }

    pub fn render<F>(mut self, f: F) -> Self
    where
        F: Fn(&Component, &CreateElement) -> Result<Rendered, BoxError> + 'static,
    {
        self.render = Some(Rc::new(f));
        self
    }

    /// Register a child component under `name`.
    pub fn component(mut self, name: impl Into<String>, ctor: &ComponentCtor) -> Self {
        self.components.insert(name.into(), ctor.clone());
        self
    }

    pub fn directive(mut self, name: impl Into<String>, directive: Directive) -> Self {
        self.directives.insert(name.into(), directive);
        self
    }

    /// Inherit from `parent`; resolved by [`define`](Self::define).
    pub fn extends(mut self, parent: &ComponentCtor) -> Self {
        self.extends = Some(parent.clone());
        self
    }

    /// Resolve inheritance and assign a component id.
    pub fn define(self) -> ComponentCtor {
        let mut options = match self.extends.clone() {
            Some(parent) => merge(&parent, self),
            None => self,
        };
        options.cid = NEXT_CID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(cid = options.cid, name = options.name.as_deref().unwrap_or("<anonymous>"), "component defined");
        Rc::new(options)
    }

    pub fn cid(&self) -> u64 {
        self.cid
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn props(&self) -> &[PropSpec] {
        &self.props
    }

    pub fn prop_names(&self) -> impl Iterator<Item = &String> {
        self.props.iter().map(|p| &p.name)
    }

    pub fn state_defaults(&self) -> &IndexMap<String, Value> {
        &self.state
    }

    pub fn computed_specs(&self) -> &IndexMap<String, ComputedSpec> {
        &self.computed
    }

    pub fn watches(&self) -> &[WatchSpec] {
        &self.watch
    }

    pub fn hooks(&self, hook: LifecycleHook) -> &[HookFn] {
        self.hooks.get(&hook).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn render_fn(&self) -> Option<&RenderFn> {
        self.render.as_ref()
    }

    pub fn parent(&self) -> Option<&ComponentCtor> {
        self.extends.as_ref()
    }

    /// Look up a registered component by its exact, camelized or
    /// capitalized name.
    pub fn resolve_component(&self, name: &str) -> Option<ComponentCtor> {
        resolve_asset(&self.components, name).cloned()
    }

    pub fn resolve_directive(&self, name: &str) -> Option<Directive> {
        resolve_asset(&self.directives, name).cloned()
    }
}

fn resolve_asset<'a, T>(assets: &'a IndexMap<String, T>, name: &str) -> Option<&'a T> {
    if let Some(found) = assets.get(name) {
        return Some(found);
    }
    let camel = camelize(name);
    if let Some(found) = assets.get(&camel) {
        return Some(found);
    }
    assets.get(&capitalize(&camel))
}

/// Merge `child` over `parent`.
///
/// Hooks and watches concatenate parent first. Props and state keys union,
/// with the child's declaration winning in place. Registries and computed
/// properties are child-wins by name.
fn merge(parent: &ComponentOptions, child: ComponentOptions) -> ComponentOptions {
    let mut merged = parent.clone();
    merged.extends = child.extends;
    if child.name.is_some() {
        merged.name = child.name;
    }
    for prop in child.props {
        merged = merged.push_prop(prop);
    }
    merged.state.extend(child.state);
    merged.computed.extend(child.computed);
    merged.watch.extend(child.watch);
    for (hook, fns) in child.hooks {
        merged.hooks.entry(hook).or_default().extend(fns);
    }
    if child.render.is_some() {
        merged.render = child.render;
    }
    merged.components.extend(child.components);
    merged.directives.extend(child.directives);
    merged
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("cid", &self.cid)
            .field("name", &self.name)
            .field("props", &self.props.iter().map(|p| &p.name).collect::<Vec<_>>())
            .field("state", &self.state.keys().collect::<Vec<_>>())
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inheritance_unions_keys_and_keeps_every_hook() {
        let base = ComponentOptions::new("base")
            .prop("a")
            .prop_with_default("b", 1)
            .state("x", 1)
            .hook(LifecycleHook::Created, |_| Ok(()))
            .define();
        let derived = ComponentOptions::new("derived")
            .prop_with_default("b", 2)
            .prop("c")
            .state("x", 10)
            .state("y", 2)
            .hook(LifecycleHook::Created, |_| Ok(()))
            .extends(&base)
            .define();

        let props: Vec<_> = derived.prop_names().cloned().collect();
        assert_eq!(props, vec!["a", "b", "c"]);
        assert_eq!(derived.props()[1].default, Some(Value::from(2)));
        assert_eq!(derived.state_defaults().get("x"), Some(&Value::from(10)));
        assert_eq!(derived.state_defaults().len(), 2);
        assert_eq!(derived.hooks(LifecycleHook::Created).len(), 2);
        assert_eq!(derived.name(), Some("derived"));
        assert_ne!(base.cid(), derived.cid());
    }

    #[test]
    fn components_resolve_by_any_case() {
        let child = ComponentOptions::new("my-item").define();
        let parent = ComponentOptions::new("list").component("MyItem", &child).define();
        assert!(parent.resolve_component("my-item").is_some());
        assert!(parent.resolve_component("MyItem").is_some());
        assert!(parent.resolve_component("other").is_none());
    }

    #[test]
    fn hook_names() {
        assert_eq!(LifecycleHook::BeforeUpdate.to_string(), "beforeUpdate");
    }
}
