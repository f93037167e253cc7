//! Virtual Nodes
//!
//! A [`VNode`] describes one DOM node, or a placeholder for a child
//! component. Trees are built fresh on every render; the previous tree is
//! kept only until the next patch has consumed it.
//!
//! Ownership runs top-down: a vnode owns its children. Links pointing back
//! up (the rendering component, the component whose root this is) are
//! weak.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::ComponentVNodeOptions;
use crate::dom::NodeId;
use crate::error::HandlerResult;
use crate::instance::{Component, WeakComponent};
use crate::reactive::Value;

/// Event handler attached through vnode data or the component event bus.
pub type Listener = Rc<dyn Fn(&[Value]) -> HandlerResult>;

/// Wrap a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&[Value]) -> HandlerResult + 'static,
{
    Rc::new(f)
}

/// A listener that forwards to whatever handlers are currently in `fns`.
///
/// Lets a patch swap handlers without touching the DOM.
pub(crate) fn listener_invoker(fns: Rc<RefCell<Vec<Listener>>>) -> Listener {
    Rc::new(move |args: &[Value]| {
        let current = fns.borrow().clone();
        for f in current {
            f(args)?;
        }
        Ok(())
    })
}

/// Identity of a vnode among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(String),
    Num(i64),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => f.write_str(s),
            Key::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Num(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Num(n.into())
    }
}

impl From<usize> for Key {
    fn from(n: usize) -> Self {
        Key::Num(n as i64)
    }
}

/// Callback attached to a vnode lifecycle point.
pub type VNodeHook = Rc<dyn Fn(&VNode)>;

/// User hooks on vnode data. Each point keeps every registered callback.
#[derive(Clone, Default)]
pub struct VNodeHooks {
    pub create: Vec<VNodeHook>,
    pub insert: Vec<VNodeHook>,
    pub update: Vec<VNodeHook>,
    pub postpatch: Vec<VNodeHook>,
    pub destroy: Vec<VNodeHook>,
}

impl VNodeHooks {
    fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.insert.is_empty()
            && self.update.is_empty()
            && self.postpatch.is_empty()
            && self.destroy.is_empty()
    }
}

/// Dynamic class binding.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassBinding {
    Str(String),
    List(Vec<ClassBinding>),
    Map(IndexMap<String, bool>),
}

impl ClassBinding {
    /// Build a map binding from `(class, enabled)` pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, bool)>) -> Self {
        ClassBinding::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Space-separated class list.
    pub fn render(&self) -> String {
        match self {
            ClassBinding::Str(s) => s.trim().to_owned(),
            ClassBinding::List(items) => items
                .iter()
                .map(ClassBinding::render)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            ClassBinding::Map(map) => map
                .iter()
                .filter(|(_, on)| **on)
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl From<&str> for ClassBinding {
    fn from(s: &str) -> Self {
        ClassBinding::Str(s.to_owned())
    }
}

impl From<String> for ClassBinding {
    fn from(s: String) -> Self {
        ClassBinding::Str(s)
    }
}

impl From<Vec<ClassBinding>> for ClassBinding {
    fn from(items: Vec<ClassBinding>) -> Self {
        ClassBinding::List(items)
    }
}

/// A directive applied to an element.
#[derive(Debug, Clone)]
pub struct VNodeDirective {
    pub name: String,
    pub value: Value,
    pub arg: Option<String>,
    pub modifiers: Vec<String>,
}

impl VNodeDirective {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            arg: None,
            modifiers: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }
}

/// Everything a vnode carries besides its tag and children.
#[derive(Clone, Default)]
pub struct VNodeData {
    pub key: Option<Key>,
    pub ref_name: Option<String>,
    pub ref_in_for: bool,
    pub is: Option<String>,
    pub slot: Option<String>,
    pub static_class: Option<String>,
    pub class: Option<ClassBinding>,
    pub static_style: IndexMap<String, String>,
    pub style: IndexMap<String, String>,
    pub attrs: IndexMap<String, Value>,
    pub props: IndexMap<String, Value>,
    pub on: IndexMap<String, Vec<Listener>>,
    pub native_on: IndexMap<String, Vec<Listener>>,
    pub directives: Vec<VNodeDirective>,
    pub hook: VNodeHooks,
}

impl VNodeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Value for a declared prop of a child component.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn class(mut self, class: impl Into<ClassBinding>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn static_class(mut self, class: impl Into<String>) -> Self {
        self.static_class = Some(class.into());
        self
    }

    pub fn style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(name.into(), value.into());
        self
    }

    pub fn static_style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_style.insert(name.into(), value.into());
        self
    }

    /// Add a handler. On a component placeholder this is a component event;
    /// on an element, a DOM event.
    pub fn on(mut self, event: impl Into<String>, handler: Listener) -> Self {
        self.on.entry(event.into()).or_default().push(handler);
        self
    }

    /// DOM event on the root element of a child component.
    pub fn native_on(mut self, event: impl Into<String>, handler: Listener) -> Self {
        self.native_on.entry(event.into()).or_default().push(handler);
        self
    }

    pub fn directive(mut self, directive: VNodeDirective) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn ref_name(mut self, name: impl Into<String>) -> Self {
        self.ref_name = Some(name.into());
        self
    }

    pub fn ref_in_for(mut self, in_for: bool) -> Self {
        self.ref_in_for = in_for;
        self
    }

    pub fn is(mut self, tag: impl Into<String>) -> Self {
        self.is = Some(tag.into());
        self
    }

    pub fn slot(mut self, name: impl Into<String>) -> Self {
        self.slot = Some(name.into());
        self
    }

    pub fn hook_create(mut self, f: impl Fn(&VNode) + 'static) -> Self {
        self.hook.create.push(Rc::new(f));
        self
    }

    pub fn hook_insert(mut self, f: impl Fn(&VNode) + 'static) -> Self {
        self.hook.insert.push(Rc::new(f));
        self
    }

    pub fn hook_update(mut self, f: impl Fn(&VNode) + 'static) -> Self {
        self.hook.update.push(Rc::new(f));
        self
    }

    pub fn hook_postpatch(mut self, f: impl Fn(&VNode) + 'static) -> Self {
        self.hook.postpatch.push(Rc::new(f));
        self
    }

    pub fn hook_destroy(mut self, f: impl Fn(&VNode) + 'static) -> Self {
        self.hook.destroy.push(Rc::new(f));
        self
    }

    /// `true` when the data carries anything the modules or hooks act on.
    pub(crate) fn is_significant(&self) -> bool {
        self.ref_name.is_some()
            || self.static_class.is_some()
            || self.class.is_some()
            || !self.static_style.is_empty()
            || !self.style.is_empty()
            || !self.attrs.is_empty()
            || !self.on.is_empty()
            || !self.directives.is_empty()
            || !self.hook.is_empty()
    }
}

impl fmt::Debug for VNodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNodeData")
            .field("key", &self.key)
            .field("ref", &self.ref_name)
            .field("class", &self.class)
            .field("attrs", &self.attrs)
            .field("props", &self.props)
            .field("on", &self.on.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// A node in a virtual tree.
#[derive(Default)]
pub struct VNode {
    pub tag: Option<String>,
    pub data: VNodeData,
    pub children: Vec<VNode>,
    pub text: Option<String>,
    pub elm: Option<NodeId>,
    pub ns: Option<String>,
    /// Component whose render produced this node.
    pub context: Option<WeakComponent>,
    pub key: Option<Key>,
    pub component_options: Option<ComponentVNodeOptions>,
    pub component_instance: Option<Component>,
    /// Set on the root vnode of a child component: that component.
    pub parent: Option<WeakComponent>,
    pub is_static: bool,
    pub is_comment: bool,
    pub is_cloned: bool,
    pub is_once: bool,
}

impl VNode {
    pub fn element(tag: impl Into<String>, data: VNodeData, children: Vec<VNode>) -> Self {
        Self {
            tag: Some(tag.into()),
            key: data.key.clone(),
            data,
            children,
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            is_comment: true,
            ..Self::default()
        }
    }

    /// Placeholder rendered where there is nothing to show.
    pub fn empty() -> Self {
        Self::comment("")
    }

    /// Mark as static content.
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as rendered once. Together with `with_static`, the node is
    /// reused as-is by later patches.
    pub fn with_once(mut self) -> Self {
        self.is_static = true;
        self.is_once = true;
        self
    }

    pub fn is_component(&self) -> bool {
        self.component_options.is_some()
    }

    pub fn is_element(&self) -> bool {
        self.tag.is_some()
    }

    /// DOM node this vnode is bound to. For a mounted component placeholder
    /// this is the child's current root element.
    pub fn elm(&self) -> Option<NodeId> {
        match &self.component_instance {
            Some(child) => child.el().or(self.elm),
            None => self.elm,
        }
    }

    pub fn context(&self) -> Option<Component> {
        self.context.as_ref().and_then(WeakComponent::upgrade)
    }

    /// Copy without any DOM binding or mounted instance, for reuse in a
    /// later render (slot content, for instance).
    pub fn clone_fresh(&self) -> VNode {
        VNode {
            tag: self.tag.clone(),
            data: self.data.clone(),
            children: self.children.iter().map(VNode::clone_fresh).collect(),
            text: self.text.clone(),
            elm: None,
            ns: self.ns.clone(),
            context: self.context.clone(),
            key: self.key.clone(),
            component_options: self.component_options.as_ref().map(ComponentVNodeOptions::clone_fresh),
            component_instance: None,
            parent: None,
            is_static: self.is_static,
            is_comment: self.is_comment,
            is_cloned: true,
            is_once: self.is_once,
        }
    }

    /// Childless copy that keeps the DOM binding; handed to deferred hooks.
    pub(crate) fn snapshot(&self) -> VNode {
        VNode {
            tag: self.tag.clone(),
            data: self.data.clone(),
            children: Vec::new(),
            text: self.text.clone(),
            elm: self.elm(),
            ns: self.ns.clone(),
            context: self.context.clone(),
            key: self.key.clone(),
            component_options: None,
            component_instance: self.component_instance.clone(),
            parent: self.parent.clone(),
            is_static: self.is_static,
            is_comment: self.is_comment,
            is_cloned: self.is_cloned,
            is_once: self.is_once,
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        if let Some(tag) = &self.tag {
            s.field("tag", tag);
        }
        if let Some(key) = &self.key {
            s.field("key", key);
        }
        if let Some(text) = &self.text {
            s.field("text", text);
        }
        if let Some(elm) = &self.elm {
            s.field("elm", elm);
        }
        if !self.children.is_empty() {
            s.field("children", &self.children);
        }
        s.finish()
    }
}
