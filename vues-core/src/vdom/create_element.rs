//! Element creation.
//!
//! [`CreateElement`] is the `h` handed to render functions. It resolves
//! tags against the rendering component's registry, normalizes children,
//! and applies SVG/MathML namespaces.

use super::{create_component, VNode, VNodeData};
use crate::error::warn;
use crate::instance::{Component, ComponentCtor, WeakComponent};
use crate::reactive::Value;
use crate::util::{get_tag_namespace, is_reserved_tag};

/// What to create: a tag name or a component constructor.
pub enum Tag {
    Name(String),
    Component(ComponentCtor),
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::Name(name.to_owned())
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag::Name(name)
    }
}

impl From<ComponentCtor> for Tag {
    fn from(ctor: ComponentCtor) -> Self {
        Tag::Component(ctor)
    }
}

impl From<&ComponentCtor> for Tag {
    fn from(ctor: &ComponentCtor) -> Self {
        Tag::Component(ctor.clone())
    }
}

/// Child content accepted by [`CreateElement::element`].
pub enum Child {
    Node(VNode),
    Text(String),
    Many(Vec<Child>),
}

impl From<VNode> for Child {
    fn from(vnode: VNode) -> Self {
        Child::Node(vnode)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_owned())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<Value> for Child {
    fn from(value: Value) -> Self {
        Child::Text(value.to_display_string())
    }
}

impl From<Vec<VNode>> for Child {
    fn from(nodes: Vec<VNode>) -> Self {
        Child::Many(nodes.into_iter().map(Child::Node).collect())
    }
}

/// Flatten nested children and merge adjacent text into single text nodes.
pub fn normalize_children(children: Vec<Child>) -> Vec<VNode> {
    let mut out = Vec::with_capacity(children.len());
    push_children(children, &mut out);
    out
}

fn push_children(children: Vec<Child>, out: &mut Vec<VNode>) {
    for child in children {
        match child {
            Child::Many(nested) => push_children(nested, out),
            Child::Text(text) => push_text(text, out),
            Child::Node(vnode) if is_text_node(&vnode) => {
                push_text(vnode.text.unwrap_or_default(), out)
            }
            Child::Node(vnode) => out.push(vnode),
        }
    }
}

fn is_text_node(vnode: &VNode) -> bool {
    vnode.tag.is_none() && !vnode.is_comment && vnode.text.is_some() && vnode.elm.is_none()
}

fn push_text(text: String, out: &mut Vec<VNode>) {
    if let Some(last) = out.last_mut() {
        if is_text_node(last) {
            if let Some(existing) = last.text.as_mut() {
                existing.push_str(&text);
                return;
            }
        }
    }
    out.push(VNode::text(text));
}

/// The `h` function.
#[derive(Default)]
pub struct CreateElement {
    context: Option<WeakComponent>,
    ns: Option<String>,
}

impl CreateElement {
    /// Detached builder: no component resolution.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn for_component(vm: &Component) -> Self {
        Self {
            context: Some(vm.downgrade()),
            ns: vm.placeholder_ns(),
        }
    }

    /// Create an element or component vnode.
    pub fn element(&self, tag: impl Into<Tag>, data: VNodeData, children: Vec<Child>) -> VNode {
        let mut data = data;
        let mut tag = tag.into();
        if let Some(is) = data.is.take() {
            tag = Tag::Name(is);
        }
        let children = normalize_children(children);

        let mut vnode = match tag {
            Tag::Name(name) if name.is_empty() => return VNode::empty(),
            Tag::Name(name) => {
                if is_reserved_tag(&name) {
                    VNode::element(name, data, children)
                } else if let Some(ctor) = self.resolve_component(&name) {
                    return create_component(ctor, data, self.context.clone(), children, Some(name));
                } else {
                    if self.ns.is_none() && get_tag_namespace(&name).is_none() {
                        let vm = self.context.as_ref().and_then(WeakComponent::upgrade);
                        warn(
                            format!("Unknown custom element: <{name}> - did you register the component correctly?"),
                            vm.as_ref(),
                        );
                    }
                    VNode::element(name, data, children)
                }
            }
            Tag::Component(ctor) => {
                return create_component(ctor, data, self.context.clone(), children, None);
            }
        };

        vnode.context = self.context.clone();
        let ns = self
            .ns
            .clone()
            .or_else(|| vnode.tag.as_deref().and_then(get_tag_namespace).map(str::to_owned));
        if let Some(ns) = ns {
            apply_ns(&mut vnode, Some(ns), false);
        }
        vnode
    }

    /// Shorthand for a component vnode.
    pub fn component(&self, ctor: &ComponentCtor, data: VNodeData, children: Vec<Child>) -> VNode {
        self.element(ctor, data, children)
    }

    pub fn text(&self, text: impl Into<String>) -> VNode {
        VNode::text(text)
    }

    pub fn empty(&self) -> VNode {
        VNode::empty()
    }

    /// Slot content passed by the parent, as fresh vnodes.
    pub fn slot(&self, name: Option<&str>) -> Vec<VNode> {
        self.context
            .as_ref()
            .and_then(WeakComponent::upgrade)
            .map(|vm| vm.slot(name))
            .unwrap_or_default()
    }

    fn resolve_component(&self, name: &str) -> Option<ComponentCtor> {
        let vm = self.context.as_ref()?.upgrade()?;
        vm.options().resolve_component(name)
    }
}

/// Set `ns` on `vnode` and its element descendants. Children of
/// `foreignObject` go back to the HTML namespace.
fn apply_ns(vnode: &mut VNode, ns: Option<String>, force: bool) {
    vnode.ns = ns.clone();
    let (ns, force) = if vnode.tag.as_deref() == Some("foreignObject") {
        (None, true)
    } else {
        (ns, force)
    };
    for child in &mut vnode.children {
        if child.tag.is_some() && (child.ns.is_none() || (force && child.tag.as_deref() != Some("svg"))) {
            apply_ns(child, ns.clone(), force);
        }
    }
}
