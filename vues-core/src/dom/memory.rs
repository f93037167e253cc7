//! In-memory DOM.
//!
//! A small arena-backed tree implementing [`NodeOps`]. It records how many
//! mutations of each kind were applied, which makes it the reference
//! backend for tests and benchmarks: patching a tree against itself must
//! leave every counter untouched.

use std::cell::{Cell, RefCell};
use std::fmt::Write as _;

use indexmap::IndexMap;
use serde::Serialize;

use super::{NodeId, NodeOps};
use crate::error::HandlerResult;
use crate::reactive::Value;
use crate::vdom::Listener;

/// Mutation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MutationStats {
    pub created: u32,
    pub inserted: u32,
    pub moved: u32,
    pub removed: u32,
    pub text_updates: u32,
    pub attribute_updates: u32,
    pub style_updates: u32,
    pub listener_updates: u32,
}

impl MutationStats {
    pub fn total(&self) -> u32 {
        self.created
            + self.inserted
            + self.moved
            + self.removed
            + self.text_updates
            + self.attribute_updates
            + self.style_updates
            + self.listener_updates
    }
}

enum NodeKind {
    Element {
        tag: String,
        namespace: Option<String>,
        attrs: IndexMap<String, String>,
        style: IndexMap<String, String>,
        listeners: IndexMap<String, Listener>,
    },
    Text(String),
    Comment(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document.
pub struct MemoryDom {
    nodes: RefCell<Vec<NodeData>>,
    stats: Cell<MutationStats>,
    body: NodeId,
}

impl MemoryDom {
    /// Create a document with an empty `body` element.
    pub fn new() -> Self {
        let dom = Self {
            nodes: RefCell::new(Vec::new()),
            stats: Cell::new(MutationStats::default()),
            body: NodeId::from(0),
        };
        dom.alloc(NodeKind::Element {
            tag: "body".to_owned(),
            namespace: None,
            attrs: IndexMap::new(),
            style: IndexMap::new(),
            listeners: IndexMap::new(),
        });
        dom.reset_stats();
        dom
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn stats(&self) -> MutationStats {
        self.stats.get()
    }

    pub fn reset_stats(&self) {
        self.stats.set(MutationStats::default());
    }

    /// Create an element and append it to `body`. Convenient mount target.
    pub fn mount_point(&self, tag: &str) -> NodeId {
        let el = self.create_element(tag);
        self.append_child(self.body, el);
        el
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node.index())
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// `true` when `node` is reachable from `body`.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.body {
                return true;
            }
            current = nodes.get(id.index()).and_then(|n| n.parent);
        }
        false
    }

    pub fn namespace(&self, node: NodeId) -> Option<String> {
        match &self.nodes.borrow().get(node.index())?.kind {
            NodeKind::Element { namespace, .. } => namespace.clone(),
            _ => None,
        }
    }

    pub fn style(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.nodes.borrow().get(node.index())?.kind {
            NodeKind::Element { style, .. } => style.get(name).cloned(),
            _ => None,
        }
    }

    pub fn has_listener(&self, node: NodeId, event: &str) -> bool {
        match self.nodes.borrow().get(node.index()).map(|n| &n.kind) {
            Some(NodeKind::Element { listeners, .. }) => listeners.contains_key(event),
            _ => false,
        }
    }

    /// Invoke the listener registered for `event` on `node`, if any.
    pub fn dispatch_event(&self, node: NodeId, event: &str, args: &[Value]) -> HandlerResult {
        let listener = match self.nodes.borrow().get(node.index()).map(|n| &n.kind) {
            Some(NodeKind::Element { listeners, .. }) => listeners.get(event).cloned(),
            _ => None,
        };
        match listener {
            Some(listener) => listener(args),
            None => Ok(()),
        }
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        collect_text(&nodes, node, &mut out);
        out
    }

    /// Serialized markup of `node`.
    pub fn outer_html(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        serialize(&nodes, node, &mut out);
        out
    }

    /// Serialized markup of the children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        if let Some(data) = nodes.get(node.index()) {
            for child in &data.children {
                serialize(&nodes, *child, &mut out);
            }
        }
        out
    }

    fn alloc(&self, kind: NodeKind) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId::from(nodes.len() as u64);
        nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.bump(|s| s.created += 1);
        id
    }

    fn bump(&self, f: impl FnOnce(&mut MutationStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn with_element(&self, node: NodeId, f: impl FnOnce(&mut IndexMap<String, String>, &mut IndexMap<String, String>, &mut IndexMap<String, Listener>)) {
        if let Some(NodeData {
            kind: NodeKind::Element { attrs, style, listeners, .. },
            ..
        }) = self.nodes.borrow_mut().get_mut(node.index())
        {
            f(attrs, style, listeners);
        }
    }
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_text(nodes: &[NodeData], node: NodeId, out: &mut String) {
    let Some(data) = nodes.get(node.index()) else {
        return;
    };
    match &data.kind {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Comment(_) => {}
        NodeKind::Element { .. } => {
            for child in &data.children {
                collect_text(nodes, *child, out);
            }
        }
    }
}

fn escape(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

fn serialize(nodes: &[NodeData], node: NodeId, out: &mut String) {
    let Some(data) = nodes.get(node.index()) else {
        return;
    };
    match &data.kind {
        NodeKind::Text(text) => escape(text, out),
        NodeKind::Comment(text) => {
            let _ = write!(out, "<!--{text}-->");
        }
        NodeKind::Element { tag, attrs, style, .. } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                let _ = write!(out, " {name}=\"");
                escape(value, out);
                out.push('"');
            }
            if !style.is_empty() {
                out.push_str(" style=\"");
                for (name, value) in style {
                    let _ = write!(out, "{name}: {value};");
                }
                out.push('"');
            }
            out.push('>');
            for child in &data.children {
                serialize(nodes, *child, out);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}

impl NodeOps for MemoryDom {
    fn create_element(&self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_owned(),
            namespace: None,
            attrs: IndexMap::new(),
            style: IndexMap::new(),
            listeners: IndexMap::new(),
        })
    }

    fn create_element_ns(&self, namespace: &str, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_owned(),
            namespace: Some(namespace.to_owned()),
            attrs: IndexMap::new(),
            style: IndexMap::new(),
            listeners: IndexMap::new(),
        })
    }

    fn create_text_node(&self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_owned()))
    }

    fn create_comment(&self, text: &str) -> NodeId {
        self.alloc(NodeKind::Comment(text.to_owned()))
    }

    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        if reference == Some(node) {
            return;
        }
        let moved = {
            let mut nodes = self.nodes.borrow_mut();
            if parent.index() >= nodes.len() || node.index() >= nodes.len() {
                return;
            }
            let previous = nodes[node.index()].parent.take();
            if let Some(previous) = previous {
                nodes[previous.index()].children.retain(|c| *c != node);
            }
            let siblings = &mut nodes[parent.index()].children;
            let pos = reference
                .and_then(|r| siblings.iter().position(|c| *c == r))
                .unwrap_or(siblings.len());
            siblings.insert(pos, node);
            nodes[node.index()].parent = Some(parent);
            previous.is_some()
        };
        if moved {
            self.bump(|s| s.moved += 1);
        } else {
            self.bump(|s| s.inserted += 1);
        }
    }

    fn remove_child(&self, parent: NodeId, child: NodeId) {
        let removed = {
            let mut nodes = self.nodes.borrow_mut();
            match nodes.get(child.index()).map(|n| n.parent) {
                Some(Some(p)) if p == parent => {
                    nodes[parent.index()].children.retain(|c| *c != child);
                    nodes[child.index()].parent = None;
                    true
                }
                _ => false,
            }
        };
        if removed {
            self.bump(|s| s.removed += 1);
        }
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node.index())?.parent
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let nodes = self.nodes.borrow();
        let parent = nodes.get(node.index())?.parent?;
        let siblings = &nodes[parent.index()].children;
        let pos = siblings.iter().position(|c| *c == node)?;
        siblings.get(pos + 1).copied()
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.nodes.borrow().get(node.index())?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    fn set_text_content(&self, node: NodeId, text: &str) {
        {
            let mut nodes = self.nodes.borrow_mut();
            let Some(data) = nodes.get_mut(node.index()) else {
                return;
            };
            let detached = match &mut data.kind {
                NodeKind::Text(t) | NodeKind::Comment(t) => {
                    *t = text.to_owned();
                    None
                }
                NodeKind::Element { .. } => Some(std::mem::take(&mut data.children)),
            };
            if let Some(detached) = detached {
                for child in detached {
                    nodes[child.index()].parent = None;
                }
                if !text.is_empty() {
                    let id = NodeId::from(nodes.len() as u64);
                    nodes.push(NodeData {
                        kind: NodeKind::Text(text.to_owned()),
                        parent: Some(node),
                        children: Vec::new(),
                    });
                    nodes[node.index()].children.push(id);
                }
            }
        }
        self.bump(|s| s.text_updates += 1);
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.with_element(node, |attrs, _, _| {
            attrs.insert(name.to_owned(), value.to_owned());
        });
        self.bump(|s| s.attribute_updates += 1);
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        self.with_element(node, |attrs, _, _| {
            attrs.shift_remove(name);
        });
        self.bump(|s| s.attribute_updates += 1);
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.nodes.borrow().get(node.index())?.kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).cloned(),
            _ => None,
        }
    }

    fn set_style_property(&self, node: NodeId, name: &str, value: &str) {
        self.with_element(node, |_, style, _| {
            style.insert(name.to_owned(), value.to_owned());
        });
        self.bump(|s| s.style_updates += 1);
    }

    fn remove_style_property(&self, node: NodeId, name: &str) {
        self.with_element(node, |_, style, _| {
            style.shift_remove(name);
        });
        self.bump(|s| s.style_updates += 1);
    }

    fn add_event_listener(&self, node: NodeId, event: &str, listener: Listener) {
        self.with_element(node, |_, _, listeners| {
            listeners.insert(event.to_owned(), listener);
        });
        self.bump(|s| s.listener_updates += 1);
    }

    fn remove_event_listener(&self, node: NodeId, event: &str) {
        self.with_element(node, |_, _, listeners| {
            listeners.shift_remove(event);
        });
        self.bump(|s| s.listener_updates += 1);
    }
}
