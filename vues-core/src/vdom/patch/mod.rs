//! Patching
//!
//! The [`Patcher`] reconciles a new vnode tree with the previous one and
//! applies the difference through [`NodeOps`].
//!
//! # How a Patch Works
//!
//! Given `(old, new)`:
//!
//! - no old tree: create the new tree depth-first
//! - no new tree: run destroy hooks (children first) and detach
//! - the same node (same key, tag, comment-ness, input type): patch in
//!   place, diffing children with the two-ended algorithm in
//!   [`children`]
//! - different nodes: create the new tree next to the old one, then remove
//!   the old
//!
//! Insert hooks (component `mounted`, vnode `insert` hooks, directive
//! `inserted`) are collected in an [`InsertQueue`] and run only once the
//! whole patch is applied, so nothing sees a node before it is attached.
//! A child component's first patch hands its queue up to the parent's
//! patch instead of running it.

mod children;

use std::rc::Rc;

use crate::dom::{NodeId, NodeOps};
use crate::error::{warn, Error};
use crate::instance::{active_instance, Component};
use crate::vdom::modules::{default_modules, Module, PatchContext};
use crate::vdom::{VNode, VNodeHook};

/// Previous state of a patch root.
pub enum OldRoot {
    /// A bare element: the mount target. It is replaced by the new tree.
    Element(NodeId),
    VNode(VNode),
}

enum Inserted {
    Component(Component),
    Hooks(Vec<VNodeHook>, VNode),
    Callback(Box<dyn FnOnce()>),
}

/// Callbacks deferred until a patch is complete.
#[derive(Default)]
pub struct InsertQueue(Vec<Inserted>);

impl InsertQueue {
    pub(crate) fn push_callback(&mut self, f: Box<dyn FnOnce()>) {
        self.0.push(Inserted::Callback(f));
    }

    pub(crate) fn append(&mut self, mut other: InsertQueue) {
        self.0.append(&mut other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Run every deferred entry in order.
    pub fn flush(self) {
        for entry in self.0 {
            match entry {
                Inserted::Component(child) => child.on_inserted(),
                Inserted::Hooks(hooks, vnode) => {
                    for hook in hooks {
                        hook(&vnode);
                    }
                }
                Inserted::Callback(f) => f(),
            }
        }
    }
}

/// `true` when `a` can be patched into `b` instead of being replaced.
pub fn same_vnode(a: &VNode, b: &VNode) -> bool {
    a.key == b.key && a.tag == b.tag && a.is_comment == b.is_comment && same_input_type(a, b)
}

fn same_input_type(a: &VNode, b: &VNode) -> bool {
    if a.tag.as_deref() != Some("input") {
        return true;
    }
    let input_type = |v: &VNode| v.data.attrs.get("type").map(|t| t.to_display_string());
    input_type(a) == input_type(b)
}

/// `true` when `vnode` ends up as an element, following component roots.
pub(crate) fn is_patchable(vnode: &VNode) -> bool {
    match &vnode.component_instance {
        Some(child) => child.with_root_vnode(is_patchable).unwrap_or(false),
        None => vnode.tag.is_some(),
    }
}

/// Diff engine bound to one backend and module set.
pub struct Patcher {
    ops: Rc<dyn NodeOps>,
    modules: Vec<Box<dyn Module>>,
}

impl Patcher {
    pub fn new(ops: Rc<dyn NodeOps>) -> Self {
        Self::with_modules(ops, default_modules())
    }

    pub fn with_modules(ops: Rc<dyn NodeOps>, modules: Vec<Box<dyn Module>>) -> Self {
        Self { ops, modules }
    }

    pub fn ops(&self) -> &dyn NodeOps {
        &*self.ops
    }

    /// Patch and run insert hooks. Returns the new root element.
    pub fn patch(&self, old: Option<OldRoot>, vnode: Option<&mut VNode>) -> Result<Option<NodeId>, Error> {
        let (elm, queue) = self.patch_root(old, vnode)?;
        queue.flush();
        Ok(elm)
    }

    /// Patch, returning the insert queue instead of running it.
    pub(crate) fn patch_root(
        &self,
        old: Option<OldRoot>,
        vnode: Option<&mut VNode>,
    ) -> Result<(Option<NodeId>, InsertQueue), Error> {
        let mut queue = InsertQueue::default();
        let Some(vnode) = vnode else {
            if let Some(OldRoot::VNode(mut old)) = old {
                self.remove_vnode(&mut old)?;
            }
            return Ok((None, queue));
        };

        match old {
            None => self.create_elm(vnode, &mut queue, None, None)?,
            Some(OldRoot::VNode(old)) if same_vnode(&old, vnode) => self.patch_vnode(old, vnode, &mut queue)?,
            Some(old) => self.replace_root(old, vnode, &mut queue)?,
        }
        Ok((vnode.elm(), queue))
    }

    fn replace_root(&self, old: OldRoot, vnode: &mut VNode, queue: &mut InsertQueue) -> Result<(), Error> {
        let (old_elm, old_vnode) = match old {
            OldRoot::Element(elm) => (Some(elm), None),
            OldRoot::VNode(old) => (old.elm(), Some(old)),
        };
        let parent = old_elm.and_then(|elm| self.ops.parent_node(elm));
        let anchor = old_elm.and_then(|elm| self.ops.next_sibling(elm));

        self.create_elm(vnode, queue, parent, anchor)?;

        if let Some(host) = vnode.parent.as_ref().and_then(|p| p.upgrade()) {
            if is_patchable(vnode) {
                self.refresh_placeholder(&host, vnode, queue);
            } else {
                host.set_el(vnode.elm());
            }
        }

        match (old_vnode, parent, old_elm) {
            (Some(mut old), _, _) => self.remove_vnode(&mut old)?,
            (None, Some(parent), Some(elm)) => self.ops.remove_child(parent, elm),
            _ => {}
        }
        Ok(())
    }

    /// The root element of a child component changed: point the
    /// component (and every ancestor it is the root of) at the new element
    /// and re-apply the placeholders' module data to it.
    fn refresh_placeholder(&self, host: &Component, vnode: &VNode, queue: &mut InsertQueue) {
        let elm = vnode.elm();
        host.set_rendering(Some(vnode.snapshot()));
        let mut current = Some(host.clone());
        while let Some(component) = current {
            component.set_el(elm);
            let Some(placeholder) = component.placeholder_vnode() else {
                break;
            };
            let mut cx = PatchContext {
                ops: &*self.ops,
                queue: &mut *queue,
            };
            for module in &self.modules {
                module.create(&mut cx, &placeholder);
            }
            current = placeholder.parent.as_ref().and_then(|p| p.upgrade());
        }
    }

    pub(crate) fn create_elm(
        &self,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
        parent: Option<NodeId>,
        anchor: Option<NodeId>,
    ) -> Result<(), Error> {
        if vnode.component_options.is_some() {
            return self.create_component(vnode, queue, parent, anchor);
        }

        let elm = match &vnode.tag {
            Some(tag) => {
                let elm = match &vnode.ns {
                    Some(ns) => self.ops.create_element_ns(ns, tag),
                    None => self.ops.create_element(tag),
                };
                vnode.elm = Some(elm);
                check_duplicate_keys(&vnode.children, vnode.context().as_ref());
                for child in vnode.children.iter_mut() {
                    self.create_elm(child, queue, Some(elm), None)?;
                }
                if vnode.data.is_significant() {
                    self.invoke_create_hooks(vnode, queue);
                }
                elm
            }
            None if vnode.is_comment => self.ops.create_comment(vnode.text.as_deref().unwrap_or("")),
            None => self.ops.create_text_node(vnode.text.as_deref().unwrap_or("")),
        };
        vnode.elm = Some(elm);
        self.insert(parent, elm, anchor);
        Ok(())
    }

    fn create_component(
        &self,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
        parent: Option<NodeId>,
        anchor: Option<NodeId>,
    ) -> Result<(), Error> {
        let host = active_instance()
            .or_else(|| vnode.context())
            .ok_or_else(|| Error::OrphanComponent(vnode.tag.clone().unwrap_or_default()))?;
        let child = Component::create_child(&host, vnode)?;
        let pending = child.mount_as_child()?;

        vnode.component_instance = Some(child.clone());
        vnode.elm = child.el();
        queue.append(pending);
        if is_patchable(vnode) {
            self.invoke_create_hooks(vnode, queue);
        } else {
            crate::vdom::modules::register_ref(vnode);
        }
        queue.0.push(Inserted::Component(child));

        if let Some(elm) = vnode.elm {
            self.insert(parent, elm, anchor);
        }
        Ok(())
    }

    fn insert(&self, parent: Option<NodeId>, elm: NodeId, anchor: Option<NodeId>) {
        let Some(parent) = parent else {
            return;
        };
        match anchor {
            Some(anchor) if self.ops.parent_node(anchor) == Some(parent) => {
                self.ops.insert_before(parent, elm, Some(anchor))
            }
            _ => self.ops.append_child(parent, elm),
        }
    }

    fn invoke_create_hooks(&self, vnode: &VNode, queue: &mut InsertQueue) {
        {
            let mut cx = PatchContext {
                ops: &*self.ops,
                queue: &mut *queue,
            };
            for module in &self.modules {
                module.create(&mut cx, vnode);
            }
        }
        for hook in &vnode.data.hook.create {
            hook(vnode);
        }
        if !vnode.data.hook.insert.is_empty() {
            queue
                .0
                .push(Inserted::Hooks(vnode.data.hook.insert.clone(), vnode.snapshot()));
        }
    }

    pub(crate) fn patch_vnode(&self, mut old: VNode, vnode: &mut VNode, queue: &mut InsertQueue) -> Result<(), Error> {
        if vnode.is_static && old.is_static && vnode.key == old.key && (vnode.is_cloned || vnode.is_once) {
            vnode.elm = old.elm;
            vnode.component_instance = old.component_instance.take();
            vnode.children = std::mem::take(&mut old.children);
            return Ok(());
        }

        vnode.elm = old.elm;
        if vnode.component_options.is_some() {
            if let Some(child) = old.component_instance.take() {
                vnode.component_instance = Some(child.clone());
                child.update_from_placeholder(vnode)?;
            }
        }

        let elm = vnode.elm();
        let has_data = vnode.data.is_significant() || old.data.is_significant();
        if has_data && is_patchable(vnode) {
            let mut cx = PatchContext {
                ops: &*self.ops,
                queue: &mut *queue,
            };
            for module in &self.modules {
                module.update(&mut cx, &old, vnode);
            }
            for hook in &vnode.data.hook.update {
                hook(vnode);
            }
        }

        if let Some(elm) = elm {
            match &vnode.text {
                None => {
                    let old_children = std::mem::take(&mut old.children);
                    let old_had_text = old.text.as_deref().map_or(false, |t| !t.is_empty());
                    match (old_children.is_empty(), vnode.children.is_empty()) {
                        (false, false) => self.update_children(elm, old_children, &mut vnode.children, queue)?,
                        (true, false) => {
                            if old_had_text {
                                self.ops.set_text_content(elm, "");
                            }
                            check_duplicate_keys(&vnode.children, vnode.context().as_ref());
                            self.add_vnodes(elm, None, &mut vnode.children, queue)?;
                        }
                        (false, true) => self.remove_vnodes(old_children)?,
                        (true, true) => {
                            if old_had_text {
                                self.ops.set_text_content(elm, "");
                            }
                        }
                    }
                }
                Some(text) => {
                    if old.text.as_ref() != Some(text) {
                        self.ops.set_text_content(elm, text);
                    }
                }
            }
        }

        if has_data {
            let mut cx = PatchContext {
                ops: &*self.ops,
                queue: &mut *queue,
            };
            for module in &self.modules {
                module.post_patch(&mut cx, &old, vnode);
            }
            for hook in &vnode.data.hook.postpatch {
                hook(vnode);
            }
        }
        Ok(())
    }

    fn add_vnodes(
        &self,
        parent: NodeId,
        anchor: Option<NodeId>,
        vnodes: &mut [VNode],
        queue: &mut InsertQueue,
    ) -> Result<(), Error> {
        for vnode in vnodes {
            self.create_elm(vnode, queue, Some(parent), anchor)?;
        }
        Ok(())
    }

    fn remove_vnodes(&self, vnodes: impl IntoIterator<Item = VNode>) -> Result<(), Error> {
        for mut vnode in vnodes {
            self.remove_vnode(&mut vnode)?;
        }
        Ok(())
    }

    /// Detach `vnode` from the DOM, then run its destroy hooks.
    fn remove_vnode(&self, vnode: &mut VNode) -> Result<(), Error> {
        if let Some(elm) = vnode.elm() {
            if let Some(parent) = self.ops.parent_node(elm) {
                self.ops.remove_child(parent, elm);
            }
        }
        if vnode.tag.is_some() {
            self.invoke_destroy_hook(vnode)?;
        }
        Ok(())
    }

    /// Destroy hooks, children before their parent.
    fn invoke_destroy_hook(&self, vnode: &mut VNode) -> Result<(), Error> {
        for child in vnode.children.iter_mut() {
            self.invoke_destroy_hook(child)?;
        }
        if let Some(child) = vnode.component_instance.clone() {
            child.destroy()?;
        }
        if vnode.tag.is_some() {
            for module in &self.modules {
                module.destroy(&*self.ops, vnode);
            }
            for hook in &vnode.data.hook.destroy {
                hook(vnode);
            }
        }
        Ok(())
    }
}

fn check_duplicate_keys(children: &[VNode], vm: Option<&Component>) {
    let mut seen = std::collections::HashSet::new();
    for key in children.iter().filter_map(|c| c.key.as_ref()) {
        if !seen.insert(key) {
            warn(format!("Duplicate keys detected: '{key}'. This may cause an update error."), vm);
        }
    }
}
