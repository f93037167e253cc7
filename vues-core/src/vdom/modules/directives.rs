//! Custom directives.
//!
//! A directive is a bundle of hooks registered on a component and attached
//! to elements through [`VNodeDirective`](crate::vdom::VNodeDirective)
//! entries in vnode data.

use std::rc::Rc;

use super::{Module, PatchContext};
use crate::dom::{NodeId, NodeOps};
use crate::error::warn;
use crate::reactive::Value;
use crate::vdom::{VNode, VNodeDirective};

/// Directive hook: `(element, binding, vnode)`.
pub type DirectiveHook = Rc<dyn Fn(NodeId, &DirectiveBinding, &VNode)>;

/// Hooks making up a directive. All are optional.
#[derive(Clone, Default)]
pub struct Directive {
    pub bind: Option<DirectiveHook>,
    pub inserted: Option<DirectiveHook>,
    pub update: Option<DirectiveHook>,
    pub component_updated: Option<DirectiveHook>,
    pub unbind: Option<DirectiveHook>,
}

impl Directive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_bind(mut self, f: impl Fn(NodeId, &DirectiveBinding, &VNode) + 'static) -> Self {
        self.bind = Some(Rc::new(f));
        self
    }

    pub fn on_inserted(mut self, f: impl Fn(NodeId, &DirectiveBinding, &VNode) + 'static) -> Self {
        self.inserted = Some(Rc::new(f));
        self
    }

    pub fn on_update(mut self, f: impl Fn(NodeId, &DirectiveBinding, &VNode) + 'static) -> Self {
        self.update = Some(Rc::new(f));
        self
    }

    pub fn on_component_updated(mut self, f: impl Fn(NodeId, &DirectiveBinding, &VNode) + 'static) -> Self {
        self.component_updated = Some(Rc::new(f));
        self
    }

    pub fn on_unbind(mut self, f: impl Fn(NodeId, &DirectiveBinding, &VNode) + 'static) -> Self {
        self.unbind = Some(Rc::new(f));
        self
    }
}

/// What a hook sees about its directive usage.
#[derive(Debug, Clone)]
pub struct DirectiveBinding {
    pub name: String,
    pub value: Value,
    pub old_value: Value,
    pub arg: Option<String>,
    pub modifiers: Vec<String>,
}

impl DirectiveBinding {
    fn new(dir: &VNodeDirective, old_value: Value) -> Self {
        Self {
            name: dir.name.clone(),
            value: dir.value.clone(),
            old_value,
            arg: dir.arg.clone(),
            modifiers: dir.modifiers.clone(),
        }
    }
}

pub struct DirectivesModule;

fn resolve(vnode: &VNode, name: &str) -> Option<Directive> {
    let vm = vnode.context()?;
    let found = vm.options().resolve_directive(name);
    if found.is_none() {
        warn(format!("Failed to resolve directive: {name}"), Some(&vm));
    }
    found
}

fn find<'a>(dirs: &'a [VNodeDirective], name: &str) -> Option<&'a VNodeDirective> {
    dirs.iter().find(|d| d.name == name)
}

impl DirectivesModule {
    fn apply(&self, cx: &mut PatchContext<'_>, old: Option<&VNode>, vnode: &VNode) {
        let old_dirs: &[VNodeDirective] = old.map(|o| o.data.directives.as_slice()).unwrap_or(&[]);
        if old_dirs.is_empty() && vnode.data.directives.is_empty() {
            return;
        }
        let Some(elm) = vnode.elm() else {
            return;
        };

        for dir in &vnode.data.directives {
            let Some(def) = resolve(vnode, &dir.name) else {
                continue;
            };
            match find(old_dirs, &dir.name) {
                None => {
                    let binding = DirectiveBinding::new(dir, Value::Null);
                    if let Some(bind) = &def.bind {
                        bind(elm, &binding, vnode);
                    }
                    if let Some(inserted) = def.inserted.clone() {
                        if old.is_none() {
                            let snapshot = vnode.snapshot();
                            cx.defer(move || inserted(elm, &binding, &snapshot));
                        } else {
                            inserted(elm, &binding, vnode);
                        }
                    }
                }
                Some(previous) => {
                    let binding = DirectiveBinding::new(dir, previous.value.clone());
                    if let Some(update) = &def.update {
                        update(elm, &binding, vnode);
                    }
                }
            }
        }

        if let Some(old) = old {
            for dir in old_dirs {
                if find(&vnode.data.directives, &dir.name).is_none() {
                    unbind(old, dir, elm);
                }
            }
        }
    }
}

fn unbind(vnode: &VNode, dir: &VNodeDirective, elm: NodeId) {
    let Some(def) = resolve(vnode, &dir.name) else {
        return;
    };
    if let Some(unbind) = &def.unbind {
        unbind(elm, &DirectiveBinding::new(dir, dir.value.clone()), vnode);
    }
}

impl Module for DirectivesModule {
    fn create(&self, cx: &mut PatchContext<'_>, vnode: &VNode) {
        self.apply(cx, None, vnode);
    }

    fn update(&self, cx: &mut PatchContext<'_>, old: &VNode, vnode: &VNode) {
        self.apply(cx, Some(old), vnode);
    }

    fn post_patch(&self, _cx: &mut PatchContext<'_>, old: &VNode, vnode: &VNode) {
        let Some(elm) = vnode.elm() else {
            return;
        };
        for dir in &vnode.data.directives {
            let Some(previous) = find(&old.data.directives, &dir.name) else {
                continue;
            };
            let Some(def) = resolve(vnode, &dir.name) else {
                continue;
            };
            if let Some(hook) = &def.component_updated {
                hook(elm, &DirectiveBinding::new(dir, previous.value.clone()), vnode);
            }
        }
    }

    fn destroy(&self, _ops: &dyn NodeOps, vnode: &VNode) {
        let Some(elm) = vnode.elm() else {
            return;
        };
        for dir in &vnode.data.directives {
            unbind(vnode, dir, elm);
        }
    }
}
