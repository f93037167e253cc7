//! Class merging across component boundaries.
//!
//! A child component's root element shows the classes of its own root
//! vnode plus those written on the placeholder in the parent. Whichever
//! side is being patched computes the merged list: a placeholder looks
//! down into the child's current root, a child root looks up through its
//! placeholder chain.

use super::{Module, PatchContext};
use crate::dom::NodeOps;
use crate::vdom::{ClassBinding, VNode, VNodeData};

pub struct ClassModule;

#[derive(Default)]
struct ClassData {
    static_class: Vec<String>,
    dynamic: Vec<ClassBinding>,
}

impl ClassData {
    fn of(data: &VNodeData) -> Self {
        Self {
            static_class: data.static_class.iter().cloned().collect(),
            dynamic: data.class.iter().cloned().collect(),
        }
    }

    /// Child classes first, then parent classes.
    fn merge(child: ClassData, parent: ClassData) -> Self {
        let mut merged = child;
        merged.static_class.extend(parent.static_class);
        merged.dynamic.extend(parent.dynamic);
        merged
    }

    fn render(&self) -> String {
        let dynamic = ClassBinding::List(self.dynamic.clone()).render();
        self.static_class
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .chain((!dynamic.is_empty()).then_some(dynamic.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn has_class(data: &VNodeData) -> bool {
    data.static_class.is_some() || data.class.is_some()
}

/// `None` when the placeholder's child root is not available right now.
fn gen_class(vnode: &VNode) -> Option<String> {
    let mut data = ClassData::of(&vnode.data);

    let mut child = vnode.component_instance.clone();
    while let Some(instance) = child {
        let (root_data, next) = instance.with_root_vnode(|root| {
            (ClassData::of(&root.data), root.component_instance.clone())
        })?;
        data = ClassData::merge(root_data, data);
        child = next;
    }

    let mut host = vnode.parent.as_ref().and_then(|p| p.upgrade());
    while let Some(component) = host {
        let Some((placeholder_data, next)) = component.with_placeholder(|p| (ClassData::of(&p.data), p.parent.clone()))
        else {
            break;
        };
        data = ClassData::merge(data, placeholder_data);
        host = next.and_then(|p| p.upgrade());
    }

    Some(data.render())
}

impl ClassModule {
    fn apply(&self, ops: &dyn NodeOps, old: Option<&VNode>, vnode: &VNode) {
        if !has_class(&vnode.data) && old.map_or(true, |o| !has_class(&o.data)) {
            return;
        }
        let Some(elm) = vnode.elm() else {
            return;
        };
        let Some(class) = gen_class(vnode) else {
            return;
        };
        let current = ops.get_attribute(elm, "class");
        if current.as_deref().unwrap_or("") != class {
            ops.set_attribute(elm, "class", &class);
        }
    }
}

impl Module for ClassModule {
    fn create(&self, cx: &mut PatchContext<'_>, vnode: &VNode) {
        self.apply(cx.ops, None, vnode);
    }

    fn update(&self, cx: &mut PatchContext<'_>, old: &VNode, vnode: &VNode) {
        self.apply(cx.ops, Some(old), vnode);
    }
}
