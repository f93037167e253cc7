use indexmap::IndexMap;

use super::{Module, PatchContext};
use crate::dom::NodeOps;
use crate::vdom::{VNode, VNodeData};

/// Inline styles: static entries first, dynamic ones override.
pub struct StyleModule;

fn merged(data: &VNodeData) -> IndexMap<&str, &str> {
    data.static_style
        .iter()
        .chain(data.style.iter())
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

impl StyleModule {
    fn apply(&self, ops: &dyn NodeOps, old: Option<&VNode>, vnode: &VNode) {
        let has_style = |d: &VNodeData| !d.static_style.is_empty() || !d.style.is_empty();
        if !has_style(&vnode.data) && old.map_or(true, |o| !has_style(&o.data)) {
            return;
        }
        let Some(elm) = vnode.elm() else {
            return;
        };

        let old_style = old.map(|o| merged(&o.data)).unwrap_or_default();
        let new_style = merged(&vnode.data);
        for name in old_style.keys() {
            if !new_style.contains_key(name) {
                ops.remove_style_property(elm, name);
            }
        }
        for (name, value) in &new_style {
            if old_style.get(name) != Some(value) {
                ops.set_style_property(elm, name, value);
            }
        }
    }
}

impl Module for StyleModule {
    fn create(&self, cx: &mut PatchContext<'_>, vnode: &VNode) {
        self.apply(cx.ops, None, vnode);
    }

    fn update(&self, cx: &mut PatchContext<'_>, old: &VNode, vnode: &VNode) {
        self.apply(cx.ops, Some(old), vnode);
    }
}
