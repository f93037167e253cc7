use super::{Module, PatchContext};
use crate::dom::{NodeId, NodeOps};
use crate::reactive::Value;
use crate::vdom::VNode;

/// Element attributes. `null` and `false` remove the attribute; `true`
/// sets it to its own name.
pub struct AttrsModule;

impl AttrsModule {
    fn apply(&self, ops: &dyn NodeOps, old: Option<&VNode>, vnode: &VNode) {
        let old_attrs = old.map(|o| &o.data.attrs);
        if old_attrs.map_or(true, |a| a.is_empty()) && vnode.data.attrs.is_empty() {
            return;
        }
        let Some(elm) = vnode.elm() else {
            return;
        };

        for (name, value) in &vnode.data.attrs {
            let unchanged = old_attrs
                .and_then(|attrs| attrs.get(name))
                .map_or(false, |prev| prev.same_value(value));
            if !unchanged {
                set_attr(ops, elm, name, value);
            }
        }
        if let Some(old_attrs) = old_attrs {
            for name in old_attrs.keys() {
                if !vnode.data.attrs.contains_key(name) {
                    ops.remove_attribute(elm, name);
                }
            }
        }
    }
}

fn set_attr(ops: &dyn NodeOps, elm: NodeId, name: &str, value: &Value) {
    match value {
        Value::Null | Value::Bool(false) => ops.remove_attribute(elm, name),
        Value::Bool(true) => ops.set_attribute(elm, name, name),
        other => ops.set_attribute(elm, name, &other.to_display_string()),
    }
}

impl Module for AttrsModule {
    fn create(&self, cx: &mut PatchContext<'_>, vnode: &VNode) {
        self.apply(cx.ops, None, vnode);
    }

    fn update(&self, cx: &mut PatchContext<'_>, old: &VNode, vnode: &VNode) {
        self.apply(cx.ops, Some(old), vnode);
    }
}
