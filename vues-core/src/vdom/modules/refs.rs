use super::{Module, PatchContext};
use crate::dom::NodeOps;
use crate::instance::RefTarget;
use crate::vdom::VNode;

/// Registers `ref` names on the rendering component.
pub struct RefsModule;

fn register(vnode: &VNode, remove: bool) {
    let Some(name) = &vnode.data.ref_name else {
        return;
    };
    let Some(vm) = vnode.context() else {
        return;
    };
    let target = match &vnode.component_instance {
        Some(child) => RefTarget::Component(child.clone()),
        None => match vnode.elm() {
            Some(elm) => RefTarget::Element(elm),
            None => return,
        },
    };
    if remove {
        vm.unregister_ref(name, &target);
    } else {
        vm.register_ref(name, target, vnode.data.ref_in_for);
    }
}

/// Register the ref of a component placeholder whose root is not an
/// element, which skips the other modules.
pub(crate) fn register_ref(vnode: &VNode) {
    register(vnode, false);
}

impl Module for RefsModule {
    fn create(&self, _cx: &mut PatchContext<'_>, vnode: &VNode) {
        register(vnode, false);
    }

    fn update(&self, _cx: &mut PatchContext<'_>, old: &VNode, vnode: &VNode) {
        if old.data.ref_name != vnode.data.ref_name {
            register(old, true);
            register(vnode, false);
        }
    }

    fn destroy(&self, _ops: &dyn NodeOps, vnode: &VNode) {
        register(vnode, true);
    }
}
