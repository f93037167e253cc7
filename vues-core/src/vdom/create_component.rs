//! Component placeholders.
//!
//! A child component appears in its parent's tree as a placeholder vnode.
//! The placeholder records everything the patcher needs to instantiate the
//! child later: the constructor, resolved prop values, component-event
//! listeners, and the slot children.

use indexmap::IndexMap;

use super::{Listener, VNode, VNodeData};
use crate::instance::{ComponentCtor, WeakComponent};
use crate::reactive::Value;
use crate::util::hyphenate;

/// Extra state carried by a component placeholder.
pub struct ComponentVNodeOptions {
    pub ctor: ComponentCtor,
    pub props_data: IndexMap<String, Value>,
    pub listeners: IndexMap<String, Vec<Listener>>,
    pub children: Vec<VNode>,
    /// Tag the component was referenced by, if any.
    pub tag: Option<String>,
}

impl ComponentVNodeOptions {
    pub(crate) fn clone_fresh(&self) -> Self {
        Self {
            ctor: self.ctor.clone(),
            props_data: self.props_data.clone(),
            listeners: self.listeners.clone(),
            children: self.children.iter().map(VNode::clone_fresh).collect(),
            tag: self.tag.clone(),
        }
    }
}

/// Build the placeholder vnode for `ctor`.
///
/// Declared props are pulled out of `data.props` (kept there) and
/// `data.attrs` (removed, so they do not land on the child's root element),
/// under either their camelCase or hyphenated name. `data.on` becomes the
/// component's listeners and `data.native_on` takes its place as DOM
/// listeners on the child's root.
pub fn create_component(
    ctor: ComponentCtor,
    mut data: VNodeData,
    context: Option<WeakComponent>,
    children: Vec<VNode>,
    tag: Option<String>,
) -> VNode {
    let props_data = extract_props(&mut data, &ctor);
    let listeners = std::mem::take(&mut data.on);
    data.on = std::mem::take(&mut data.native_on);

    let vtag = match ctor.name().or(tag.as_deref()) {
        Some(name) => format!("vues-component-{}-{}", ctor.cid(), name),
        None => format!("vues-component-{}", ctor.cid()),
    };
    let mut vnode = VNode::element(vtag, data, Vec::new());
    vnode.context = context;
    vnode.component_options = Some(ComponentVNodeOptions {
        ctor,
        props_data,
        listeners,
        children,
        tag,
    });
    vnode
}

fn extract_props(data: &mut VNodeData, ctor: &ComponentCtor) -> IndexMap<String, Value> {
    let mut res = IndexMap::new();
    for key in ctor.prop_names() {
        let alt = hyphenate(key);
        let from_props = data.props.get(key).or_else(|| data.props.get(&alt)).cloned();
        let value = match from_props {
            Some(value) => Some(value),
            None => data
                .attrs
                .shift_remove(key)
                .or_else(|| data.attrs.shift_remove(&alt)),
        };
        if let Some(value) = value {
            res.insert(key.clone(), value);
        }
    }
    res
}
