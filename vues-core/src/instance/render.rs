use super::{Component, Rendered};
use crate::error::{handle_error, warn};
use crate::vdom::{CreateElement, VNode};

impl Component {
    /// Call the render function and normalize its result to one root.
    ///
    /// `None` means the render failed after a previous successful one; the
    /// caller keeps the tree it already has.
    pub(crate) fn render(&self) -> Option<VNode> {
        let Some(render) = self.0.options.render_fn().cloned() else {
            return Some(VNode::empty());
        };
        let h = CreateElement::for_component(self);
        match render(self, &h) {
            Ok(Rendered::Node(vnode)) => Some(vnode),
            Ok(Rendered::Nodes(mut nodes)) if nodes.len() == 1 => nodes.pop(),
            Ok(Rendered::Nodes(_)) => {
                warn(
                    "Multiple root nodes returned from render function. Render function should return a single root node.",
                    Some(self),
                );
                Some(VNode::empty())
            }
            Ok(Rendered::Empty) => Some(VNode::empty()),
            Err(err) => {
                handle_error(&*err, Some(self), "render");
                let has_previous = self.0.vnode.try_borrow().map_or(true, |v| v.is_some());
                (!has_previous).then(VNode::empty)
            }
        }
    }

    /// Fresh copies of the slot content the parent passed in. `None` is the
    /// default slot, which skips whitespace-only text.
    pub fn slot(&self, name: Option<&str>) -> Vec<VNode> {
        self.0
            .slot_children
            .borrow()
            .iter()
            .filter(|child| match name {
                Some(name) => child.data.slot.as_deref() == Some(name),
                None => {
                    child.data.slot.is_none()
                        && !(child.tag.is_none()
                            && !child.is_comment
                            && child.text.as_deref().map_or(true, |t| t.trim().is_empty()))
                }
            })
            .map(VNode::clone_fresh)
            .collect()
    }

    /// Everything the parent passed between the component's tags.
    pub fn slot_children(&self) -> Vec<VNode> {
        self.0.slot_children.borrow().iter().map(VNode::clone_fresh).collect()
    }

    /// Whether the parent passed any content for slot `name`.
    pub fn has_slot(&self, name: Option<&str>) -> bool {
        !self.slot(name).is_empty()
    }
}
