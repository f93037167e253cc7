//! DOM Backend
//!
//! The patcher never touches a document directly. Every structural or
//! attribute change goes through [`NodeOps`], so the same diff drives a
//! browser binding, a terminal renderer, or the in-memory tree in
//! [`MemoryDom`].

mod memory;
mod node;

pub use memory::{MemoryDom, MutationStats};
pub use node::NodeId;

use crate::vdom::Listener;

/// Primitive node operations used by the patcher and the patch modules.
///
/// Methods take `&self`; backends keep their own interior mutability.
pub trait NodeOps {
    fn create_element(&self, tag: &str) -> NodeId;

    fn create_element_ns(&self, namespace: &str, tag: &str) -> NodeId;

    fn create_text_node(&self, text: &str) -> NodeId;

    fn create_comment(&self, text: &str) -> NodeId;

    /// Insert `node` into `parent` before `reference`, or at the end when
    /// `reference` is `None`. A node that already has a parent is moved.
    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>);

    fn append_child(&self, parent: NodeId, node: NodeId) {
        self.insert_before(parent, node, None);
    }

    fn remove_child(&self, parent: NodeId, child: NodeId);

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn set_text_content(&self, node: NodeId, text: &str);

    fn set_attribute(&self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&self, node: NodeId, name: &str);

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_style_property(&self, node: NodeId, name: &str, value: &str);

    fn remove_style_property(&self, node: NodeId, name: &str);

    /// Attach the single dispatcher for `event`, replacing any previous one.
    fn add_event_listener(&self, node: NodeId, event: &str, listener: Listener);

    fn remove_event_listener(&self, node: NodeId, event: &str);
}
