//! Keyed children diff.
//!
//! Walks the old and new child lists from both ends at once, trying four
//! pairings per step: start/start, end/end, start/end (node moved right)
//! and end/start (node moved left). When none match, the new start child
//! is looked up among the remaining old children by key, or by scanning
//! for a same-node candidate when it has no key. Matched old slots are
//! emptied so later steps skip them. Leftover new children are created,
//! leftover old children removed.
//!
//! Rotating `[a, b, c, d]` to `[d, a, b, c]` costs a single move.

use std::collections::HashMap;

use super::{same_vnode, InsertQueue, Patcher};
use crate::dom::NodeId;
use crate::error::Error;
use crate::vdom::{Key, VNode};

fn same(old: &Option<VNode>, vnode: &VNode) -> bool {
    old.as_ref().map_or(false, |old| same_vnode(old, vnode))
}

fn elm_of(old: &Option<VNode>) -> Option<NodeId> {
    old.as_ref().and_then(VNode::elm)
}

fn key_to_old_index(old: &[Option<VNode>], start: usize, end: usize) -> HashMap<Key, usize> {
    let mut map = HashMap::new();
    for (i, child) in old.iter().enumerate().take(end + 1).skip(start) {
        if let Some(key) = child.as_ref().and_then(|c| c.key.clone()) {
            map.insert(key, i);
        }
    }
    map
}

fn find_index_in_old(vnode: &VNode, old: &[Option<VNode>], start: usize, end: usize) -> Option<usize> {
    (start..=end).find(|&i| same(&old[i], vnode))
}

impl Patcher {
    pub(super) fn update_children(
        &self,
        parent: NodeId,
        old_children: Vec<VNode>,
        new_children: &mut [VNode],
        queue: &mut InsertQueue,
    ) -> Result<(), Error> {
        if let Some(first) = new_children.first() {
            super::check_duplicate_keys(new_children, first.context().as_ref());
        }

        let mut old: Vec<Option<VNode>> = old_children.into_iter().map(Some).collect();
        let mut old_start = 0isize;
        let mut old_end = old.len() as isize - 1;
        let mut new_start = 0isize;
        let mut new_end = new_children.len() as isize - 1;
        let mut keys: Option<HashMap<Key, usize>> = None;

        while old_start <= old_end && new_start <= new_end {
            let (os, oe) = (old_start as usize, old_end as usize);
            let (ns, ne) = (new_start as usize, new_end as usize);

            if old[os].is_none() {
                old_start += 1;
            } else if old[oe].is_none() {
                old_end -= 1;
            } else if same(&old[os], &new_children[ns]) {
                if let Some(prev) = old[os].take() {
                    self.patch_vnode(prev, &mut new_children[ns], queue)?;
                }
                old_start += 1;
                new_start += 1;
            } else if same(&old[oe], &new_children[ne]) {
                if let Some(prev) = old[oe].take() {
                    self.patch_vnode(prev, &mut new_children[ne], queue)?;
                }
                old_end -= 1;
                new_end -= 1;
            } else if same(&old[os], &new_children[ne]) {
                let anchor = elm_of(&old[oe]).and_then(|elm| self.ops.next_sibling(elm));
                if let Some(prev) = old[os].take() {
                    self.patch_vnode(prev, &mut new_children[ne], queue)?;
                }
                if let Some(elm) = new_children[ne].elm() {
                    self.ops.insert_before(parent, elm, anchor);
                }
                old_start += 1;
                new_end -= 1;
            } else if same(&old[oe], &new_children[ns]) {
                let anchor = elm_of(&old[os]);
                if let Some(prev) = old[oe].take() {
                    self.patch_vnode(prev, &mut new_children[ns], queue)?;
                }
                if let Some(elm) = new_children[ns].elm() {
                    self.ops.insert_before(parent, elm, anchor);
                }
                old_end -= 1;
                new_start += 1;
            } else {
                let anchor = elm_of(&old[os]);
                let found = match &new_children[ns].key {
                    Some(key) => keys
                        .get_or_insert_with(|| key_to_old_index(&old, os, oe))
                        .get(key)
                        .copied(),
                    None => find_index_in_old(&new_children[ns], &old, os, oe),
                };
                match found.filter(|&i| same(&old[i], &new_children[ns])) {
                    Some(i) => {
                        if let Some(prev) = old[i].take() {
                            self.patch_vnode(prev, &mut new_children[ns], queue)?;
                        }
                        if let Some(elm) = new_children[ns].elm() {
                            self.ops.insert_before(parent, elm, anchor);
                        }
                    }
                    // New node, or same key on a different element.
                    None => self.create_elm(&mut new_children[ns], queue, Some(parent), anchor)?,
                }
                new_start += 1;
            }
        }

        if old_start > old_end {
            if new_start <= new_end {
                let (ns, ne) = (new_start as usize, new_end as usize);
                let anchor = new_children.get(ne + 1).and_then(VNode::elm);
                self.add_vnodes(parent, anchor, &mut new_children[ns..=ne], queue)?;
            }
        } else if new_start > new_end {
            let (os, oe) = (old_start as usize, old_end as usize);
            self.remove_vnodes(old.drain(os..=oe).flatten())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::dom::MemoryDom;
    use crate::vdom::patch::{OldRoot, Patcher};
    use crate::vdom::{VNode, VNodeData};

    fn keyed(keys: &[&str]) -> VNode {
        let items = keys
            .iter()
            .map(|k| VNode::element("li", VNodeData::new().key(*k), vec![VNode::text(*k)]))
            .collect();
        VNode::element("ul", VNodeData::new(), items)
    }

    fn unkeyed(texts: &[&str]) -> VNode {
        let items = texts
            .iter()
            .map(|t| VNode::element("li", VNodeData::new(), vec![VNode::text(*t)]))
            .collect();
        VNode::element("ul", VNodeData::new(), items)
    }

    fn transition(from: VNode, mut to: VNode) -> (Rc<MemoryDom>, VNode) {
        let dom = Rc::new(MemoryDom::new());
        let patcher = Patcher::new(dom.clone());
        let target = dom.mount_point("div");
        let mut from = from;
        patcher.patch(Some(OldRoot::Element(target)), Some(&mut from)).unwrap();
        dom.reset_stats();
        patcher.patch(Some(OldRoot::VNode(from)), Some(&mut to)).unwrap();
        (dom, to)
    }

    fn html(dom: &MemoryDom, vnode: &VNode) -> String {
        dom.outer_html(vnode.elm().unwrap())
    }

    #[test]
    fn rotation_is_a_single_move() {
        let (dom, to) = transition(keyed(&["a", "b", "c", "d"]), keyed(&["d", "a", "b", "c"]));
        assert_eq!(html(&dom, &to), "<ul><li>d</li><li>a</li><li>b</li><li>c</li></ul>");
        let stats = dom.stats();
        assert_eq!(stats.moved, 1);
        assert_eq!(stats.created, 0);
        assert_eq!(stats.removed, 0);
    }

    #[test]
    fn right_rotation_is_a_single_move() {
        let (dom, to) = transition(keyed(&["a", "b", "c", "d"]), keyed(&["b", "c", "d", "a"]));
        assert_eq!(html(&dom, &to), "<ul><li>b</li><li>c</li><li>d</li><li>a</li></ul>");
        assert_eq!(dom.stats().moved, 1);
    }

    #[test]
    fn reverse_keeps_every_node() {
        let (dom, to) = transition(keyed(&["a", "b", "c", "d", "e"]), keyed(&["e", "d", "c", "b", "a"]));
        assert_eq!(
            html(&dom, &to),
            "<ul><li>e</li><li>d</li><li>c</li><li>b</li><li>a</li></ul>"
        );
        assert_eq!(dom.stats().created, 0);
        assert_eq!(dom.stats().removed, 0);
    }

    #[test]
    fn insert_and_remove_in_the_middle() {
        let (dom, to) = transition(keyed(&["a", "b", "c"]), keyed(&["a", "x", "c"]));
        assert_eq!(html(&dom, &to), "<ul><li>a</li><li>x</li><li>c</li></ul>");
        let stats = dom.stats();
        // the new <li> and its text
        assert_eq!(stats.created, 2);
        assert_eq!(stats.removed, 1);
    }

    #[test]
    fn appends_before_trailing_matches() {
        let (dom, to) = transition(keyed(&["a", "d"]), keyed(&["a", "b", "c", "d"]));
        assert_eq!(html(&dom, &to), "<ul><li>a</li><li>b</li><li>c</li><li>d</li></ul>");
        assert_eq!(dom.stats().removed, 0);
    }

    #[test]
    fn shuffle_through_key_map() {
        let (dom, to) = transition(keyed(&["a", "b", "c", "d", "e"]), keyed(&["c", "e", "a", "x", "b"]));
        assert_eq!(
            html(&dom, &to),
            "<ul><li>c</li><li>e</li><li>a</li><li>x</li><li>b</li></ul>"
        );
        assert_eq!(dom.stats().removed, 1);
    }

    #[test]
    fn unkeyed_children_patch_in_place() {
        let (dom, to) = transition(unkeyed(&["1", "2", "3"]), unkeyed(&["3", "2"]));
        assert_eq!(html(&dom, &to), "<ul><li>3</li><li>2</li></ul>");
        let stats = dom.stats();
        assert_eq!(stats.created, 0);
        assert_eq!(stats.moved, 0);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.text_updates, 1);
    }
}
