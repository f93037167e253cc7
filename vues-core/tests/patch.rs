//! Integration Tests for the Patcher
//!
//! These tests drive the patcher against the in-memory DOM and check both
//! the resulting markup and the mutation counters.

use std::cell::RefCell;
use std::rc::Rc;

use vues_core::dom::{MemoryDom, NodeId};
use vues_core::reactive::Value;
use vues_core::vdom::{listener, ClassBinding, CreateElement, OldRoot, Patcher, VNode, VNodeData};

struct Harness {
    dom: Rc<MemoryDom>,
    patcher: Patcher,
    current: Option<VNode>,
    target: Option<NodeId>,
}

impl Harness {
    fn new() -> Self {
        let dom = Rc::new(MemoryDom::new());
        let target = dom.mount_point("div");
        Self {
            patcher: Patcher::new(dom.clone()),
            dom,
            current: None,
            target: Some(target),
        }
    }

    /// Patch `vnode` over whatever was rendered before and reset the
    /// counters beforehand.
    fn render(&mut self, mut vnode: VNode) {
        self.dom.reset_stats();
        let old = match self.current.take() {
            Some(prev) => Some(OldRoot::VNode(prev)),
            None => self.target.take().map(OldRoot::Element),
        };
        self.patcher.patch(old, Some(&mut vnode)).unwrap();
        self.current = Some(vnode);
    }

    fn html(&self) -> String {
        self.dom.inner_html(self.dom.body())
    }
}

fn keyed_list(keys: &[&str]) -> VNode {
    let items = keys
        .iter()
        .map(|k| VNode::element("li", VNodeData::new().key(*k), vec![VNode::text(*k)]))
        .collect();
    VNode::element("ul", VNodeData::new(), items)
}

fn page(title: &str, active: bool) -> VNode {
    VNode::element(
        "main",
        VNodeData::new()
            .attr("id", "app")
            .static_class("page")
            .class(ClassBinding::map([("active", active)]))
            .static_style("margin", "0")
            .style("color", "red"),
        vec![
            VNode::element("h1", VNodeData::new(), vec![VNode::text(title)]),
            keyed_list(&["a", "b", "c"]),
            VNode::comment("end"),
        ],
    )
}

/// Patching a tree against an identical copy touches nothing.
#[test]
fn identical_tree_is_a_no_op() {
    let mut h = Harness::new();
    h.render(page("Hello", true));
    assert!(h.dom.stats().created > 0);

    h.render(page("Hello", true));
    assert_eq!(h.dom.stats().total(), 0, "{:?}", h.dom.stats());
}

/// Rotating `[a, b, c, d]` to `[d, a, b, c]` reuses every node with one
/// move.
#[test]
fn rotation_reuses_all_nodes() {
    let mut h = Harness::new();
    h.render(keyed_list(&["a", "b", "c", "d"]));
    let before = h.dom.children(h.current.as_ref().unwrap().elm().unwrap());

    h.render(keyed_list(&["d", "a", "b", "c"]));
    let stats = h.dom.stats();
    assert_eq!(stats.created, 0);
    assert_eq!(stats.removed, 0);
    assert_eq!(stats.moved, 1);

    let after = h.dom.children(h.current.as_ref().unwrap().elm().unwrap());
    assert_eq!(after, vec![before[3], before[0], before[1], before[2]]);
    assert_eq!(h.html(), "<ul><li>d</li><li>a</li><li>b</li><li>c</li></ul>");
}

/// Only the changed aspects of a node are written.
#[test]
fn data_changes_write_only_what_changed() {
    let mut h = Harness::new();
    h.render(page("Hello", false));
    assert_eq!(
        h.html(),
        "<main id=\"app\" class=\"page\" style=\"margin: 0;color: red;\">\
         <h1>Hello</h1><ul><li>a</li><li>b</li><li>c</li></ul><!--end--></main>"
    );

    h.render(page("Hello", true));
    let stats = h.dom.stats();
    assert_eq!(stats.attribute_updates, 1);
    assert_eq!(stats.total(), 1);
    assert!(h.html().starts_with("<main id=\"app\" class=\"page active\""));

    h.render(page("Bye", true));
    assert_eq!(h.dom.stats().text_updates, 1);
    assert_eq!(h.dom.stats().total(), 1);
}

/// Boolean and null attributes follow HTML conventions.
#[test]
fn attribute_values() {
    let mut h = Harness::new();
    let input = |disabled: bool, title: Value| {
        VNode::element(
            "input",
            VNodeData::new().attr("disabled", disabled).attr("title", title),
            vec![],
        )
    };
    h.render(input(true, Value::from("x")));
    assert_eq!(h.html(), "<input disabled=\"disabled\" title=\"x\"></input>");

    h.render(input(false, Value::Null));
    assert_eq!(h.html(), "<input></input>");
}

/// A swapped handler is picked up without re-registering the listener.
#[test]
fn event_handlers_are_swapped_in_place() {
    let mut h = Harness::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let button = |tag: &'static str| {
        let log = log.clone();
        VNode::element(
            "button",
            VNodeData::new().on(
                "click",
                listener(move |_| {
                    log.borrow_mut().push(tag);
                    Ok(())
                }),
            ),
            vec![],
        )
    };

    h.render(button("first"));
    let elm = h.current.as_ref().unwrap().elm().unwrap();
    h.dom.dispatch_event(elm, "click", &[]).unwrap();

    h.render(button("second"));
    assert_eq!(h.dom.stats().listener_updates, 0);
    h.dom.dispatch_event(elm, "click", &[]).unwrap();
    assert_eq!(*log.borrow(), vec!["first", "second"]);

    h.render(VNode::element("button", VNodeData::new(), vec![]));
    assert!(!h.dom.has_listener(elm, "click"));
}

/// SVG children get the SVG namespace; `foreignObject` content does not.
#[test]
fn svg_namespace_is_inherited() {
    let mut h = Harness::new();
    let b = CreateElement::new();
    let tree = b.element(
        "svg",
        VNodeData::new(),
        vec![
            b.element("circle", VNodeData::new(), vec![]).into(),
            b.element(
                "foreignObject",
                VNodeData::new(),
                vec![b.element("div", VNodeData::new(), vec![]).into()],
            )
            .into(),
        ],
    );
    h.render(tree);

    let root = h.current.as_ref().unwrap();
    let circle = root.children[0].elm().unwrap();
    let div = root.children[1].children[0].elm().unwrap();
    assert_eq!(h.dom.namespace(circle).as_deref(), Some("svg"));
    assert_eq!(h.dom.namespace(div), None);
}

/// Removing a subtree runs destroy hooks for every node in it.
#[test]
fn removed_subtree_runs_destroy_hooks() {
    let mut h = Harness::new();
    let destroyed = Rc::new(RefCell::new(Vec::new()));
    let item = |key: &'static str| {
        let log = destroyed.clone();
        VNode::element(
            "li",
            VNodeData::new().key(key).hook_destroy(move |_| log.borrow_mut().push(key)),
            vec![],
        )
    };

    h.render(VNode::element("ul", VNodeData::new(), vec![item("a"), item("b"), item("c")]));
    h.render(VNode::element("ul", VNodeData::new(), vec![item("b")]));
    assert_eq!(*destroyed.borrow(), vec!["a", "c"]);
    assert_eq!(h.dom.stats().removed, 2);
}

/// Text and element children swap cleanly.
#[test]
fn text_and_children_swap() {
    let mut h = Harness::new();
    h.render(VNode::element("div", VNodeData::new(), vec![VNode::text("plain")]));
    h.render(VNode::element("div", VNodeData::new(), vec![]));
    assert_eq!(h.html(), "<div></div>");
    h.render(VNode::element("div", VNodeData::new(), vec![VNode::element("b", VNodeData::new(), vec![])]));
    assert_eq!(h.html(), "<div><b></b></div>");
}
