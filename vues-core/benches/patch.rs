//! Benchmark: keyed children reconciliation and batched re-renders

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use vues_core::dom::MemoryDom;
use vues_core::instance::{Component, ComponentOptions};
use vues_core::reactive::Value;
use vues_core::scheduler::tick;
use vues_core::vdom::{OldRoot, Patcher, VNode, VNodeData};

const ROWS: usize = 1_000;

fn rows(keys: impl Iterator<Item = usize>) -> VNode {
    let items = keys
        .map(|k| VNode::element("li", VNodeData::new().key(k), vec![VNode::text(k.to_string())]))
        .collect();
    VNode::element("ul", VNodeData::new(), items)
}

/// A mounted list plus the next tree to patch in.
fn mounted(next: VNode) -> (Patcher, VNode, VNode) {
    let dom = Rc::new(MemoryDom::new());
    let target = dom.mount_point("div");
    let patcher = Patcher::new(dom);
    let mut current = rows(0..ROWS);
    patcher.patch(Some(OldRoot::Element(target)), Some(&mut current)).unwrap();
    (patcher, current, next)
}

fn benchmark_keyed_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_children");

    group.bench_function("identical", |b| {
        b.iter_batched(
            || mounted(rows(0..ROWS)),
            |(patcher, old, mut new)| black_box(patcher.patch(Some(OldRoot::VNode(old)), Some(&mut new)).unwrap()),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("rotate_left", |b| {
        b.iter_batched(
            || mounted(rows((1..ROWS).chain(0..1))),
            |(patcher, old, mut new)| black_box(patcher.patch(Some(OldRoot::VNode(old)), Some(&mut new)).unwrap()),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("reverse", |b| {
        b.iter_batched(
            || mounted(rows((0..ROWS).rev())),
            |(patcher, old, mut new)| black_box(patcher.patch(Some(OldRoot::VNode(old)), Some(&mut new)).unwrap()),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("swap_rows", |b| {
        let order = || {
            let mut keys: Vec<usize> = (0..ROWS).collect();
            keys.swap(1, ROWS - 2);
            keys.into_iter()
        };
        b.iter_batched(
            || mounted(rows(order())),
            |(patcher, old, mut new)| black_box(patcher.patch(Some(OldRoot::VNode(old)), Some(&mut new)).unwrap()),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn benchmark_component_update(c: &mut Criterion) {
    let table = ComponentOptions::new("table")
        .state("items", Value::array((0..ROWS).map(Value::from)))
        .render(|vm, h| {
            let items = vm.get("items");
            let rows = items
                .as_array()
                .map(|a| a.to_vec())
                .unwrap_or_default()
                .into_iter()
                .map(|v| h.element("li", VNodeData::new().key(v.to_display_string()), vec![v.into()]).into())
                .collect::<Vec<vues_core::vdom::Child>>();
            Ok(h.element("ul", VNodeData::new(), rows).into())
        })
        .define();

    let dom = Rc::new(MemoryDom::new());
    let target = dom.mount_point("div");
    let vm = Component::new(&table, Rc::new(Patcher::new(dom))).unwrap();
    vm.mount(Some(target)).unwrap();
    let items = vm.get("items");
    let items = items.as_array().unwrap().clone();

    c.bench_function("batched_mutations_one_render", |b| {
        b.iter(|| {
            // Ten writes, one flush.
            for _ in 0..10 {
                if let Some(last) = items.pop() {
                    items.unshift(vec![last]);
                }
            }
            tick().unwrap();
        });
    });
}

criterion_group!(benches, benchmark_keyed_diff, benchmark_component_update);
criterion_main!(benches);
