use std::collections::BTreeMap;
use std::sync::Arc;

use arbor_core::node::{BasicGroup, BasicTask, GroupNode, Node};
use arbor_core::scheduler::{ExecutionPlan, NodeKind, PlanBuilder, RunnableOrder, SegmentRef};
use pretty_assertions::assert_eq;

fn task(id: &str) -> Node {
    BasicTask::new(id, |_| Ok(())).into_node()
}

/// root
/// ├── outer (has setup)
/// │   ├── inner (has setup, reentrant)
/// │   │   ├── a
/// │   │   └── b
/// │   ├── c
/// │   └── e
/// └── d
fn nested_tree() -> Arc<dyn GroupNode> {
    let inner = BasicGroup::builder("inner")
        .setup(|_| Ok(()))
        .reentrant(true)
        .child(task("a"))
        .child(task("b"))
        .into_node();
    let outer = BasicGroup::builder("outer")
        .setup(|_| Ok(()))
        .child(inner)
        .child(task("c"))
        .child(task("e"))
        .into_node();
    Arc::new(BasicGroup::builder("root").child(outer).child(task("d")).build())
}

/// How many times each segment is listed as a member of some group segment.
fn membership_counts(plan: &ExecutionPlan) -> BTreeMap<SegmentRef, usize> {
    let mut counts = BTreeMap::new();
    for record in plan.records().values() {
        if record.kind != NodeKind::Group {
            continue;
        }
        for segment in &record.segments {
            for member in &segment.members {
                *counts.entry(member.clone()).or_insert(0) += 1;
            }
        }
    }
    counts
}

fn assert_full_containment(plan: &ExecutionPlan) {
    let counts = membership_counts(plan);
    let mut expected = BTreeMap::new();
    for (id, record) in plan.records() {
        if id == plan.root() {
            continue;
        }
        for segment in &record.segments {
            expected.insert(segment.reference(), 1);
        }
    }
    assert_eq!(counts, expected);
}

#[test]
fn test_every_segment_has_exactly_one_parent_segment() {
    let tree = nested_tree();
    let plan = PlanBuilder::new()
        .build(&tree, &RunnableOrder::new(["a", "c", "b", "d"]))
        .unwrap();

    assert_eq!(plan.segments("inner").len(), 2);
    assert_eq!(plan.deprecations().len(), 1);
    assert_full_containment(&plan);
}

#[test]
fn test_unsplit_tree_is_fully_contained() {
    let tree = nested_tree();
    let plan = PlanBuilder::new()
        .build(&tree, &RunnableOrder::new(["root"]))
        .unwrap();

    for id in ["root", "outer", "inner"] {
        assert_eq!(plan.segments(id).len(), 1, "group {id}");
    }
    assert_full_containment(&plan);
}
