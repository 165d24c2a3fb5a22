use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::error::SchedulerError;
use crate::node::{GroupNode, Node, NodeId};

use super::hooks::{ChildOrder, IncludeAll, NodeFilter, StructuralOrder};
use super::order::RunnableOrder;
use super::policy::{split_warning, Deprecation, OrderingPolicy, SplitVerdict};
use super::segment::{segment_children, Segment, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Group,
    Task,
}

/// Per-node plan entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanRecord {
    pub kind: NodeKind,
    pub excluded: bool,
    pub will_execute: bool,
    /// A task has exactly one segment without members.
    pub segments: Vec<Segment>,
}

/// Immutable result of planning one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    root: NodeId,
    records: BTreeMap<NodeId, PlanRecord>,
    deprecations: Vec<Deprecation>,
}

impl ExecutionPlan {
    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn record(&self, id: &str) -> Option<&PlanRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> &BTreeMap<NodeId, PlanRecord> {
        &self.records
    }

    pub fn segments(&self, id: &str) -> &[Segment] {
        self.record(id)
            .map(|r| r.segments.as_slice())
            .unwrap_or_default()
    }

    /// Splits that were accepted with a warning.
    pub fn deprecations(&self) -> &[Deprecation] {
        &self.deprecations
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Task ids in the order the engine will reach them, excluded and
    /// pending tasks included.
    pub fn task_order(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        for segment in self.segments(self.root.as_str()) {
            self.collect_tasks(segment, &mut ids);
        }
        ids
    }

    fn collect_tasks(&self, segment: &Segment, ids: &mut Vec<NodeId>) {
        for member in &segment.members {
            let Some(record) = self.record(member.owner.as_str()) else {
                continue;
            };
            match record.kind {
                NodeKind::Task => ids.push(member.owner.clone()),
                NodeKind::Group => {
                    if let Some(child) = record.segments.get(member.index) {
                        self.collect_tasks(child, ids);
                    }
                }
            }
        }
    }
}

/// Builds an [`ExecutionPlan`] from a tree and a runnable order.
///
/// Building is pure: it reads the tree through the node contracts and never
/// mutates it.
#[derive(Clone)]
pub struct PlanBuilder {
    child_order: Arc<dyn ChildOrder>,
    filter: Arc<dyn NodeFilter>,
    policy: OrderingPolicy,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self {
            child_order: Arc::new(StructuralOrder),
            filter: Arc::new(IncludeAll),
            policy: OrderingPolicy::default(),
        }
    }
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_order(mut self, child_order: Arc<dyn ChildOrder>) -> Self {
        self.child_order = child_order;
        self
    }

    pub fn filter(mut self, filter: Arc<dyn NodeFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn policy(mut self, policy: OrderingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(
        &self,
        root: &Arc<dyn GroupNode>,
        order: &RunnableOrder,
    ) -> Result<ExecutionPlan, SchedulerError> {
        self.build_indexed(root, order).map(|(plan, _)| plan)
    }

    /// Like [`build`](Self::build), also returning every planned node by id.
    pub(crate) fn build_indexed(
        &self,
        root: &Arc<dyn GroupNode>,
        order: &RunnableOrder,
    ) -> Result<(ExecutionPlan, HashMap<NodeId, Node>), SchedulerError> {
        let mut walk = Walk {
            builder: self,
            order,
            records: BTreeMap::new(),
            nodes: HashMap::new(),
            deprecations: Vec::new(),
        };
        // The root starts excluded; the runnable order re-enables subtrees.
        walk.visit(&Node::Group(root.clone()), true)?;

        let plan = ExecutionPlan {
            root: root.id().clone(),
            records: walk.records,
            deprecations: walk.deprecations,
        };
        tracing::debug!(
            root = %plan.root,
            nodes = plan.len(),
            segments = plan.segments(plan.root.as_str()).len(),
            deprecations = plan.deprecations.len(),
            "execution plan built"
        );
        Ok((plan, walk.nodes))
    }
}

struct Walk<'a> {
    builder: &'a PlanBuilder,
    order: &'a RunnableOrder,
    records: BTreeMap<NodeId, PlanRecord>,
    nodes: HashMap<NodeId, Node>,
    deprecations: Vec<Deprecation>,
}

impl Walk<'_> {
    fn visit(&mut self, node: &Node, parent_excluded: bool) -> Result<(), SchedulerError> {
        let id = node.id().clone();
        if self.nodes.insert(id.clone(), node.clone()).is_some() {
            return Err(SchedulerError::DuplicateNodeId(id));
        }

        let position = self.order.position(id.as_str());
        let parent_excluded = parent_excluded && position.is_none();

        let record = match node {
            Node::Task(task) => {
                let excluded = parent_excluded || self.builder.filter.excludes(task.as_ref());
                PlanRecord {
                    kind: NodeKind::Task,
                    excluded,
                    will_execute: !excluded && !task.is_pending(),
                    segments: vec![Segment::new(id.clone(), 0, position.map(Span::at))],
                }
            }
            Node::Group(group) => {
                let children = self.builder.child_order.order(group.as_ref());
                for child in &children {
                    self.visit(child, parent_excluded)?;
                }

                let child_records: Vec<&PlanRecord> = children
                    .iter()
                    .filter_map(|child| self.records.get(child.id()))
                    .collect();
                let will_execute = child_records.iter().any(|r| r.will_execute);
                let segments = segment_children(
                    &id,
                    position,
                    child_records.iter().flat_map(|r| r.segments.iter()),
                );

                match self.builder.policy.judge(group.as_ref(), segments.len()) {
                    SplitVerdict::Single => {}
                    SplitVerdict::Tolerated => self.deprecations.push(Deprecation {
                        group: id.clone(),
                        segments: segments.len(),
                        message: split_warning(&id),
                    }),
                    SplitVerdict::Fatal => {
                        return Err(SchedulerError::InvalidOrder {
                            group: id,
                            segments: segments.len(),
                        });
                    }
                }

                PlanRecord {
                    kind: NodeKind::Group,
                    excluded: parent_excluded,
                    will_execute,
                    segments,
                }
            }
        };

        self.records.insert(id, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BasicGroup, BasicTask, TaskNode};
    use pretty_assertions::assert_eq;

    fn task(id: &str) -> Node {
        BasicTask::new(id, |_| Ok(())).into_node()
    }

    fn root(children: Vec<Node>) -> Arc<dyn GroupNode> {
        Arc::new(BasicGroup::builder("root").children(children).build())
    }

    fn ids(list: &[&str]) -> Vec<NodeId> {
        list.iter().map(|id| NodeId::from(*id)).collect()
    }

    /// root
    /// ├── g1 (has setup)
    /// │   ├── a
    /// │   └── b
    /// └── x
    fn split_tree() -> Arc<dyn GroupNode> {
        let g1 = BasicGroup::builder("g1")
            .setup(|_| Ok(()))
            .child(task("a"))
            .child(task("b"))
            .into_node();
        root(vec![g1, task("x")])
    }

    #[test]
    fn test_empty_order_keeps_one_structural_segment_per_group() {
        let tree = split_tree();
        let plan = PlanBuilder::new()
            .build(&tree, &RunnableOrder::empty())
            .unwrap();

        for id in ["root", "g1"] {
            let segments = plan.segments(id);
            assert_eq!(segments.len(), 1, "group {id}");
            assert_eq!(segments[0].span, None);
        }
        assert_eq!(plan.task_order(), ids(&["a", "b", "x"]));

        // Nothing is named, so everything stays excluded.
        let a = plan.record("a").unwrap();
        assert!(a.excluded);
        assert!(!a.will_execute);
        assert!(!plan.record("root").unwrap().will_execute);
    }

    #[test]
    fn test_naming_the_root_runs_everything() {
        let tree = split_tree();
        let plan = PlanBuilder::new()
            .build(&tree, &RunnableOrder::new(["root"]))
            .unwrap();

        assert!(plan.records().values().all(|r| !r.excluded && r.will_execute));
    }

    #[test]
    fn test_named_task_is_reenabled_but_siblings_are_not() {
        let tree = split_tree();
        let plan = PlanBuilder::new()
            .build(&tree, &RunnableOrder::new(["b"]))
            .unwrap();

        assert!(!plan.record("b").unwrap().excluded);
        assert!(plan.record("b").unwrap().will_execute);
        assert!(plan.record("a").unwrap().excluded);
        assert!(plan.record("x").unwrap().excluded);

        let g1 = plan.record("g1").unwrap();
        assert!(g1.excluded);
        assert!(g1.will_execute);
        assert_eq!(plan.task_order(), ids(&["b", "a", "x"]));
    }

    #[test]
    fn test_named_group_reenables_its_subtree() {
        let tree = split_tree();
        let plan = PlanBuilder::new()
            .build(&tree, &RunnableOrder::new(["g1"]))
            .unwrap();

        assert!(!plan.record("a").unwrap().excluded);
        assert!(!plan.record("b").unwrap().excluded);
        assert!(plan.record("x").unwrap().excluded);
    }

    #[test]
    fn test_split_of_non_reentrant_group_is_fatal() {
        let tree = split_tree();
        let err = PlanBuilder::new()
            .build(&tree, &RunnableOrder::new(["a", "x", "b"]))
            .unwrap_err();

        assert_eq!(
            err,
            SchedulerError::InvalidOrder {
                group: "g1".into(),
                segments: 2
            }
        );
    }

    #[test]
    fn test_split_of_reentrant_group_is_tolerated_and_recorded() {
        let g1 = BasicGroup::builder("g1")
            .child(task("a"))
            .child(task("b"))
            .into_node();
        let tree = root(vec![g1, task("x")]);
        let plan = PlanBuilder::new()
            .build(&tree, &RunnableOrder::new(["a", "x", "b"]))
            .unwrap();

        assert_eq!(plan.segments("g1").len(), 2);
        assert_eq!(plan.task_order(), ids(&["a", "x", "b"]));
        assert_eq!(plan.deprecations().len(), 1);
        assert_eq!(plan.deprecations()[0].group, NodeId::from("g1"));

        let strict = PlanBuilder::new()
            .policy(OrderingPolicy::strict())
            .build(&tree, &RunnableOrder::new(["a", "x", "b"]));
        assert!(matches!(strict, Err(SchedulerError::InvalidOrder { .. })));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let tree = root(vec![task("a"), task("a")]);
        let err = PlanBuilder::new()
            .build(&tree, &RunnableOrder::empty())
            .unwrap_err();
        assert_eq!(err, SchedulerError::DuplicateNodeId("a".into()));
    }

    #[test]
    fn test_pending_task_occupies_plan_space_without_executing() {
        let pending = BasicTask::new("p", |_| Ok(())).pending().into_node();
        let tree = root(vec![pending, task("q")]);
        let plan = PlanBuilder::new()
            .build(&tree, &RunnableOrder::new(["root"]))
            .unwrap();

        let p = plan.record("p").unwrap();
        assert!(!p.excluded);
        assert!(!p.will_execute);
        assert_eq!(plan.task_order(), ids(&["p", "q"]));
    }

    #[test]
    fn test_filter_excludes_even_named_tasks() {
        let tree = root(vec![task("keep"), task("skip")]);
        let plan = PlanBuilder::new()
            .filter(Arc::new(|task: &dyn TaskNode| task.id().as_str() == "skip"))
            .build(&tree, &RunnableOrder::new(["root", "skip"]))
            .unwrap();

        assert!(plan.record("skip").unwrap().excluded);
        assert!(!plan.record("keep").unwrap().excluded);
    }

    #[test]
    fn test_child_order_hook_is_consulted() {
        let tree = root(vec![task("a"), task("b"), task("c")]);
        let reversed = |group: &dyn GroupNode| -> Vec<Node> {
            group.children().iter().rev().cloned().collect()
        };
        let plan = PlanBuilder::new()
            .child_order(Arc::new(reversed))
            .build(&tree, &RunnableOrder::empty())
            .unwrap();
        assert_eq!(plan.task_order(), ids(&["c", "b", "a"]));
    }

    #[test]
    fn test_build_is_deterministic_and_contains_every_task_once() {
        let inner = BasicGroup::builder("inner")
            .child(task("c"))
            .child(task("d"))
            .into_node();
        let outer = BasicGroup::builder("outer")
            .child(task("b"))
            .child(inner)
            .into_node();
        let tree = root(vec![task("a"), outer, task("e")]);
        let order = RunnableOrder::new(["d", "e", "a"]);

        let builder = PlanBuilder::new();
        let first = builder.build(&tree, &order).unwrap();
        let second = builder.build(&tree, &order).unwrap();
        assert_eq!(first, second);

        let mut planned = first.task_order();
        planned.sort();
        assert_eq!(planned, ids(&["a", "b", "c", "d", "e"]));
        assert_eq!(first.task_order(), ids(&["d", "c", "b", "e", "a"]));
    }
}
