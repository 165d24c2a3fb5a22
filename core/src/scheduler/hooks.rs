use crate::node::{GroupNode, Node, TaskNode};

/// Decides the order in which a group's children are planned and run.
pub trait ChildOrder: Send + Sync {
    fn order(&self, group: &dyn GroupNode) -> Vec<Node>;
}

impl<F> ChildOrder for F
where
    F: Fn(&dyn GroupNode) -> Vec<Node> + Send + Sync,
{
    fn order(&self, group: &dyn GroupNode) -> Vec<Node> {
        self(group)
    }
}

/// Children in the order the group declares them.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralOrder;

impl ChildOrder for StructuralOrder {
    fn order(&self, group: &dyn GroupNode) -> Vec<Node> {
        group.children().to_vec()
    }
}

/// Excludes individual tasks from a run.
pub trait NodeFilter: Send + Sync {
    fn excludes(&self, task: &dyn TaskNode) -> bool;
}

impl<F> NodeFilter for F
where
    F: Fn(&dyn TaskNode) -> bool + Send + Sync,
{
    fn excludes(&self, task: &dyn TaskNode) -> bool {
        self(task)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IncludeAll;

impl NodeFilter for IncludeAll {
    fn excludes(&self, _task: &dyn TaskNode) -> bool {
        false
    }
}
