use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::SharedContext;
use crate::error::{ErrorSink, MultipleCompletion, UnitFailure};
use crate::queue::{CompletionToken, QueueRunner, QueueableUnit};

/// Stable node identifier, unique within one tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Node of a scheduling tree: either a group or a leaf task.
#[derive(Clone)]
pub enum Node {
    Group(Arc<dyn GroupNode>),
    Task(Arc<dyn TaskNode>),
}

impl Node {
    pub fn group<G: GroupNode + 'static>(group: G) -> Self {
        Self::Group(Arc::new(group))
    }

    pub fn task<T: TaskNode + 'static>(task: T) -> Self {
        Self::Task(Arc::new(task))
    }

    pub fn id(&self) -> &NodeId {
        match self {
            Self::Group(group) => group.id(),
            Self::Task(task) => task.id(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Group(group) => group.description(),
            Self::Task(task) => task.description(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    pub fn result(&self) -> NodeResult {
        match self {
            Self::Group(group) => group.result(),
            Self::Task(task) => task.result(),
        }
    }

    /// Ids of every task below this node, in structural order.
    pub fn task_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        collect_task_ids(self, &mut ids);
        ids
    }
}

fn collect_task_ids(node: &Node, ids: &mut Vec<NodeId>) {
    match node {
        Node::Task(task) => ids.push(task.id().clone()),
        Node::Group(group) => {
            for child in group.children() {
                collect_task_ids(child, ids);
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(group) => f
                .debug_struct("Group")
                .field("id", group.id())
                .field("children", &group.children())
                .finish(),
            Self::Task(task) => f.debug_tuple("Task").field(task.id()).finish(),
        }
    }
}

/// Node with children and group-scoped setup/teardown sequences.
pub trait GroupNode: Send + Sync {
    fn id(&self) -> &NodeId;

    fn description(&self) -> &str {
        self.id().as_str()
    }

    /// Children in structural order.
    fn children(&self) -> &[Node];

    /// Fresh units for the setup sequence. Called once per segment.
    fn setup_units(&self) -> Vec<QueueableUnit>;

    /// Fresh units for the teardown sequence. Called once per segment.
    fn teardown_units(&self) -> Vec<QueueableUnit>;

    /// Whether setup/teardown may run more than once in one run.
    fn can_be_reentered(&self) -> bool {
        false
    }

    /// Context visible to this group's units and its descendants.
    ///
    /// `inherited` is the context of the enclosing run. Implementations
    /// return the same context for every segment of one run.
    fn shared_context(&self, inherited: &SharedContext) -> SharedContext;

    fn handle_exception(&self, failure: UnitFailure);

    fn handle_multiple_done(&self, violation: MultipleCompletion) {
        self.handle_exception(UnitFailure::MultipleCompletion(violation));
    }

    /// Release hook state once a segment has finished.
    fn cleanup_hooks(&self);

    fn result(&self) -> NodeResult;
}

/// Leaf unit of work.
pub trait TaskNode: Send + Sync {
    fn id(&self) -> &NodeId;

    fn description(&self) -> &str {
        self.id().as_str()
    }

    /// Pending tasks occupy plan space but never execute.
    fn is_pending(&self) -> bool {
        false
    }

    /// Run the task body. Must fire `invocation.done` exactly once.
    fn execute(&self, invocation: TaskInvocation);

    fn result(&self) -> NodeResult;
}

/// Execution-mode switches passed through to every task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFlags {
    /// A task that records no checks fails.
    pub fail_without_expectations: bool,
    /// Failures reported after a task completed go to the error sink.
    pub detect_late_failures: bool,
}

/// Everything a task needs to execute itself.
pub struct TaskInvocation {
    pub runner: Arc<dyn QueueRunner>,
    pub errors: Arc<dyn ErrorSink>,
    pub context: SharedContext,
    pub done: CompletionToken,
    pub excluded: bool,
    pub flags: ExecutionFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Passed,
    Failed,
    Excluded,
    Pending,
    /// Not executed in the current run (yet).
    NotRun,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Excluded => "excluded",
            Self::Pending => "pending",
            Self::NotRun => "not run",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeResult {
    pub id: NodeId,
    pub status: NodeStatus,
    pub failures: Vec<UnitFailure>,
}

impl NodeResult {
    pub fn new(id: NodeId, status: NodeStatus) -> Self {
        Self {
            id,
            status,
            failures: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == NodeStatus::Failed
    }
}
