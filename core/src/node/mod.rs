//! Node contracts consumed by the scheduler, plus ready-made implementations.

mod basic;
mod types;

pub use basic::{BasicGroup, BasicGroupBuilder, BasicTask, HookFn, TaskScope};
pub use types::{
    ExecutionFlags, GroupNode, Node, NodeId, NodeResult, NodeStatus, TaskInvocation, TaskNode,
};
