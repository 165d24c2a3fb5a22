use crate::node::{GroupNode, NodeResult};
use crate::queue::CompletionToken;

/// Observer notified around every group unit.
///
/// Each notification receives the token that lets the run continue; it must
/// be completed exactly once, possibly later.
pub trait NodeLifecycle: Send + Sync {
    fn node_started(&self, group: &dyn GroupNode, next: CompletionToken) {
        let _ = group;
        next.complete();
    }

    fn node_completed(&self, group: &dyn GroupNode, result: &NodeResult, next: CompletionToken) {
        let _ = (group, result);
        next.complete();
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentLifecycle;

impl NodeLifecycle for SilentLifecycle {}
