use serde::Serialize;

use crate::node::{GroupNode, NodeId};

pub const DEPRECATION_TARGET: &str = "arbor::deprecation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitVerdict {
    Single,
    /// Accepted, but the group's hooks run once per segment.
    Tolerated,
    Fatal,
}

/// Warning recorded for a tolerated split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deprecation {
    pub group: NodeId,
    pub segments: usize,
    pub message: String,
}

/// Decides whether a group may be split into several segments.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OrderingPolicy {
    reject_reentrant_splits: bool,
}

impl OrderingPolicy {
    /// Reentrant groups may be split, with a warning.
    pub fn tolerant() -> Self {
        Self::default()
    }

    /// No group may be split.
    pub fn strict() -> Self {
        Self {
            reject_reentrant_splits: true,
        }
    }

    pub fn rejects_reentrant_splits(&self) -> bool {
        self.reject_reentrant_splits
    }

    pub fn judge(&self, group: &dyn GroupNode, segments: usize) -> SplitVerdict {
        if segments <= 1 {
            return SplitVerdict::Single;
        }
        if !group.can_be_reentered() || self.reject_reentrant_splits {
            return SplitVerdict::Fatal;
        }
        tracing::warn!(
            target: DEPRECATION_TARGET,
            group = %group.id(),
            segments,
            "{}",
            split_warning(group.id())
        );
        SplitVerdict::Tolerated
    }
}

pub(crate) fn split_warning(group: &NodeId) -> String {
    format!(
        "The requested order splits up group '{group}', running unrelated tasks in the middle of it. \
         This will become an error in a future release."
    )
}
