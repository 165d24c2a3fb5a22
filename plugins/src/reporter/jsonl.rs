use arbor_core::node::{GroupNode, NodeResult};
use arbor_core::queue::CompletionToken;
use arbor_core::scheduler::{NodeLifecycle, RunOutcome};
use chrono::Local;
use serde_json::{json, Value};
use uuid::Uuid;

/// One JSON object per line on stdout for every group start and end.
pub struct JsonlReporter {
    run_id: String,
}

impl JsonlReporter {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    /// Reporter with a fresh random run id.
    pub fn with_new_run_id() -> Self {
        Self::new(new_run_id())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn start_event(&self, group: &dyn GroupNode) -> Value {
        json!({
            "v": 1,
            "event_type": "group.start",
            "ts": Local::now().to_rfc3339(),
            "run_id": self.run_id,
            "group_id": group.id(),
            "metadata": {
                "description": group.description(),
            }
        })
    }

    fn end_event(&self, result: &NodeResult) -> Value {
        json!({
            "v": 1,
            "event_type": "group.end",
            "ts": Local::now().to_rfc3339(),
            "run_id": self.run_id,
            "group_id": result.id,
            "status": result.status,
            "failures": result.failures,
        })
    }

    /// Final line of a run: the root result plus every task result in
    /// execution order.
    pub fn run_end_event(&self, outcome: &RunOutcome, tasks: &[NodeResult]) -> Value {
        let failed = tasks.iter().filter(|t| t.is_failed()).count();
        json!({
            "v": 1,
            "event_type": "run.end",
            "ts": Local::now().to_rfc3339(),
            "run_id": self.run_id,
            "root_id": outcome.root,
            "status": outcome.result.status,
            "duration_ms": outcome.duration_ms,
            "failed_tasks": failed,
            "tasks": tasks,
        })
    }

    pub fn emit(&self, value: &Value) {
        println!(
            "{}",
            serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
        );
    }
}

pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

impl NodeLifecycle for JsonlReporter {
    fn node_started(&self, group: &dyn GroupNode, next: CompletionToken) {
        self.emit(&self.start_event(group));
        next.complete();
    }

    fn node_completed(&self, _group: &dyn GroupNode, result: &NodeResult, next: CompletionToken) {
        self.emit(&self.end_event(result));
        next.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::error::UnitFailure;
    use arbor_core::node::{BasicGroup, NodeStatus};

    #[test]
    fn test_start_event() {
        let reporter = JsonlReporter::new("run-1");
        let group = BasicGroup::builder("db").description("database").build();

        let value = reporter.start_event(&group);
        assert_eq!(value["v"], 1);
        assert_eq!(value["event_type"], "group.start");
        assert_eq!(value["run_id"], "run-1");
        assert_eq!(value["group_id"], "db");
        assert_eq!(value["metadata"]["description"], "database");
    }

    #[test]
    fn test_end_event_carries_failures() {
        let reporter = JsonlReporter::new("run-1");
        let result = NodeResult {
            id: "db".into(),
            status: NodeStatus::Failed,
            failures: vec![UnitFailure::error("setup broke")],
        };

        let value = reporter.end_event(&result);
        assert_eq!(value["event_type"], "group.end");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["failures"][0]["kind"], "error");
        assert_eq!(value["failures"][0]["message"], "setup broke");
    }

    #[test]
    fn test_run_end_event_counts_failed_tasks() {
        let reporter = JsonlReporter::new("run-2");
        let outcome = RunOutcome {
            root: "root".into(),
            result: NodeResult::new("root".into(), NodeStatus::Passed),
            duration_ms: 12,
        };
        let tasks = vec![
            NodeResult::new("a".into(), NodeStatus::Passed),
            NodeResult::new("b".into(), NodeStatus::Failed),
            NodeResult::new("c".into(), NodeStatus::Excluded),
        ];

        let value = reporter.run_end_event(&outcome, &tasks);
        assert_eq!(value["event_type"], "run.end");
        assert_eq!(value["run_id"], "run-2");
        assert_eq!(value["root_id"], "root");
        assert_eq!(value["duration_ms"], 12);
        assert_eq!(value["failed_tasks"], 1);
        assert_eq!(value["tasks"][2]["status"], "excluded");
    }

    #[test]
    fn test_notifications_continue_the_run() {
        let reporter = JsonlReporter::with_new_run_id();
        assert_eq!(reporter.run_id().len(), 36);

        let group = BasicGroup::builder("g").build();
        let next = CompletionToken::detached(None);
        reporter.node_started(&group, next.clone());
        assert!(next.is_completed());
    }
}
