use arbor_core::node::{GroupNode, NodeResult, NodeStatus};
use arbor_core::queue::CompletionToken;
use arbor_core::scheduler::NodeLifecycle;

/// Human readable group events on stdout.
///
/// Only failed groups are reported unless `verbose` is set.
pub struct TextReporter {
    verbose: bool,
}

impl TextReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn format_end(&self, result: &NodeResult) -> Option<String> {
        if !self.verbose && result.status != NodeStatus::Failed {
            return None;
        }
        let mut out = format!("GROUP END {} ({})", result.id, result.status);
        for failure in &result.failures {
            out.push_str(&format!("\n  - {failure}"));
        }
        Some(out)
    }
}

impl NodeLifecycle for TextReporter {
    fn node_started(&self, group: &dyn GroupNode, next: CompletionToken) {
        if self.verbose {
            println!("GROUP START {} ({})", group.id(), group.description());
        }
        next.complete();
    }

    fn node_completed(&self, _group: &dyn GroupNode, result: &NodeResult, next: CompletionToken) {
        if let Some(line) = self.format_end(result) {
            println!("{line}");
        }
        next.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::error::UnitFailure;

    #[test]
    fn test_quiet_mode_reports_failures_only() {
        let reporter = TextReporter::new(false);
        let passed = NodeResult::new("ok".into(), NodeStatus::Passed);
        assert_eq!(reporter.format_end(&passed), None);

        let failed = NodeResult {
            id: "bad".into(),
            status: NodeStatus::Failed,
            failures: vec![UnitFailure::error("teardown broke")],
        };
        assert_eq!(
            reporter.format_end(&failed).as_deref(),
            Some("GROUP END bad (failed)\n  - teardown broke")
        );
    }

    #[test]
    fn test_verbose_mode_reports_everything() {
        let reporter = TextReporter::new(true);
        let passed = NodeResult::new("ok".into(), NodeStatus::Passed);
        assert_eq!(
            reporter.format_end(&passed).as_deref(),
            Some("GROUP END ok (passed)")
        );
    }
}
