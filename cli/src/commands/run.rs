use std::fmt::Write as _;
use std::sync::Arc;

use arbor_core::config::{AppConfig, ReportFormat};
use arbor_core::error::{CliError, CollectedErrors, UnitFailure};
use arbor_core::node::{NodeResult, NodeStatus};
use arbor_core::scheduler::{NodeKind, RunOutcome, Scheduler};
use arbor_plugins::factory;
use arbor_plugins::reporter::{new_run_id, JsonlReporter};

use super::cli::RunArgs;
use crate::tree_file::load_tree;

pub async fn run_cmd(args: &RunArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let root = load_tree(&args.tree.tree).map_err(|e| CliError::TreeFile(format!("{e:#}")))?;
    let run_id = new_run_id();
    let errors = Arc::new(CollectedErrors::new());

    let scheduler = super::scheduler_builder(root, &args.tree, cfg)?
        .lifecycle(factory::build_lifecycle(&cfg.report, &run_id))
        .error_sink(errors.clone())
        .build();

    let outcome = scheduler.execute().await?;
    let tasks = task_results(&scheduler)?;
    let groups = failed_groups(&scheduler)?;
    let stray = errors.failures();
    for failure in &stray {
        tracing::warn!(%failure, "failure outside of any task");
    }

    match cfg.report.format {
        ReportFormat::Text => print!("{}", format_summary(&outcome, &tasks, &groups, &stray)),
        ReportFormat::Jsonl => {
            let reporter = JsonlReporter::new(run_id);
            reporter.emit(&reporter.run_end_event(&outcome, &tasks));
        }
    }

    Ok(exit_code(&tasks, &groups, &stray))
}

/// Task results in the order the tasks were reached.
fn task_results(scheduler: &Scheduler) -> Result<Vec<NodeResult>, CliError> {
    let plan = scheduler.process_tree()?;
    Ok(plan
        .task_order()
        .iter()
        .filter_map(|id| scheduler.node(id.as_str()))
        .map(|node| node.result())
        .collect())
}

/// Groups whose setup, teardown or notifications failed.
fn failed_groups(scheduler: &Scheduler) -> Result<Vec<NodeResult>, CliError> {
    let plan = scheduler.process_tree()?;
    Ok(plan
        .records()
        .iter()
        .filter(|(_, record)| record.kind == NodeKind::Group)
        .filter_map(|(id, _)| scheduler.node(id.as_str()))
        .map(|node| node.result())
        .filter(NodeResult::is_failed)
        .collect())
}

fn exit_code(tasks: &[NodeResult], groups: &[NodeResult], stray: &[UnitFailure]) -> i32 {
    let failed = !groups.is_empty() || tasks.iter().any(NodeResult::is_failed);
    if failed || !stray.is_empty() {
        1
    } else {
        0
    }
}

fn status_label(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Passed => "PASS",
        NodeStatus::Failed => "FAIL",
        NodeStatus::Excluded => "SKIP",
        NodeStatus::Pending => "PEND",
        NodeStatus::NotRun => "----",
    }
}

fn format_summary(
    outcome: &RunOutcome,
    tasks: &[NodeResult],
    groups: &[NodeResult],
    stray: &[UnitFailure],
) -> String {
    let mut out = String::new();
    let mut counts = [0usize; 4];

    for task in tasks {
        let _ = writeln!(out, "{} {}", status_label(task.status), task.id);
        for failure in &task.failures {
            let _ = writeln!(out, "     - {failure}");
        }
        match task.status {
            NodeStatus::Passed => counts[0] += 1,
            NodeStatus::Failed => counts[1] += 1,
            NodeStatus::Excluded => counts[2] += 1,
            NodeStatus::Pending | NodeStatus::NotRun => counts[3] += 1,
        }
    }

    for group in groups {
        let _ = writeln!(out, "FAIL {} (group)", group.id);
        for failure in &group.failures {
            let _ = writeln!(out, "     - {failure}");
        }
    }
    for failure in stray {
        let _ = writeln!(out, "ERROR {failure}");
    }

    let _ = writeln!(
        out,
        "\n{} passed, {} failed, {} skipped, {} pending ({} ms)",
        counts[0], counts[1], counts[2], counts[3], outcome.duration_ms
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::error::MultipleCompletion;
    use pretty_assertions::assert_eq;

    fn outcome(status: NodeStatus) -> RunOutcome {
        RunOutcome {
            root: "root".into(),
            result: NodeResult::new("root".into(), status),
            duration_ms: 3,
        }
    }

    fn failed(id: &str, message: &str) -> NodeResult {
        NodeResult {
            id: id.into(),
            status: NodeStatus::Failed,
            failures: vec![UnitFailure::error(message)],
        }
    }

    #[test]
    fn test_format_summary() {
        let tasks = vec![
            NodeResult::new("a".into(), NodeStatus::Passed),
            failed("b", "nope"),
            NodeResult::new("c".into(), NodeStatus::Excluded),
            NodeResult::new("d".into(), NodeStatus::Pending),
        ];

        let groups = vec![failed("g", "setup broke")];

        let text = format_summary(&outcome(NodeStatus::Passed), &tasks, &groups, &[]);
        assert_eq!(
            text,
            "PASS a\nFAIL b\n     - nope\nSKIP c\nPEND d\nFAIL g (group)\n     - setup broke\n\n1 passed, 1 failed, 1 skipped, 1 pending (3 ms)\n"
        );
    }

    #[test]
    fn test_stray_failures_are_listed() {
        let stray = vec![UnitFailure::MultipleCompletion(MultipleCompletion {
            unit: Some("task:a".into()),
        })];
        let text = format_summary(&outcome(NodeStatus::Passed), &[], &[], &stray);
        assert!(text.starts_with("ERROR task:a called its completion callback more than once\n"));
    }

    fn run_args(tree: &std::path::Path, order: Option<&str>) -> RunArgs {
        RunArgs {
            tree: crate::commands::cli::TreeArgs {
                tree: tree.to_path_buf(),
                order: order.map(str::to_string),
                strategy: None,
                seed: None,
                filter: None,
                strict: false,
            },
            format: None,
            verbose: false,
            fail_without_expectations: false,
            detect_late_failures: false,
        }
    }

    fn tree_file(body: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    const TREE: &str = r#"
kind = "group"
id = "root"

[[children]]
kind = "group"
id = "db"

[[children.setup]]
set = { ready = true }

[[children.children]]
kind = "task"
id = "connects"

[[children.children]]
kind = "task"
id = "queries"
outcome = "fail"

[[children]]
kind = "task"
id = "standalone"
"#;

    #[tokio::test]
    async fn test_run_reports_task_failures_with_exit_one() {
        let file = tree_file(TREE);
        let code = run_cmd(&run_args(file.path(), None), &AppConfig::default())
            .await
            .unwrap();
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn test_run_of_passing_subset_exits_zero() {
        let file = tree_file(TREE);
        let code = run_cmd(
            &run_args(file.path(), Some("standalone, connects")),
            &AppConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_invalid_order_maps_to_its_exit_code() {
        let file = tree_file(TREE);
        let err = run_cmd(
            &run_args(file.path(), Some("connects,standalone,queries")),
            &AppConfig::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 13);
    }

    #[tokio::test]
    async fn test_duplicate_ids_exit_like_a_bad_tree_file() {
        let file = tree_file(
            r#"
kind = "group"
id = "root"

[[children]]
kind = "task"
id = "a"

[[children]]
kind = "task"
id = "a"
"#,
        );
        let err = run_cmd(&run_args(file.path(), None), &AppConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CliError::Scheduler(arbor_core::error::SchedulerError::DuplicateNodeId(_))
        ));
        assert_eq!(err.exit_code(), 12);
    }

    #[tokio::test]
    async fn test_missing_tree_file() {
        let err = run_cmd(
            &run_args(std::path::Path::new("/nonexistent/tree.toml"), None),
            &AppConfig::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn test_exit_code() {
        let passed = vec![NodeResult::new("a".into(), NodeStatus::Passed)];
        assert_eq!(exit_code(&passed, &[], &[]), 0);
        assert_eq!(exit_code(&passed, &[failed("g", "x")], &[]), 1);
        assert_eq!(exit_code(&[failed("b", "x")], &[], &[]), 1);
        assert_eq!(exit_code(&passed, &[], &[UnitFailure::error("late")]), 1);
    }
}
