use arbor_core::config::AppConfig;
use arbor_core::error::CliError;
use arbor_core::scheduler::ExecutionPlan;

use super::cli::TreeArgs;
use crate::tree_file::load_tree;

pub fn plan_cmd(args: &TreeArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let root = load_tree(&args.tree).map_err(|e| CliError::TreeFile(format!("{e:#}")))?;
    let scheduler = super::scheduler_builder(root, args, cfg)?.build();
    let plan = scheduler.process_tree()?;

    println!("{}", render_plan(plan)?);
    Ok(0)
}

fn render_plan(plan: &ExecutionPlan) -> Result<String, CliError> {
    serde_json::to_string_pretty(plan).map_err(|e| CliError::Anyhow(e.into()))
}
