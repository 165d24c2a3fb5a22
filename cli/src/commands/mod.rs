pub mod cli;
pub mod plan;
pub mod run;

use std::sync::Arc;

use arbor_core::config::AppConfig;
use arbor_core::error::CliError;
use arbor_core::node::GroupNode;
use arbor_core::scheduler::{RunnableOrder, SchedulerBuilder};
use arbor_plugins::factory;

use cli::TreeArgs;

/// `--order` if given, the root id otherwise.
pub fn runnable_order(args: &TreeArgs, root: &dyn GroupNode) -> RunnableOrder {
    let order = args
        .order
        .as_deref()
        .map(RunnableOrder::parse_list)
        .unwrap_or_default();
    if order.is_empty() {
        RunnableOrder::new([root.id().clone()])
    } else {
        order
    }
}

/// Scheduler wired with the configured hooks, flags and ordering policy.
pub fn scheduler_builder(
    root: Arc<dyn GroupNode>,
    args: &TreeArgs,
    cfg: &AppConfig,
) -> Result<SchedulerBuilder, CliError> {
    let order = runnable_order(args, root.as_ref());
    let filter =
        factory::build_filter(&cfg.filter).map_err(|e| CliError::Config(format!("{e:#}")))?;
    Ok(SchedulerBuilder::new(root)
        .order(order)
        .child_order(factory::build_child_order(&cfg.order))
        .filter(filter)
        .policy(cfg.scheduler.policy())
        .flags(cfg.scheduler.flags()))
}
