use std::path::PathBuf;

use arbor_core::config::{AppConfig, OrderStrategy, ReportFormat};
use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Structural,
    Reverse,
    Random,
}

impl From<StrategyArg> for OrderStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Structural => Self::Structural,
            StrategyArg::Reverse => Self::Reverse,
            StrategyArg::Random => Self::Random,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Text,
    Jsonl,
}

impl From<FormatArg> for ReportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => Self::Text,
            FormatArg::Jsonl => Self::Jsonl,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "arbor", version, about = "Plan and run hierarchical task trees")]
pub struct Args {
    /// Config file. Defaults to ./arbor.toml when it exists.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TreeArgs {
    /// Tree file, TOML or JSON (by extension).
    pub tree: PathBuf,

    /// Comma separated node ids to run, in this order. Defaults to the root id.
    #[arg(long)]
    pub order: Option<String>,

    /// How children are ordered inside their group.
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Seed for `--strategy random`.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Regex on task descriptions; tasks that do not match are excluded.
    #[arg(long)]
    pub filter: Option<String>,

    /// Reject orders that split reentrant groups too.
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

impl TreeArgs {
    /// Command line values win over the config file.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(strategy) = self.strategy {
            cfg.order.strategy = strategy.into();
        }
        if let Some(seed) = self.seed {
            cfg.order.seed = Some(seed);
        }
        if let Some(filter) = self.filter.as_ref() {
            cfg.filter.pattern = Some(filter.clone());
        }
        if self.strict {
            cfg.scheduler.reject_reentrant_splits = true;
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub tree: TreeArgs,

    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Report groups that passed as well.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    #[arg(long, default_value_t = false)]
    pub fail_without_expectations: bool,

    #[arg(long, default_value_t = false)]
    pub detect_late_failures: bool,
}

impl RunArgs {
    pub fn apply(&self, cfg: &mut AppConfig) {
        self.tree.apply(cfg);
        if let Some(format) = self.format {
            cfg.report.format = format.into();
        }
        if self.verbose {
            cfg.report.verbose = true;
        }
        if self.fail_without_expectations {
            cfg.scheduler.fail_without_expectations = true;
        }
        if self.detect_late_failures {
            cfg.scheduler.detect_late_failures = true;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the execution plan as JSON without running anything.
    Plan(TreeArgs),
    /// Execute the tree and print a per-task summary.
    Run(RunArgs),
}

impl Commands {
    pub fn apply(&self, cfg: &mut AppConfig) {
        match self {
            Self::Plan(args) => args.apply(cfg),
            Self::Run(args) => args.apply(cfg),
        }
    }

    pub fn tree_args(&self) -> &TreeArgs {
        match self {
            Self::Plan(args) => args,
            Self::Run(args) => &args.tree,
        }
    }
}
