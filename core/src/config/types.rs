use serde::{Deserialize, Serialize};

use crate::node::ExecutionFlags;
use crate::scheduler::OrderingPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub order: OrderConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "arbor_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Tasks that record no checks fail.
    #[serde(default)]
    pub fail_without_expectations: bool,

    /// Route failures reported after a task completed to the error sink.
    #[serde(default)]
    pub detect_late_failures: bool,

    /// Treat splits of reentrant groups as invalid orders too.
    #[serde(default)]
    pub reject_reentrant_splits: bool,
}

impl SchedulerConfig {
    pub fn flags(&self) -> ExecutionFlags {
        ExecutionFlags {
            fail_without_expectations: self.fail_without_expectations,
            detect_late_failures: self.detect_late_failures,
        }
    }

    pub fn policy(&self) -> OrderingPolicy {
        if self.reject_reentrant_splits {
            OrderingPolicy::strict()
        } else {
            OrderingPolicy::tolerant()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStrategy {
    #[default]
    Structural,
    Reverse,
    Random,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfig {
    #[serde(default)]
    pub strategy: OrderStrategy,

    /// Seed for the random strategy. Unset means a fresh seed per run.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Regex matched against task descriptions; non-matching tasks are excluded.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Jsonl,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,

    /// Also report groups that passed.
    #[serde(default)]
    pub verbose: bool,
}
