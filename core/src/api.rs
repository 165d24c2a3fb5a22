//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `arbor_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from_path, AppConfig, FilterConfig, LoggingConfig, OrderConfig,
    OrderStrategy, ReportConfig, ReportFormat, SchedulerConfig,
};
pub use crate::context::SharedContext;
pub use crate::error::{
    CliError, CollectedErrors, ErrorCode, ErrorSink, MultipleCompletion, SchedulerError,
    TracingErrorSink, UnitFailure,
};
pub use crate::node::{
    BasicGroup, BasicGroupBuilder, BasicTask, ExecutionFlags, GroupNode, Node, NodeId,
    NodeResult, NodeStatus, TaskInvocation, TaskNode, TaskScope,
};
pub use crate::queue::{
    CompletionToken, QueueRun, QueueRunner, QueueableUnit, SequentialQueueRunner,
};
pub use crate::scheduler::{
    ChildOrder, Deprecation, ExecutionPlan, IncludeAll, NodeFilter, NodeKind, NodeLifecycle,
    OrderingPolicy, PlanBuilder, PlanRecord, RunOutcome, RunnableOrder, Scheduler,
    SchedulerBuilder, Segment, SegmentRef, SilentLifecycle, Span, SplitVerdict, StructuralOrder,
    DEPRECATION_TARGET,
};
