//! Two-phase tree scheduling.
//!
//! ```text
//! root group + RunnableOrder
//!   ↓
//! PlanBuilder::build() → segment_children() per group → OrderingPolicy::judge()
//!   ↓
//! ExecutionPlan { records, deprecations }
//!   ↓
//! Scheduler::execute() → QueueRunner::run() per group segment
//!   ↓
//! RunOutcome
//! ```

mod engine;
mod hooks;
mod lifecycle;
mod order;
mod plan;
mod policy;
mod segment;

pub use engine::{RunOutcome, Scheduler, SchedulerBuilder};
pub use hooks::{ChildOrder, IncludeAll, NodeFilter, StructuralOrder};
pub use lifecycle::{NodeLifecycle, SilentLifecycle};
pub use order::RunnableOrder;
pub use plan::{ExecutionPlan, NodeKind, PlanBuilder, PlanRecord};
pub use policy::{Deprecation, OrderingPolicy, SplitVerdict, DEPRECATION_TARGET};
pub use segment::{segment_children, Segment, SegmentRef, Span};
