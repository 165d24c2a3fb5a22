use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use serde::Serialize;

use crate::context::SharedContext;
use crate::error::{ErrorSink, MultipleCompletion, SchedulerError, TracingErrorSink, UnitFailure};
use crate::node::{ExecutionFlags, GroupNode, Node, NodeId, NodeResult, TaskInvocation, TaskNode};
use crate::queue::{
    CompletionToken, ExceptionHandler, MultipleDoneHandler, QueueRun, QueueRunner,
    QueueableUnit, SequentialQueueRunner,
};

use super::hooks::{ChildOrder, NodeFilter};
use super::lifecycle::{NodeLifecycle, SilentLifecycle};
use super::order::RunnableOrder;
use super::plan::{ExecutionPlan, PlanBuilder};
use super::policy::OrderingPolicy;
use super::segment::SegmentRef;

/// Summary of one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub root: NodeId,
    pub result: NodeResult,
    pub duration_ms: u64,
}

struct BuiltPlan {
    plan: ExecutionPlan,
    nodes: HashMap<NodeId, Node>,
}

/// Plans and executes one tree.
///
/// The plan is built at most once per scheduler; a failed build is cached
/// too, so every later call reports the same error.
pub struct Scheduler {
    root: Arc<dyn GroupNode>,
    order: RunnableOrder,
    planner: PlanBuilder,
    runner: Arc<dyn QueueRunner>,
    errors: Arc<dyn ErrorSink>,
    lifecycle: Arc<dyn NodeLifecycle>,
    flags: ExecutionFlags,
    context: SharedContext,
    built: OnceLock<Result<Arc<BuiltPlan>, SchedulerError>>,
}

pub struct SchedulerBuilder {
    root: Arc<dyn GroupNode>,
    order: RunnableOrder,
    planner: PlanBuilder,
    runner: Arc<dyn QueueRunner>,
    errors: Arc<dyn ErrorSink>,
    lifecycle: Arc<dyn NodeLifecycle>,
    flags: ExecutionFlags,
    context: SharedContext,
}

impl SchedulerBuilder {
    pub fn new(root: Arc<dyn GroupNode>) -> Self {
        Self {
            root,
            order: RunnableOrder::empty(),
            planner: PlanBuilder::new(),
            runner: Arc::new(SequentialQueueRunner),
            errors: Arc::new(TracingErrorSink),
            lifecycle: Arc::new(SilentLifecycle),
            flags: ExecutionFlags::default(),
            context: SharedContext::new(),
        }
    }

    pub fn order(mut self, order: RunnableOrder) -> Self {
        self.order = order;
        self
    }

    pub fn runner(mut self, runner: Arc<dyn QueueRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn error_sink(mut self, errors: Arc<dyn ErrorSink>) -> Self {
        self.errors = errors;
        self
    }

    pub fn lifecycle(mut self, lifecycle: Arc<dyn NodeLifecycle>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn child_order(mut self, child_order: Arc<dyn ChildOrder>) -> Self {
        self.planner = self.planner.child_order(child_order);
        self
    }

    pub fn filter(mut self, filter: Arc<dyn NodeFilter>) -> Self {
        self.planner = self.planner.filter(filter);
        self
    }

    pub fn policy(mut self, policy: OrderingPolicy) -> Self {
        self.planner = self.planner.policy(policy);
        self
    }

    pub fn flags(mut self, flags: ExecutionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Context the root group forks its own context from.
    pub fn context(mut self, context: SharedContext) -> Self {
        self.context = context;
        self
    }

    pub fn build(self) -> Scheduler {
        Scheduler {
            root: self.root,
            order: self.order,
            planner: self.planner,
            runner: self.runner,
            errors: self.errors,
            lifecycle: self.lifecycle,
            flags: self.flags,
            context: self.context,
            built: OnceLock::new(),
        }
    }
}

impl Scheduler {
    pub fn builder(root: Arc<dyn GroupNode>) -> SchedulerBuilder {
        SchedulerBuilder::new(root)
    }

    pub fn root(&self) -> &Arc<dyn GroupNode> {
        &self.root
    }

    /// Build the plan, or return the cached outcome of an earlier build.
    pub fn process_tree(&self) -> Result<&ExecutionPlan, SchedulerError> {
        self.built().map(|built| &built.plan)
    }

    /// Node of the planned tree by id. `None` if planning failed.
    pub fn node(&self, id: &str) -> Option<Node> {
        self.built().ok()?.nodes.get(id).cloned()
    }

    fn built(&self) -> Result<&Arc<BuiltPlan>, SchedulerError> {
        self.built
            .get_or_init(|| {
                self.planner
                    .build_indexed(&self.root, &self.order)
                    .map(|(plan, nodes)| Arc::new(BuiltPlan { plan, nodes }))
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Run every segment of the root group.
    ///
    /// When the order splits a root without hooks into several segments, all
    /// of them run in order, not only the first.
    ///
    /// Fails before any unit is submitted when the order is invalid.
    /// Failures inside units never fail the run; they end up in node results.
    pub async fn execute(&self) -> Result<RunOutcome, SchedulerError> {
        let built = self.built()?.clone();
        let started = Instant::now();
        let root_id = self.root.id().clone();
        let segments = built.plan.segments(root_id.as_str()).len();
        tracing::info!(root = %root_id, nodes = built.plan.len(), segments, "run started");

        let dispatch = Arc::new(Dispatch {
            plan: built,
            runner: self.runner.clone(),
            errors: self.errors.clone(),
            lifecycle: self.lifecycle.clone(),
            flags: self.flags,
        });

        let units: Vec<QueueableUnit> = (0..segments)
            .flat_map(|index| dispatch.wrap_segment(&self.root, index))
            .collect();
        let context = self.root.shared_context(&self.context);

        let (tx, rx) = tokio::sync::oneshot::channel();
        let run = QueueRun::new(units, context, move || {
            let _ = tx.send(());
        })
        .on_exception(exception_router(&self.root))
        .on_multiple_done(multiple_done_router(&self.root));
        self.runner.run(run);

        rx.await.map_err(|_| SchedulerError::RunAborted)?;

        let result = self.root.result();
        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(root = %root_id, status = %result.status, duration_ms, "run finished");

        Ok(RunOutcome {
            root: root_id,
            result,
            duration_ms,
        })
    }
}

/// Turns plan segments into queueable units.
struct Dispatch {
    plan: Arc<BuiltPlan>,
    runner: Arc<dyn QueueRunner>,
    errors: Arc<dyn ErrorSink>,
    lifecycle: Arc<dyn NodeLifecycle>,
    flags: ExecutionFlags,
}

impl Dispatch {
    /// Setup units, one unit per member, teardown units. Hooks are skipped
    /// when nothing below the group will execute.
    fn wrap_segment(
        self: &Arc<Self>,
        group: &Arc<dyn GroupNode>,
        index: usize,
    ) -> Vec<QueueableUnit> {
        let Some(record) = self.plan.plan.record(group.id().as_str()) else {
            return Vec::new();
        };
        let members: Vec<QueueableUnit> = record
            .segments
            .get(index)
            .map(|segment| {
                segment
                    .members
                    .iter()
                    .filter_map(|member| self.member_unit(member))
                    .collect()
            })
            .unwrap_or_default();

        if !record.will_execute {
            return members;
        }

        let mut units = group.setup_units();
        units.extend(members);
        units.extend(group.teardown_units());
        units
    }

    fn member_unit(self: &Arc<Self>, member: &SegmentRef) -> Option<QueueableUnit> {
        let unit = match self.plan.nodes.get(&member.owner)? {
            Node::Group(group) => self.group_unit(group.clone(), member.index),
            Node::Task(task) => self.task_unit(task.clone()),
        };
        Some(unit)
    }

    fn group_unit(self: &Arc<Self>, group: Arc<dyn GroupNode>, index: usize) -> QueueableUnit {
        let dispatch = self.clone();
        let label = format!("{}[{index}]", group.id());
        QueueableUnit::new(label, move |inherited, done| {
            dispatch.run_group(group, index, inherited, done);
            Ok(())
        })
    }

    fn run_group(
        self: Arc<Self>,
        group: Arc<dyn GroupNode>,
        index: usize,
        inherited: SharedContext,
        done: CompletionToken,
    ) {
        tracing::debug!(group = %group.id(), segment = index, "group started");

        let start = {
            let lifecycle = self.lifecycle.clone();
            let group = group.clone();
            QueueableUnit::new(format!("{}:start", group.id()), move |_, next| {
                lifecycle.node_started(group.as_ref(), next);
                Ok(())
            })
        };
        let mut units = vec![start];
        units.extend(self.wrap_segment(&group, index));

        let on_complete = {
            let lifecycle = self.lifecycle.clone();
            let group = group.clone();
            move || {
                group.cleanup_hooks();
                let result = group.result();
                tracing::trace!(
                    group = %group.id(),
                    segment = index,
                    status = %result.status,
                    "group finished"
                );
                lifecycle.node_completed(group.as_ref(), &result, done);
            }
        };

        let context = group.shared_context(&inherited);
        self.runner.run(
            QueueRun::new(units, context, on_complete)
                .on_exception(exception_router(&group))
                .on_multiple_done(multiple_done_router(&group)),
        );
    }

    fn task_unit(self: &Arc<Self>, task: Arc<dyn TaskNode>) -> QueueableUnit {
        let excluded = self
            .plan
            .plan
            .record(task.id().as_str())
            .map_or(true, |record| record.excluded);
        let runner = self.runner.clone();
        let errors = self.errors.clone();
        let flags = self.flags;

        QueueableUnit::new(task.id().to_string(), move |context, done| {
            task.execute(TaskInvocation {
                runner,
                errors,
                context,
                done,
                excluded,
                flags,
            });
            Ok(())
        })
    }
}

fn exception_router(group: &Arc<dyn GroupNode>) -> ExceptionHandler {
    let group = group.clone();
    Arc::new(move |failure: UnitFailure| group.handle_exception(failure))
}

fn multiple_done_router(group: &Arc<dyn GroupNode>) -> MultipleDoneHandler {
    let group = group.clone();
    Arc::new(move |violation: MultipleCompletion| group.handle_multiple_done(violation))
}
