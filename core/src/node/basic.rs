use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::context::SharedContext;
use crate::error::{ErrorSink, MultipleCompletion, UnitFailure};
use crate::queue::{CompletionToken, QueueRun, QueueableUnit};

use super::types::{
    ExecutionFlags, GroupNode, Node, NodeId, NodeResult, NodeStatus, TaskInvocation, TaskNode,
};

/// Setup or teardown callable of a [`BasicGroup`].
pub type HookFn = Arc<dyn Fn(&SharedContext) -> Result<(), UnitFailure> + Send + Sync>;

/// In-memory group with synchronous setup/teardown hooks.
pub struct BasicGroup {
    id: NodeId,
    description: String,
    children: Vec<Node>,
    setup: Mutex<Vec<HookFn>>,
    teardown: Mutex<Vec<HookFn>>,
    reentrant: bool,
    context: OnceLock<SharedContext>,
    failures: Mutex<Vec<UnitFailure>>,
}

pub struct BasicGroupBuilder {
    id: NodeId,
    description: Option<String>,
    children: Vec<Node>,
    setup: Vec<HookFn>,
    teardown: Vec<HookFn>,
    reentrant: Option<bool>,
}

impl BasicGroupBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn setup<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SharedContext) -> Result<(), UnitFailure> + Send + Sync + 'static,
    {
        self.setup.push(Arc::new(hook));
        self
    }

    pub fn teardown<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SharedContext) -> Result<(), UnitFailure> + Send + Sync + 'static,
    {
        self.teardown.push(Arc::new(hook));
        self
    }

    /// Override reentrancy. By default a group is reentrant only when it has
    /// neither setup nor teardown hooks.
    pub fn reentrant(mut self, reentrant: bool) -> Self {
        self.reentrant = Some(reentrant);
        self
    }

    pub fn build(self) -> BasicGroup {
        let reentrant = self
            .reentrant
            .unwrap_or(self.setup.is_empty() && self.teardown.is_empty());
        BasicGroup {
            description: self
                .description
                .unwrap_or_else(|| self.id.as_str().to_string()),
            id: self.id,
            children: self.children,
            setup: Mutex::new(self.setup),
            teardown: Mutex::new(self.teardown),
            reentrant,
            context: OnceLock::new(),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn into_node(self) -> Node {
        Node::group(self.build())
    }
}

impl BasicGroup {
    pub fn builder(id: impl Into<NodeId>) -> BasicGroupBuilder {
        BasicGroupBuilder {
            id: id.into(),
            description: None,
            children: Vec::new(),
            setup: Vec::new(),
            teardown: Vec::new(),
            reentrant: None,
        }
    }

    pub fn failures(&self) -> Vec<UnitFailure> {
        lock(&self.failures).clone()
    }

    fn hook_units(&self, phase: &str, hooks: &Mutex<Vec<HookFn>>) -> Vec<QueueableUnit> {
        lock(hooks)
            .iter()
            .enumerate()
            .map(|(i, hook)| {
                let hook = hook.clone();
                QueueableUnit::immediate(format!("{phase}:{}#{i}", self.id), move |ctx| hook(ctx))
            })
            .collect()
    }
}

impl GroupNode for BasicGroup {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn children(&self) -> &[Node] {
        &self.children
    }

    fn setup_units(&self) -> Vec<QueueableUnit> {
        self.hook_units("setup", &self.setup)
    }

    fn teardown_units(&self) -> Vec<QueueableUnit> {
        self.hook_units("teardown", &self.teardown)
    }

    fn can_be_reentered(&self) -> bool {
        self.reentrant
    }

    fn shared_context(&self, inherited: &SharedContext) -> SharedContext {
        self.context.get_or_init(|| inherited.fork()).clone()
    }

    fn handle_exception(&self, failure: UnitFailure) {
        tracing::debug!(group = %self.id, %failure, "group failure");
        lock(&self.failures).push(failure);
    }

    fn cleanup_hooks(&self) {
        // Reentrant groups may still run another segment.
        if self.reentrant {
            return;
        }
        lock(&self.setup).clear();
        lock(&self.teardown).clear();
    }

    fn result(&self) -> NodeResult {
        let failures = self.failures();
        let status = if failures.is_empty() {
            NodeStatus::Passed
        } else {
            NodeStatus::Failed
        };
        NodeResult {
            id: self.id.clone(),
            status,
            failures,
        }
    }
}

#[derive(Debug)]
struct TaskState {
    status: NodeStatus,
    failures: Vec<UnitFailure>,
    checks: usize,
    finished: bool,
}

impl TaskState {
    fn new(status: NodeStatus) -> Self {
        Self {
            status,
            failures: Vec::new(),
            checks: 0,
            finished: false,
        }
    }
}

type SyncBody = Arc<dyn Fn(&TaskScope) -> Result<(), UnitFailure> + Send + Sync>;
type CallbackBody = Arc<dyn Fn(TaskScope) -> Result<(), UnitFailure> + Send + Sync>;

#[derive(Clone)]
enum Body {
    Sync(SyncBody),
    Callback(CallbackBody),
}

/// Handle given to a [`BasicTask`] body while it runs.
#[derive(Clone)]
pub struct TaskScope {
    id: NodeId,
    context: SharedContext,
    done: CompletionToken,
    state: Arc<Mutex<TaskState>>,
    late_failures: Option<Arc<dyn ErrorSink>>,
}

impl TaskScope {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Record a check; a false `condition` fails the task.
    pub fn check(&self, condition: bool, message: impl Into<String>) -> bool {
        lock(&self.state).checks += 1;
        if !condition {
            self.fail(message);
        }
        condition
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.record(UnitFailure::error(message));
    }

    /// Complete the task. Only needed for callback bodies.
    pub fn done(&self) {
        self.done.complete();
    }

    pub fn token(&self) -> CompletionToken {
        self.done.clone()
    }

    fn record(&self, failure: UnitFailure) {
        let mut state = lock(&self.state);
        if !state.finished {
            state.failures.push(failure);
            return;
        }
        drop(state);

        match &self.late_failures {
            Some(sink) => sink.report(UnitFailure::error(format!(
                "'{}' reported a failure after it completed: {failure}",
                self.id
            ))),
            None => tracing::debug!(task = %self.id, %failure, "dropping late failure"),
        }
    }
}

/// In-memory task backed by a closure.
pub struct BasicTask {
    id: NodeId,
    description: String,
    pending: bool,
    body: Body,
    state: Arc<Mutex<TaskState>>,
}

impl BasicTask {
    /// Task whose body completes as soon as it returns.
    pub fn new<F>(id: impl Into<NodeId>, body: F) -> Self
    where
        F: Fn(&TaskScope) -> Result<(), UnitFailure> + Send + Sync + 'static,
    {
        Self::with_body(id.into(), Body::Sync(Arc::new(body)))
    }

    /// Task whose body must call [`TaskScope::done`] itself, possibly later.
    pub fn with_callback<F>(id: impl Into<NodeId>, body: F) -> Self
    where
        F: Fn(TaskScope) -> Result<(), UnitFailure> + Send + Sync + 'static,
    {
        Self::with_body(id.into(), Body::Callback(Arc::new(body)))
    }

    fn with_body(id: NodeId, body: Body) -> Self {
        Self {
            description: id.as_str().to_string(),
            id,
            pending: false,
            body,
            state: Arc::new(Mutex::new(TaskState::new(NodeStatus::NotRun))),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn pending(mut self) -> Self {
        self.pending = true;
        self
    }

    pub fn into_node(self) -> Node {
        Node::task(self)
    }

    fn body_unit(&self, flags: ExecutionFlags, errors: &Arc<dyn ErrorSink>) -> QueueableUnit {
        let id = self.id.clone();
        let body = self.body.clone();
        let state = self.state.clone();
        let late_failures = flags.detect_late_failures.then(|| errors.clone());

        QueueableUnit::new(format!("task:{}", self.id), move |ctx, token| {
            let scope = TaskScope {
                id,
                context: ctx,
                done: token,
                state,
                late_failures,
            };
            match body {
                Body::Sync(body) => {
                    body(&scope)?;
                    scope.done();
                    Ok(())
                }
                Body::Callback(body) => body(scope),
            }
        })
    }
}

impl TaskNode for BasicTask {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_pending(&self) -> bool {
        self.pending
    }

    fn execute(&self, invocation: TaskInvocation) {
        let TaskInvocation {
            runner,
            errors,
            context,
            done,
            excluded,
            flags,
        } = invocation;

        if excluded || self.pending {
            let status = if excluded {
                NodeStatus::Excluded
            } else {
                NodeStatus::Pending
            };
            *lock(&self.state) = TaskState::new(status);
            done.complete();
            return;
        }

        *lock(&self.state) = TaskState::new(NodeStatus::NotRun);
        let unit = self.body_unit(flags, &errors);

        let on_exception = {
            let state = self.state.clone();
            Arc::new(move |failure: UnitFailure| lock(&state).failures.push(failure))
        };
        let on_multiple_done = {
            let errors = errors.clone();
            Arc::new(move |violation: MultipleCompletion| {
                errors.report(UnitFailure::MultipleCompletion(violation))
            })
        };
        let on_complete = {
            let state = self.state.clone();
            let id = self.id.clone();
            move || {
                {
                    let mut state = lock(&state);
                    state.finished = true;
                    if flags.fail_without_expectations
                        && state.checks == 0
                        && state.failures.is_empty()
                    {
                        state
                            .failures
                            .push(UnitFailure::error(format!("'{id}' has no expectations")));
                    }
                    state.status = if state.failures.is_empty() {
                        NodeStatus::Passed
                    } else {
                        NodeStatus::Failed
                    };
                    tracing::trace!(task = %id, status = %state.status, "task finished");
                }
                done.complete();
            }
        };

        runner.run(
            QueueRun::new(vec![unit], context, on_complete)
                .on_exception(on_exception)
                .on_multiple_done(on_multiple_done),
        );
    }

    fn result(&self) -> NodeResult {
        let state = lock(&self.state);
        NodeResult {
            id: self.id.clone(),
            status: state.status,
            failures: state.failures.clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
