//! Tree definition files.
//!
//! A tree file is TOML or JSON (picked by extension, `.json` for JSON) that
//! describes a root group:
//!
//! ```toml
//! kind = "group"
//! id = "root"
//!
//! [[setup]]
//! set = { db = "ready" }
//!
//! [[children]]
//! kind = "task"
//! id = "connects"
//! outcome = "pass"
//! delay_ms = 10
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use arbor_core::context::SharedContext;
use arbor_core::error::UnitFailure;
use arbor_core::node::{BasicGroup, BasicTask, GroupNode, Node, TaskScope};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeSpec {
    Group(GroupSpec),
    Task(TaskSpec),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupSpec {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reentrant: Option<bool>,
    #[serde(default)]
    pub setup: Vec<HookSpec>,
    #[serde(default)]
    pub teardown: Vec<HookSpec>,
    #[serde(default)]
    pub children: Vec<TreeSpec>,
}

/// Setup or teardown step: writes `set` into the group context, then
/// passes or fails.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HookSpec {
    #[serde(default)]
    pub fail: Option<String>,
    #[serde(default)]
    pub set: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskSpec {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub outcome: TaskOutcome,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pending: bool,
    /// Complete this long after the body ran, from a tokio task.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskOutcome {
    #[default]
    Pass,
    Fail,
    Panic,
    DoubleDone,
    NoChecks,
}

pub fn load_tree(path: &Path) -> anyhow::Result<Arc<dyn GroupNode>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tree file {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        parse_json(&raw)
    } else {
        parse_toml(&raw)
    }
    .with_context(|| format!("invalid tree file {}", path.display()))?;

    parsed.into_root()
}

pub fn parse_toml(raw: &str) -> anyhow::Result<TreeSpec> {
    Ok(toml::from_str(raw)?)
}

pub fn parse_json(raw: &str) -> anyhow::Result<TreeSpec> {
    Ok(serde_json::from_str(raw)?)
}

impl TreeSpec {
    pub fn id(&self) -> &str {
        match self {
            Self::Group(g) => &g.id,
            Self::Task(t) => &t.id,
        }
    }

    pub fn into_root(self) -> anyhow::Result<Arc<dyn GroupNode>> {
        match self.into_node() {
            Node::Group(group) => Ok(group),
            task => bail!(
                "the root of a tree must be a group, found task '{}'",
                task.id()
            ),
        }
    }

    pub fn into_node(self) -> Node {
        match self {
            Self::Group(group) => group.into_node(),
            Self::Task(task) => task.into_node(),
        }
    }
}

impl GroupSpec {
    fn into_node(self) -> Node {
        let mut builder = BasicGroup::builder(self.id);
        if let Some(description) = self.description {
            builder = builder.description(description);
        }
        if let Some(reentrant) = self.reentrant {
            builder = builder.reentrant(reentrant);
        }
        for hook in self.setup {
            builder = builder.setup(move |ctx| hook.run(ctx));
        }
        for hook in self.teardown {
            builder = builder.teardown(move |ctx| hook.run(ctx));
        }
        builder
            .children(self.children.into_iter().map(TreeSpec::into_node))
            .into_node()
    }
}

impl HookSpec {
    fn run(&self, ctx: &SharedContext) -> Result<(), UnitFailure> {
        for (key, value) in &self.set {
            ctx.insert(key.clone(), value.clone());
        }
        match &self.fail {
            Some(message) => Err(UnitFailure::error(message.clone())),
            None => Ok(()),
        }
    }
}

impl TaskSpec {
    fn into_node(self) -> Node {
        let outcome = self.outcome;
        let message = self
            .message
            .unwrap_or_else(|| format!("'{}' failed", self.id));
        let delay = self.delay_ms.map(Duration::from_millis);

        let mut task = BasicTask::with_callback(self.id, move |scope| {
            apply_outcome(outcome, &message, &scope);
            let times = if outcome == TaskOutcome::DoubleDone { 2 } else { 1 };
            match delay {
                Some(delay) => {
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        for _ in 0..times {
                            scope.done();
                        }
                    });
                }
                None => {
                    for _ in 0..times {
                        scope.done();
                    }
                }
            }
            Ok(())
        });
        if let Some(description) = self.description {
            task = task.with_description(description);
        }
        if self.pending {
            task = task.pending();
        }
        task.into_node()
    }
}

fn apply_outcome(outcome: TaskOutcome, message: &str, scope: &TaskScope) {
    match outcome {
        TaskOutcome::Pass | TaskOutcome::DoubleDone => {
            scope.check(true, "passes");
        }
        TaskOutcome::Fail => {
            scope.check(false, message);
        }
        TaskOutcome::Panic => panic!("{message}"),
        TaskOutcome::NoChecks => {}
    }
}
