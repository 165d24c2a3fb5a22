#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use arbor_core::node::{BasicGroup, BasicGroupBuilder, BasicTask, GroupNode, Node, NodeResult};
use arbor_core::queue::CompletionToken;
use arbor_core::scheduler::NodeLifecycle;

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::default()
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Task that records its id when it runs.
pub fn task(log: &Log, id: &str) -> Node {
    let log = log.clone();
    let name = id.to_string();
    BasicTask::new(id, move |scope| {
        log.lock().unwrap().push(name.clone());
        scope.check(true, "ran");
        Ok(())
    })
    .into_node()
}

/// Group whose setup and teardown record `setup:<id>` / `teardown:<id>`.
pub fn hooked_group(log: &Log, id: &str) -> BasicGroupBuilder {
    let setup_log = log.clone();
    let teardown_log = log.clone();
    let setup = format!("setup:{id}");
    let teardown = format!("teardown:{id}");
    BasicGroup::builder(id)
        .setup(move |_| {
            setup_log.lock().unwrap().push(setup.clone());
            Ok(())
        })
        .teardown(move |_| {
            teardown_log.lock().unwrap().push(teardown.clone());
            Ok(())
        })
}

/// Records `start:<id>` and `end:<id>:<status>` notifications.
pub struct RecordingLifecycle {
    pub log: Log,
}

impl NodeLifecycle for RecordingLifecycle {
    fn node_started(&self, group: &dyn GroupNode, next: CompletionToken) {
        self.log.lock().unwrap().push(format!("start:{}", group.id()));
        next.complete();
    }

    fn node_completed(&self, group: &dyn GroupNode, result: &NodeResult, next: CompletionToken) {
        self.log
            .lock()
            .unwrap()
            .push(format!("end:{}:{}", group.id(), result.status));
        next.complete();
    }
}
