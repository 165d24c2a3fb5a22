use arbor_core::node::TaskNode;
use arbor_core::scheduler::NodeFilter;
use regex::Regex;

/// Excludes tasks whose description does not match a pattern.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    pattern: Regex,
}

impl PatternFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl NodeFilter for PatternFilter {
    fn excludes(&self, task: &dyn TaskNode) -> bool {
        !self.pattern.is_match(task.description())
    }
}
