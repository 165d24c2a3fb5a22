use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// Caller-supplied desired relative order over a subset of node ids.
///
/// Ids that are not listed keep their structural position. Duplicates are
/// allowed; only the first occurrence counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunnableOrder {
    ids: Vec<NodeId>,
}

impl RunnableOrder {
    pub fn new<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a comma separated list, skipping blank entries.
    pub fn parse_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty()),
        )
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate.as_str() == id)
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<T: Into<NodeId>> FromIterator<T> for RunnableOrder {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_uses_first_occurrence() {
        let order = RunnableOrder::new(["b", "a", "b"]);
        assert_eq!(order.position("b"), Some(0));
        assert_eq!(order.position("a"), Some(1));
        assert_eq!(order.position("c"), None);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_parse_list() {
        let order = RunnableOrder::parse_list(" a, b ,,c ");
        assert_eq!(order, RunnableOrder::new(["a", "b", "c"]));
        assert!(RunnableOrder::parse_list("").is_empty());
    }
}
