use arbor_core::node::{GroupNode, Node};
use arbor_core::scheduler::ChildOrder;

/// Children in reverse declaration order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReverseOrder;

impl ChildOrder for ReverseOrder {
    fn order(&self, group: &dyn GroupNode) -> Vec<Node> {
        group.children().iter().rev().cloned().collect()
    }
}

/// Pseudo-random child order that is stable for a given seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededShuffle {
    seed: u64,
}

impl SeededShuffle {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn sort_key(&self, node: &Node) -> u32 {
        jenkins_hash(&format!("{}{}", self.seed, node.id()))
    }
}

impl ChildOrder for SeededShuffle {
    fn order(&self, group: &dyn GroupNode) -> Vec<Node> {
        let mut keyed: Vec<(u32, usize, Node)> = group
            .children()
            .iter()
            .enumerate()
            .map(|(i, child)| (self.sort_key(child), i, child.clone()))
            .collect();
        keyed.sort_by_key(|(hash, i, _)| (*hash, *i));
        keyed.into_iter().map(|(_, _, child)| child).collect()
    }
}

/// Jenkins one-at-a-time hash.
fn jenkins_hash(key: &str) -> u32 {
    let mut hash: u32 = 0;
    for byte in key.bytes() {
        hash = hash.wrapping_add(u32::from(byte));
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::node::{BasicGroup, BasicTask};
    use pretty_assertions::assert_eq;

    fn group(ids: &[&str]) -> BasicGroup {
        BasicGroup::builder("g")
            .children(ids.iter().map(|id| BasicTask::new(*id, |_| Ok(())).into_node()))
            .build()
    }

    fn ids(nodes: &[Node]) -> Vec<String> {
        nodes.iter().map(|n| n.id().to_string()).collect()
    }

    #[test]
    fn test_reverse_order() {
        let g = group(&["a", "b", "c"]);
        assert_eq!(ids(&ReverseOrder.order(&g)), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_shuffle_is_stable_per_seed() {
        let g = group(&["a", "b", "c", "d", "e", "f"]);
        let first = ids(&SeededShuffle::new(42).order(&g));
        let second = ids(&SeededShuffle::new(42).order(&g));
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_shuffle_depends_on_seed() {
        let g = group(&["a", "b", "c", "d", "e", "f"]);
        let orders: std::collections::HashSet<Vec<String>> = (0..20)
            .map(|seed| ids(&SeededShuffle::new(seed).order(&g)))
            .collect();
        assert!(orders.len() > 1);
    }

    #[test]
    fn test_jenkins_hash_known_values() {
        assert_eq!(jenkins_hash(""), 0);
        assert_eq!(jenkins_hash("a"), 0xca2e_9442);
    }
}
