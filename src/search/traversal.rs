//! Top-down cluster classification for one region

use crate::index::{match_box, ClusterTree, NodeId};
use crate::types::{CompareOp, Satisfaction, ValueRange};
use serde::{Deserialize, Serialize};

/// Run-scoped classification of the clusters touched by one region.
///
/// Kept outside the shared tree so concurrent or repeated runs never see
/// each other's state. Both lists are ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub full: Vec<NodeId>,
    pub partial: Vec<NodeId>,
}

impl Membership {
    pub fn is_empty(&self) -> bool {
        self.full.is_empty() && self.partial.is_empty()
    }

    /// All ids refer to existing nodes
    pub fn fits(&self, node_count: usize) -> bool {
        self.full.iter().chain(&self.partial).all(|&id| (id as usize) < node_count)
    }
}

/// Walk the tree from its roots with an explicit stack:
/// - `Full` nodes are collected and not descended
/// - `Partial` inner nodes are descended
/// - `Partial` leaves are collected as partial
/// - `None` subtrees are pruned
///
/// Returns the membership and the number of nodes tested.
pub fn classify_clusters(tree: &ClusterTree, ops: &[CompareOp], region: &[ValueRange]) -> (Membership, u64) {
    let mut membership = Membership::default();
    let mut visited = 0u64;
    let mut stack: Vec<NodeId> = tree.roots();
    stack.reverse();

    while let Some(id) = stack.pop() {
        visited += 1;
        let node = tree.node(id);
        match match_box(&node.bbox, ops, region) {
            Satisfaction::Full => membership.full.push(id),
            Satisfaction::Partial if node.is_leaf() => membership.partial.push(id),
            Satisfaction::Partial => stack.extend(node.children.iter().rev()),
            Satisfaction::None => {}
        }
    }

    membership.full.sort_unstable();
    membership.partial.sort_unstable();
    (membership, visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TupleSet;

    fn tree(n: usize) -> ClusterTree {
        let rows = (1..=n).map(|x| vec![x as f64, 0.0]).collect();
        let tuples = TupleSet::new(vec!["x".into()], vec!["y".into()], rows).unwrap();
        ClusterTree::build(&tuples, 2, 2)
    }

    fn selected(tree: &ClusterTree, m: &Membership) -> Vec<u32> {
        let mut out: Vec<u32> = m.full.iter().flat_map(|&id| tree.members(id).to_vec()).collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn test_point_selects_exactly() {
        let t = tree(10);
        let (m, visited) = classify_clusters(&t, &[CompareOp::Ge], &[ValueRange::point(7.0)]);
        assert!(m.partial.is_empty());
        // tuples x = 7..=10 sit at indices 6..=9
        assert_eq!(selected(&t, &m), vec![6, 7, 8, 9]);
        assert!(visited < t.len() as u64);
    }

    #[test]
    fn test_range_collects_partial_leaves() {
        let t = tree(10);
        let (m, _) = classify_clusters(&t, &[CompareOp::Ge], &[ValueRange::new(4.0, 6.0)]);
        // x >= 6 certainly, x in 4..=5 possibly
        assert_eq!(selected(&t, &m), vec![5, 6, 7, 8, 9]);
        let mut partial: Vec<u32> = m.partial.iter().flat_map(|&id| t.members(id).to_vec()).collect();
        partial.sort_unstable();
        assert_eq!(partial, vec![3, 4]);
        assert!(m.fits(t.len()));
    }

    #[test]
    fn test_nothing_matches() {
        let t = tree(5);
        let (m, visited) = classify_clusters(&t, &[CompareOp::Gt], &[ValueRange::point(5.0)]);
        assert!(m.is_empty());
        assert_eq!(visited, 1);
    }
}
