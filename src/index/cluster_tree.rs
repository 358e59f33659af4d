//! Hierarchical cluster tree over predicate dimensions
//!
//! Arena of nodes addressed by `NodeId`. Members of every node are a
//! contiguous span of one shared tuple permutation, so a subtree's tuples
//! are available without copying.
//!
//! Build rule per node:
//! - `n <= bucket_size`: bucket node whose children are one singleton node per tuple
//! - otherwise: sort by dimension `level % P`, cut into `branch_factor`
//!   contiguous chunks of `max(1, n / F)` tuples (last chunk takes the
//!   remainder, empty chunks are skipped) and recurse with `level + 1`
//!
//! Ids are assigned in preorder, so a parent id is always lower than its
//! children's ids.

use super::bbox::BoundingBox;
use crate::types::TupleSet;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

pub type NodeId = u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterNode {
    pub id: NodeId,
    pub level: u32,
    pub parent: Option<NodeId>,
    /// Level of the parent (`-1` for the root)
    pub parent_level: i64,
    pub bbox: BoundingBox,
    pub member_count: usize,
    pub children: Vec<NodeId>,
    span: (usize, usize),
}

impl ClusterNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Range into the tree's tuple order holding this node's members
    pub fn span(&self) -> Range<usize> {
        self.span.0..self.span.1
    }
}

/// Build statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterTree {
    nodes: Vec<ClusterNode>,
    /// Tuple indices permuted so every node owns a contiguous span
    order: Vec<u32>,
    dims: usize,
    bucket_size: usize,
    branch_factor: usize,
}

impl ClusterTree {
    /// Build the tree over the predicate dimensions of `tuples`.
    ///
    /// An empty tuple set yields a single empty root.
    pub fn build(tuples: &TupleSet, bucket_size: usize, branch_factor: usize) -> Self {
        let bucket_size = bucket_size.max(1);
        let branch_factor = branch_factor.max(2);
        let mut tree = Self {
            nodes: Vec::new(),
            order: (0..tuples.len() as u32).collect(),
            dims: tuples.predicate_dims(),
            bucket_size,
            branch_factor,
        };

        tree.make_node(tuples, 0, tuples.len(), 0, None);

        let stats = tree.stats();
        debug!(
            "[ClusterTree] Built {} nodes ({} leaves, depth {}) over {} tuples (B={}, F={})",
            stats.node_count,
            stats.leaf_count,
            stats.depth,
            tuples.len(),
            bucket_size,
            branch_factor
        );
        tree
    }

    fn make_node(
        &mut self,
        tuples: &TupleSet,
        start: usize,
        end: usize,
        level: u32,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = self.nodes.len() as NodeId;
        let mut bbox = BoundingBox::empty(self.dims);
        for &t in &self.order[start..end] {
            bbox.expand(tuples.predicate_values(t as usize));
        }
        self.nodes.push(ClusterNode {
            id,
            level,
            parent,
            parent_level: level as i64 - 1,
            bbox,
            member_count: end - start,
            children: Vec::new(),
            span: (start, end),
        });

        let n = end - start;
        let mut children = Vec::new();

        if n <= self.bucket_size {
            // Bucket: one trivial cluster per tuple
            for pos in start..end {
                let child = self.nodes.len() as NodeId;
                let point = tuples.predicate_values(self.order[pos] as usize);
                self.nodes.push(ClusterNode {
                    id: child,
                    level: level + 1,
                    parent: Some(id),
                    parent_level: level as i64,
                    bbox: BoundingBox::from_point(point),
                    member_count: 1,
                    children: Vec::new(),
                    span: (pos, pos + 1),
                });
                children.push(child);
            }
        } else {
            if self.dims > 0 {
                let dim = level as usize % self.dims;
                self.order[start..end].sort_by(|&a, &b| {
                    let va = tuples.predicate_values(a as usize)[dim];
                    let vb = tuples.predicate_values(b as usize)[dim];
                    va.total_cmp(&vb).then(a.cmp(&b))
                });
            }

            let chunk = (n / self.branch_factor).max(1);
            for j in 0..self.branch_factor {
                let lo = (start + j * chunk).min(end);
                let hi = if j + 1 < self.branch_factor { (lo + chunk).min(end) } else { end };
                if lo < hi {
                    children.push(self.make_node(tuples, lo, hi, level + 1, Some(id)));
                }
            }
        }

        self.nodes[id as usize].children = children;
        id
    }

    /// Top-level partitions the search starts from
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &ClusterNode {
        &self.nodes[id as usize]
    }

    pub fn get(&self, id: NodeId) -> Option<&ClusterNode> {
        self.nodes.get(id as usize)
    }

    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Tuple indices belonging to a node's subtree
    pub fn members(&self, id: NodeId) -> &[u32] {
        &self.order[self.node(id).span()]
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            node_count: self.nodes.len(),
            leaf_count: self.nodes.iter().filter(|n| n.is_leaf()).count(),
            depth: self.nodes.iter().map(|n| n.level).max().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> TupleSet {
        let rows = (0..n).map(|i| vec![((i * 7) % n) as f64, i as f64]).collect();
        TupleSet::new(vec!["x".into()], vec!["y".into()], rows).unwrap()
    }

    #[test]
    fn test_small_input_is_single_bucket() {
        let tree = ClusterTree::build(&line(3), 5, 2);
        assert_eq!(tree.roots(), vec![0]);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.node(0).children, vec![1, 2, 3]);
        assert!(tree.nodes()[1..].iter().all(|n| n.member_count == 1 && n.is_leaf()));
    }

    #[test]
    fn test_empty_input() {
        let empty = TupleSet::new(vec!["x".into()], vec![], vec![]).unwrap();
        let tree = ClusterTree::build(&empty, 4, 2);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.node(0).member_count, 0);
        assert!(tree.node(0).bbox.is_empty());
    }

    #[test]
    fn test_preorder_ids_and_spans() {
        let tree = ClusterTree::build(&line(50), 4, 3);
        for node in tree.nodes() {
            for &c in &node.children {
                let child = tree.node(c);
                assert!(c > node.id);
                assert_eq!(child.parent, Some(node.id));
                assert_eq!(child.level, node.level + 1);
                assert!(node.bbox.contains_box(&child.bbox));
            }
            if !node.is_leaf() {
                let total: usize = node.children.iter().map(|&c| tree.node(c).member_count).sum();
                assert_eq!(total, node.member_count);
            }
        }
        assert_eq!(tree.node(0).member_count, 50);
    }

    #[test]
    fn test_split_remainder_goes_to_last_chunk() {
        // 11 tuples, F = 3: chunks of 3, 3, 5
        let tree = ClusterTree::build(&line(11), 4, 3);
        let sizes: Vec<usize> = tree.node(0).children.iter().map(|&c| tree.node(c).member_count).collect();
        assert_eq!(sizes, vec![3, 3, 5]);

        let first = tree.node(tree.node(0).children[0]);
        assert_eq!(first.bbox.min[0], 0.0);
        assert_eq!(first.bbox.max[0], 2.0);
    }
}
