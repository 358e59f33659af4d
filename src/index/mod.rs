//! Spatial pruning index
//!
//! Provides the cluster tree over predicate dimensions and the box tests
//! used to prune it.

pub mod bbox;
pub mod cluster_tree;

pub use bbox::{match_box, match_dimension, BoundingBox};
pub use cluster_tree::{ClusterNode, ClusterTree, NodeId, TreeStats};
