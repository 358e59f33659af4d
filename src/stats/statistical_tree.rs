//! Statistical tree: the cluster tree augmented with per-node aggregates

use super::aggregate::AggregateExpr;
use crate::error::{RepairError, Result};
use crate::index::{BoundingBox, ClusterTree, NodeId};
use crate::types::TupleSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// One cluster with its box, member count and aggregate scalars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalRecord {
    pub id: NodeId,
    pub level: u32,
    pub parent: Option<NodeId>,
    pub parent_level: i64,
    pub bbox: BoundingBox,
    pub count: usize,
    /// Indexed like `StatisticalTree::aggregate_names`
    pub aggregates: Vec<f64>,
}

/// Read-only view the search engine consumes
#[derive(Debug, Clone)]
pub struct StatisticalTree {
    tree: Arc<ClusterTree>,
    records: Vec<StatisticalRecord>,
    names: Vec<String>,
}

impl StatisticalTree {
    /// Evaluate every aggregate on every node in parallel on a pool of
    /// `workers` threads. Each node reads only its own members.
    pub fn build(
        tree: Arc<ClusterTree>,
        tuples: &TupleSet,
        aggregates: &[AggregateExpr],
        workers: usize,
    ) -> Result<Self> {
        let start = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .map_err(|e| RepairError::Configuration(format!("aggregator pool: {}", e)))?;

        let records: Vec<StatisticalRecord> = pool.install(|| {
            tree.nodes()
                .par_iter()
                .map(|node| {
                    let members = tree.members(node.id);
                    StatisticalRecord {
                        id: node.id,
                        level: node.level,
                        parent: node.parent,
                        parent_level: node.parent_level,
                        bbox: node.bbox.clone(),
                        count: members.len(),
                        aggregates: aggregates.iter().map(|agg| agg.evaluate(tuples, members)).collect(),
                    }
                })
                .collect()
        });

        debug!(
            "[Stats] Aggregated {} clusters x {} expressions in {:?} ({} workers)",
            records.len(),
            aggregates.len(),
            start.elapsed(),
            workers.max(1)
        );

        Ok(Self {
            tree,
            records,
            names: aggregates.iter().map(|a| a.name.clone()).collect(),
        })
    }

    pub fn tree(&self) -> &ClusterTree {
        &self.tree
    }

    pub fn shared_tree(&self) -> Arc<ClusterTree> {
        Arc::clone(&self.tree)
    }

    #[inline]
    pub fn record(&self, id: NodeId) -> &StatisticalRecord {
        &self.records[id as usize]
    }

    pub fn records(&self) -> &[StatisticalRecord] {
        &self.records
    }

    pub fn aggregate_names(&self) -> &[String] {
        &self.names
    }

    pub fn aggregate_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Aggregate value of one node, keyed by name
    pub fn aggregates_of(&self, id: NodeId) -> BTreeMap<&str, f64> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.record(id).aggregates.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(n: usize, workers: usize) -> StatisticalTree {
        let rows = (1..=n).map(|x| vec![x as f64, x as f64]).collect();
        let tuples = TupleSet::new(vec!["x".into()], vec!["x".into()], rows).unwrap();
        let cols = tuples.constraint_columns().to_vec();
        let aggs = vec![
            AggregateExpr::parse("agg1", r#"count("x > 3")"#, &cols).unwrap(),
            AggregateExpr::parse("agg2", r#"count("*")"#, &cols).unwrap(),
            AggregateExpr::parse("agg3", r#"sum("x")"#, &cols).unwrap(),
        ];
        let tree = Arc::new(ClusterTree::build(&tuples, 2, 2));
        StatisticalTree::build(tree, &tuples, &aggs, workers).unwrap()
    }

    #[test]
    fn test_root_aggregates_cover_everything() {
        let stats = setup(6, 2);
        let root = stats.record(0);
        assert_eq!(root.count, 6);
        assert_eq!(root.aggregates, vec![3.0, 6.0, 21.0]);
        assert_eq!(stats.aggregates_of(0)["agg2"], 6.0);
        assert_eq!(stats.aggregate_index("agg3"), Some(2));
    }

    #[test]
    fn test_children_partition_parent() {
        let stats = setup(20, 3);
        for record in stats.records() {
            let node = stats.tree().node(record.id);
            if node.is_leaf() {
                continue;
            }
            for a in 0..3 {
                let total: f64 = node.children.iter().map(|&c| stats.record(c).aggregates[a]).sum();
                assert_eq!(total, record.aggregates[a]);
            }
        }
    }

    #[test]
    fn test_worker_count_does_not_change_result() {
        assert_eq!(setup(30, 1).records(), setup(30, 4).records());
    }
}
