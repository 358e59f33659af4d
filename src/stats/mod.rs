//! Statistical aggregation over cluster nodes

pub mod aggregate;
pub mod statistical_tree;

pub use aggregate::{AggFunc, AggregateExpr, Comparison, Condition, Connective};
pub use statistical_tree::{StatisticalRecord, StatisticalTree};
