//! Refinement search
//!
//! Best-first branch and bound over point and range regions, pruned with
//! the statistical tree and scored against the constraint set.

pub mod engine;
pub mod metrics;
pub mod region;
pub mod topk;
pub mod traversal;

pub use engine::{SearchEngine, SearchOutcome, Strategy};
pub use metrics::RunMetrics;
pub use region::{Region, RegionQueue};
pub use topk::{RepairResult, TopK};
pub use traversal::{classify_clusters, Membership};
