//! qrepair: query repair engine
//!
//! Given a selection query (predicates such as `age >= 40`) and aggregate
//! constraints over its result (such as `0.4 <= female / total <= 0.6`),
//! finds the K refinements of the predicate constants closest to the
//! original query whose results satisfy every constraint.
//!
//! ## Architecture
//! - Index: cluster tree over predicate columns, bounding box per node
//! - Stats: per-cluster aggregates, built on a bounded rayon pool
//! - Candidates: refinement universe, starting ranges, distance model
//! - Constraints: bound expressions evaluated exactly or with intervals
//! - Search: best-first branch and bound (`ff` points, `rp` ranges)
//! - Cache: membership cache, in-memory LRU in front of checksummed files

pub mod cache;
pub mod candidate;
pub mod config;
pub mod datagen;
pub mod expr;
pub mod index;
pub mod report;
pub mod search;
pub mod stats;
pub mod types;

mod api;
mod error;

pub use api::{QueryRepair, RepairJob, RepairOutcome};
pub use config::{CacheConfig, RepairConfig};
pub use error::{RepairError, Result};

pub use candidate::{DistanceMetric, RangeStrategy};
pub use report::RunInfo;
pub use search::{RepairResult, RunMetrics, Strategy};
pub use types::{CompareOp, Dataset, PredicateKind, PredicateSpec, Satisfaction, TupleSet, ValueRange};
