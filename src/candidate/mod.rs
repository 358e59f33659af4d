//! Candidate space generation
//!
//! - Full filtering walks the ranked [`RefinementUniverse`] point by point
//! - Range pruning starts from the [`RangeSpace`] and bisects on demand

pub mod distance;
pub mod ranges;
pub mod universe;

pub use distance::{DistanceMetric, DistanceModel};
pub use ranges::{bisect, DimRange, RangeSpace, RangeStrategy};
pub use universe::{Refinement, RefinementUniverse};
