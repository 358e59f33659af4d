//! N-dimensional bounding boxes over predicate dimensions and the box/region
//! match tests that drive pruning.

use crate::types::{CompareOp, Satisfaction, ValueRange};
use serde::{Deserialize, Serialize};

/// Axis-aligned box `[min[d], max[d]]` over the `P` predicate dimensions.
///
/// An empty box (no members) has `min = +inf` and `max = -inf` on every
/// dimension and never matches any region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl BoundingBox {
    pub fn empty(dims: usize) -> Self {
        Self {
            min: vec![f64::INFINITY; dims],
            max: vec![f64::NEG_INFINITY; dims],
        }
    }

    pub fn from_point(point: &[f64]) -> Self {
        Self {
            min: point.to_vec(),
            max: point.to_vec(),
        }
    }

    pub fn dims(&self) -> usize {
        self.min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.min.iter().zip(&self.max).any(|(lo, hi)| lo > hi)
    }

    pub fn expand(&mut self, point: &[f64]) {
        for (d, &v) in point.iter().enumerate().take(self.min.len()) {
            if v < self.min[d] {
                self.min[d] = v;
            }
            if v > self.max[d] {
                self.max[d] = v;
            }
        }
    }

    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.iter().zip(&other.min).map(|(a, b)| a.min(*b)).collect(),
            max: self.max.iter().zip(&other.max).map(|(a, b)| a.max(*b)).collect(),
        }
    }

    /// Does `self` contain `other`? Empty boxes are contained in anything.
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.is_empty()
            || self
                .min
                .iter()
                .zip(&self.max)
                .zip(other.min.iter().zip(&other.max))
                .all(|((smin, smax), (omin, omax))| smin <= omin && omax <= smax)
    }

    pub fn contains_point(&self, point: &[f64]) -> bool {
        point
            .iter()
            .zip(self.min.iter().zip(&self.max))
            .all(|(v, (lo, hi))| lo <= v && v <= hi)
    }
}

/// Classify one dimension: do the box values `[min, max]` satisfy
/// `value <op> c` for every (`Full`), some (`Partial`) or no (`None`)
/// combination of a box value and a constant `c` in `range`?
///
/// Point regions use the same tests with `range.lo == range.hi`.
pub fn match_dimension(op: CompareOp, min: f64, max: f64, range: ValueRange) -> Satisfaction {
    let ValueRange { lo, hi } = range;
    let (full, partial) = match op {
        CompareOp::Ge => (min >= hi, max >= lo),
        CompareOp::Gt => (min > hi, max > lo),
        CompareOp::Le => (max <= lo, min <= hi),
        CompareOp::Lt => (max < lo, min < hi),
        CompareOp::Eq => (min == max && lo == hi && min == lo, min <= hi && lo <= max),
        CompareOp::Ne => (
            min > hi || lo > max,
            !(min == max && lo == hi && min == lo),
        ),
    };

    if full {
        Satisfaction::Full
    } else if partial {
        Satisfaction::Partial
    } else {
        Satisfaction::None
    }
}

/// Classify a whole box against a region: `None` as soon as one dimension
/// fails, `Full` only when every dimension is `Full`.
pub fn match_box(bbox: &BoundingBox, ops: &[CompareOp], region: &[ValueRange]) -> Satisfaction {
    if bbox.is_empty() {
        return Satisfaction::None;
    }

    let mut result = Satisfaction::Full;
    for (d, (op, range)) in ops.iter().zip(region).enumerate() {
        result = result.and(match_dimension(*op, bbox.min[d], bbox.max[d], *range));
        if result == Satisfaction::None {
            break;
        }
    }
    result
}
