//! Starting ranges for range pruning and their bisection

use super::universe::{cartesian, RefinementUniverse};
use crate::error::{RepairError, Result};
use crate::types::{PredicateKind, PredicateSpec, ValueRange};
use serde::{Deserialize, Serialize};

/// How each numerical predicate domain is carved into starting ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangeStrategy {
    /// Fixed number of equal-width buckets
    EqualWidth { ranges: usize },
    /// Bucket count `max(1, floor((max - min) / max(IQR, 1)))`
    Iqr,
}

impl Default for RangeStrategy {
    fn default() -> Self {
        RangeStrategy::EqualWidth { ranges: 7 }
    }
}

impl RangeStrategy {
    pub fn validate(&self) -> Result<()> {
        match self {
            RangeStrategy::EqualWidth { ranges: 0 } => Err(RepairError::Configuration(
                "equal-width range count must be at least 1".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Number of buckets for an ascending list of distinct values
    pub fn bucket_count(&self, values: &[f64]) -> usize {
        match *self {
            RangeStrategy::EqualWidth { ranges } => ranges.max(1),
            RangeStrategy::Iqr => {
                let (Some(&min), Some(&max)) = (values.first(), values.last()) else {
                    return 1;
                };
                let iqr = percentile(values, 75.0) - percentile(values, 25.0);
                (((max - min) / iqr.max(1.0)).floor() as usize).max(1)
            }
        }
    }
}

/// Linear-interpolated percentile of ascending `values`
fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let rank = p / 100.0 * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (rank - lo as f64)
}

/// One starting range of one dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimRange {
    pub range: ValueRange,
    pub min_distance: f64,
}

/// Per-dimension starting ranges, each list ascending by `min_distance`
#[derive(Debug, Clone)]
pub struct RangeSpace {
    dims: Vec<Vec<DimRange>>,
}

impl RangeSpace {
    pub fn build(universe: &RefinementUniverse, predicates: &[PredicateSpec], strategy: RangeStrategy) -> Self {
        let dims = predicates
            .iter()
            .enumerate()
            .map(|(d, pred)| {
                let values = universe.domain(d);
                let ranges = match pred.kind {
                    PredicateKind::Categorical => values.iter().map(|&v| ValueRange::point(v)).collect(),
                    PredicateKind::Numerical => bucketize(values, strategy.bucket_count(values)),
                };
                let mut ranges: Vec<DimRange> = ranges
                    .into_iter()
                    .filter_map(|range| {
                        universe
                            .min_dim_distance(d, range)
                            .map(|min_distance| DimRange { range, min_distance })
                    })
                    .collect();
                ranges.sort_by(|a, b| {
                    a.min_distance
                        .total_cmp(&b.min_distance)
                        .then(a.range.lo.total_cmp(&b.range.lo))
                });
                ranges
            })
            .collect();
        Self { dims }
    }

    pub fn dim(&self, d: usize) -> &[DimRange] {
        &self.dims[d]
    }

    /// Cartesian product of the starting ranges
    pub fn regions(&self) -> Vec<Vec<ValueRange>> {
        let per_dim: Vec<Vec<ValueRange>> = self
            .dims
            .iter()
            .map(|ranges| ranges.iter().map(|r| r.range).collect())
            .collect();
        let slices: Vec<&[ValueRange]> = per_dim.iter().map(Vec::as_slice).collect();
        cartesian(&slices)
    }
}

/// Group ascending distinct values into `count` equal-width buckets over
/// `[min, max]`, each tightened to the values it holds; empty buckets vanish.
fn bucketize(values: &[f64], count: usize) -> Vec<ValueRange> {
    let (Some(&min), Some(&max)) = (values.first(), values.last()) else {
        return Vec::new();
    };
    let width = (max - min) / count as f64;

    let mut ranges: Vec<ValueRange> = Vec::new();
    let mut current: Option<(usize, f64, f64)> = None;
    for &v in values {
        let bucket = if width > 0.0 {
            (((v - min) / width) as usize).min(count - 1)
        } else {
            0
        };
        current = match current {
            Some((b, lo, _)) if b == bucket => Some((b, lo, v)),
            Some((_, lo, hi)) => {
                ranges.push(ValueRange::new(lo, hi));
                Some((bucket, v, v))
            }
            None => Some((bucket, v, v)),
        };
    }
    if let Some((_, lo, hi)) = current {
        ranges.push(ValueRange::new(lo, hi));
    }
    ranges
}

/// Split every non-degenerate dimension of `region` at its midpoint into
/// `[lo, mid]` and `(mid, hi]`, both tightened to observed values, and
/// return the Cartesian product of the halves.
pub fn bisect(universe: &RefinementUniverse, region: &[ValueRange]) -> Vec<Vec<ValueRange>> {
    let halves: Vec<Vec<ValueRange>> = region
        .iter()
        .enumerate()
        .map(|(d, r)| split_dim(universe, d, *r))
        .collect();
    let slices: Vec<&[ValueRange]> = halves.iter().map(Vec::as_slice).collect();
    cartesian(&slices)
}

/// Every returned half holds strictly fewer observed values than `range`.
fn split_dim(universe: &RefinementUniverse, dim: usize, range: ValueRange) -> Vec<ValueRange> {
    if range.is_point() {
        return vec![range];
    }
    let mid = range.midpoint();
    if range.lo <= mid && mid < range.hi {
        return [universe.tighten(dim, range.lo, mid, false), universe.tighten(dim, mid, range.hi, true)]
            .into_iter()
            .flatten()
            .collect();
    }

    // midpoint rounded onto an endpoint (adjacent floats): cut the observed values instead
    let values = universe.values_in(dim, range);
    if values.len() < 2 {
        return values.iter().map(|&v| ValueRange::point(v)).collect();
    }
    let cut = values.len() / 2;
    vec![
        ValueRange::new(values[0], values[cut - 1]),
        ValueRange::new(values[cut], values[values.len() - 1]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{DistanceMetric, DistanceModel};
    use crate::types::CompareOp;

    fn universe(values: Vec<f64>, origin: f64) -> RefinementUniverse {
        let domains = vec![values];
        let model = DistanceModel::new(DistanceMetric::Absolute, vec![origin], &domains);
        RefinementUniverse::new(domains, model)
    }

    #[test]
    fn test_bucketize_equal_width() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let ranges = bucketize(&values, 3);
        assert_eq!(
            ranges,
            vec![ValueRange::new(1.0, 3.0), ValueRange::new(4.0, 6.0), ValueRange::new(7.0, 10.0)]
        );
        // gaps never produce empty ranges
        let ranges = bucketize(&[1.0, 2.0, 100.0], 10);
        assert_eq!(ranges.len(), 2);
        assert_eq!(bucketize(&[5.0], 4), vec![ValueRange::point(5.0)]);
    }

    #[test]
    fn test_iqr_bucket_count() {
        let values: Vec<f64> = (0..=100).map(|v| v as f64).collect();
        // IQR = 50 -> 100 / 50 = 2
        assert_eq!(RangeStrategy::Iqr.bucket_count(&values), 2);
        assert_eq!(RangeStrategy::Iqr.bucket_count(&[3.0]), 1);
        assert!(RangeStrategy::EqualWidth { ranges: 0 }.validate().is_err());
    }

    #[test]
    fn test_range_space_sorted_by_distance() {
        let u = universe((1..=9).map(|v| v as f64).collect(), 8.0);
        let preds = vec![PredicateSpec::numerical("x", CompareOp::Ge, 8.0)];
        let space = RangeSpace::build(&u, &preds, RangeStrategy::EqualWidth { ranges: 3 });
        let dims = space.dim(0);
        assert_eq!(dims[0].range, ValueRange::new(7.0, 9.0));
        assert_eq!(dims[0].min_distance, 0.0);
        assert_eq!(dims[1].min_distance, 2.0);
        assert_eq!(space.regions().len(), 3);
    }

    #[test]
    fn test_categorical_points() {
        let u = universe(vec![0.0, 1.0, 2.0], 1.0);
        let preds = vec![PredicateSpec::categorical("c", CompareOp::Eq, 1.0)];
        let space = RangeSpace::build(&u, &preds, RangeStrategy::default());
        assert!(space.dim(0).iter().all(|r| r.range.is_point()));
        assert_eq!(space.dim(0)[0].range, ValueRange::point(1.0));
    }

    #[test]
    fn test_bisect() {
        let u = universe(vec![1.0, 2.0, 3.0, 5.0, 6.0], 1.0);
        let halves = bisect(&u, &[ValueRange::new(1.0, 6.0)]);
        assert_eq!(halves, vec![vec![ValueRange::new(1.0, 3.0)], vec![ValueRange::new(5.0, 6.0)]]);

        let two = bisect(&u, &[ValueRange::new(5.0, 6.0)]);
        assert_eq!(two, vec![vec![ValueRange::point(5.0)], vec![ValueRange::point(6.0)]]);

        let frac = universe(vec![0.5, 0.75, 1.5], 0.0);
        let halves = bisect(&frac, &[ValueRange::new(0.5, 1.5)]);
        assert_eq!(halves, vec![vec![ValueRange::new(0.5, 0.75)], vec![ValueRange::point(1.5)]]);
    }

    #[test]
    fn test_bisect_adjacent_floats() {
        let lo = 1.0 + f64::EPSILON;
        let hi = 1.0 + 2.0 * f64::EPSILON;
        let u = universe(vec![lo, hi], 1.0);
        // (lo + hi) / 2 rounds up to hi
        assert_eq!(ValueRange::new(lo, hi).midpoint(), hi);

        let halves = bisect(&u, &[ValueRange::new(lo, hi)]);
        assert_eq!(halves, vec![vec![ValueRange::point(lo)], vec![ValueRange::point(hi)]]);

        let next = 1.0 + 3.0 * f64::EPSILON;
        let u = universe(vec![lo, hi, next], 1.0);
        for half in bisect(&u, &[ValueRange::new(lo, next)]) {
            assert!(u.values_in(0, half[0]).len() < 3, "{:?}", half);
        }
    }
}
