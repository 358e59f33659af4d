//! Refinement universe: every combination of observed predicate values

use super::distance::DistanceModel;
use crate::types::{TupleSet, ValueRange};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Concrete replacement values for the query predicates, in predicate order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refinement {
    pub values: Vec<f64>,
    pub distance: f64,
}

impl Refinement {
    /// Canonical order: ascending distance, then lexicographic values
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| cmp_values(&self.values, &other.values))
    }
}

pub(crate) fn cmp_values(a: &[f64], b: &[f64]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.total_cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

#[derive(Debug, Clone)]
pub struct RefinementUniverse {
    /// Distinct values per predicate dimension, ascending
    domains: Vec<Vec<f64>>,
    model: DistanceModel,
}

impl RefinementUniverse {
    pub fn new(domains: Vec<Vec<f64>>, model: DistanceModel) -> Self {
        Self { domains, model }
    }

    /// Domains are the distinct values of each predicate column
    pub fn from_tuples(tuples: &TupleSet, build_model: impl FnOnce(&[Vec<f64>]) -> DistanceModel) -> Self {
        let domains: Vec<Vec<f64>> = (0..tuples.predicate_dims()).map(|d| tuples.distinct_values(d)).collect();
        let model = build_model(&domains);
        Self { domains, model }
    }

    pub fn dims(&self) -> usize {
        self.domains.len()
    }

    pub fn domain(&self, dim: usize) -> &[f64] {
        &self.domains[dim]
    }

    pub fn model(&self) -> &DistanceModel {
        &self.model
    }

    /// Size of the Cartesian product
    pub fn combinations(&self) -> u128 {
        self.domains.iter().map(|d| d.len() as u128).product()
    }

    /// Observed values of `dim` inside `range`
    pub fn values_in(&self, dim: usize, range: ValueRange) -> &[f64] {
        let values = &self.domains[dim];
        let start = values.partition_point(|&v| v < range.lo);
        let end = values.partition_point(|&v| v <= range.hi);
        &values[start..end.max(start)]
    }

    /// Shrink `[lo, hi]` (or `(lo, hi]` when `open_lo`) to the observed
    /// values it contains; None when it contains none.
    pub fn tighten(&self, dim: usize, lo: f64, hi: f64, open_lo: bool) -> Option<ValueRange> {
        let values = &self.domains[dim];
        let start = if open_lo {
            values.partition_point(|&v| v <= lo)
        } else {
            values.partition_point(|&v| v < lo)
        };
        let end = values.partition_point(|&v| v <= hi);
        if start < end {
            Some(ValueRange::new(values[start], values[end - 1]))
        } else {
            None
        }
    }

    /// Smallest per-dimension distance reachable inside `range`
    pub fn min_dim_distance(&self, dim: usize, range: ValueRange) -> Option<f64> {
        let values = self.values_in(dim, range);
        if values.is_empty() {
            return None;
        }
        // The nearest observed value to the origin sits next to its insertion point
        let origin = self.model.origin()[dim];
        let idx = values.partition_point(|&v| v < origin);
        let candidates = [idx.checked_sub(1), Some(idx)];
        candidates
            .iter()
            .flatten()
            .filter_map(|&i| values.get(i))
            .map(|&v| self.model.dim_distance(dim, v))
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Lower bound on the distance of any refinement inside `region`
    pub fn min_distance(&self, region: &[ValueRange]) -> Option<f64> {
        region
            .iter()
            .enumerate()
            .map(|(d, r)| self.min_dim_distance(d, *r))
            .sum()
    }

    pub fn refinement(&self, values: Vec<f64>) -> Refinement {
        let distance = self.model.distance(&values);
        Refinement { values, distance }
    }

    /// Every universe tuple inside `region`, canonically ordered
    pub fn refinements_in(&self, region: &[ValueRange]) -> Vec<Refinement> {
        let slices: Vec<&[f64]> = region.iter().enumerate().map(|(d, r)| self.values_in(d, *r)).collect();
        let mut out: Vec<Refinement> = cartesian(&slices).into_iter().map(|v| self.refinement(v)).collect();
        out.sort_by(Refinement::canonical_cmp);
        out
    }

    /// The complete universe ranked by `(distance, values)`
    pub fn ranked(&self) -> Vec<Refinement> {
        let slices: Vec<&[f64]> = self.domains.iter().map(Vec::as_slice).collect();
        let mut out: Vec<Refinement> = cartesian(&slices).into_iter().map(|v| self.refinement(v)).collect();
        out.sort_by(Refinement::canonical_cmp);
        out
    }
}

/// Cartesian product of per-dimension value lists
pub(crate) fn cartesian<T: Clone>(slices: &[&[T]]) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = vec![Vec::with_capacity(slices.len())];
    for slice in slices {
        let mut next = Vec::with_capacity(out.len() * slice.len());
        for prefix in &out {
            for item in slice.iter() {
                let mut combo = prefix.clone();
                combo.push(item.clone());
                next.push(combo);
            }
        }
        out = next;
    }
    out
}
