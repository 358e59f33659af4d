//! Distance between a refinement and the user's original predicate values

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `Σ |v_i - o_i|`
    #[default]
    Absolute,
    /// Each dimension min/max-rescaled to `[0, 1]` first
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Scale {
    min: f64,
    span: f64,
}

impl Scale {
    #[inline]
    fn apply(&self, v: f64) -> f64 {
        if self.span == 0.0 {
            0.5
        } else {
            (v - self.min) / self.span
        }
    }
}

/// Per-dimension distance to a fixed origin
#[derive(Debug, Clone)]
pub struct DistanceModel {
    metric: DistanceMetric,
    origin: Vec<f64>,
    scales: Vec<Scale>,
}

impl DistanceModel {
    /// `domains[d]` holds the observed values of dimension `d`, used only
    /// by the normalized metric.
    pub fn new(metric: DistanceMetric, origin: Vec<f64>, domains: &[Vec<f64>]) -> Self {
        let scales = domains
            .iter()
            .map(|values| {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if min.is_finite() && max.is_finite() {
                    Scale { min, span: max - min }
                } else {
                    Scale { min: 0.0, span: 0.0 }
                }
            })
            .collect();
        Self { metric, origin, scales }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn origin(&self) -> &[f64] {
        &self.origin
    }

    #[inline]
    pub fn dim_distance(&self, dim: usize, value: f64) -> f64 {
        match self.metric {
            DistanceMetric::Absolute => (value - self.origin[dim]).abs(),
            DistanceMetric::Normalized => {
                let scale = self.scales[dim];
                (scale.apply(value) - scale.apply(self.origin[dim])).abs()
            }
        }
    }

    pub fn distance(&self, values: &[f64]) -> f64 {
        values
            .iter()
            .enumerate()
            .map(|(d, &v)| self.dim_distance(d, v))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute() {
        let model = DistanceModel::new(DistanceMetric::Absolute, vec![4.0, 10.0], &[vec![], vec![]]);
        assert_eq!(model.distance(&[2.0, 13.0]), 5.0);
        assert_eq!(model.dim_distance(0, 4.0), 0.0);
    }

    #[test]
    fn test_normalized() {
        let domains = vec![vec![0.0, 10.0], vec![100.0, 300.0], vec![7.0]];
        let model = DistanceModel::new(DistanceMetric::Normalized, vec![5.0, 100.0, 7.0], &domains);
        assert_eq!(model.dim_distance(0, 10.0), 0.5);
        assert_eq!(model.dim_distance(1, 200.0), 0.5);
        // degenerate column
        assert_eq!(model.dim_distance(2, 7.0), 0.0);
        assert_eq!(model.distance(&[10.0, 200.0, 7.0]), 1.0);
    }
}
