//! Per-run counters and timers

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Cluster nodes box-tested across all traversals
    pub clusters_visited: u64,
    /// Regions popped and evaluated
    pub refinements_checked: u64,
    /// Regions evaluated as fully satisfying
    pub refinements_satisfying: u64,
    /// Concrete refinements offered to the result set
    pub solutions_count: u64,
    /// Regions ever queued
    pub regions_queued: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub elapsed: Duration,
    /// Membership lookup plus interval evaluation of ranges
    pub range_eval_time: Duration,
    /// Bisecting partial ranges
    pub division_time: Duration,
    /// Membership lookup plus exact evaluation of points
    pub single_time: Duration,
    /// Result bookkeeping and the stopping test
    pub processing_time: Duration,
}

impl RunMetrics {
    /// Fraction of the refinement universe that was checked, in percent
    pub fn checked_pct(&self, combinations: u128) -> f64 {
        if combinations == 0 {
            0.0
        } else {
            self.refinements_checked as f64 / combinations as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_pct() {
        let metrics = RunMetrics {
            refinements_checked: 5,
            ..Default::default()
        };
        assert_eq!(metrics.checked_pct(20), 25.0);
        assert_eq!(metrics.checked_pct(0), 0.0);
    }
}
