//! Bounded, canonically ordered result set

use crate::candidate::universe::cmp_values;
use crate::expr::Evaluation;
use crate::types::ValueRange;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One satisfying refinement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairResult {
    /// Refined predicate values, in predicate order
    pub values: Vec<f64>,
    pub distance: f64,
    /// Exact values for point checks, intervals when accepted as part of a range
    pub evaluation: Evaluation,
    /// The satisfying range the refinement was drawn from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Vec<ValueRange>>,
}

impl RepairResult {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| cmp_values(&self.values, &other.values))
    }
}

/// Keeps the `k` best results by `(distance, values)`, deduplicated on
/// that key.
#[derive(Debug, Clone)]
pub struct TopK {
    k: usize,
    entries: Vec<RepairResult>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            entries: Vec::with_capacity(k.max(1) + 1),
        }
    }

    /// Insert a result; returns whether it is now part of the set.
    pub fn insert(&mut self, result: RepairResult) -> bool {
        let pos = match self.entries.binary_search_by(|e| e.key_cmp(&result)) {
            Ok(_) => return false,
            Err(pos) => pos,
        };
        if pos >= self.k {
            return false;
        }
        self.entries.insert(pos, result);
        self.entries.truncate(self.k);
        true
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.k
    }

    /// Distance of the K-th best entry once K entries are held
    pub fn kth_distance(&self) -> Option<f64> {
        if self.is_full() {
            self.entries.last().map(|e| e.distance)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RepairResult] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<RepairResult> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(values: &[f64], distance: f64) -> RepairResult {
        RepairResult {
            values: values.to_vec(),
            distance,
            evaluation: Evaluation::Exact(vec![]),
            range: None,
        }
    }

    #[test]
    fn test_order_and_bound() {
        let mut top = TopK::new(3);
        assert!(top.insert(result(&[5.0], 2.0)));
        assert!(top.insert(result(&[3.0], 1.0)));
        assert!(top.kth_distance().is_none());
        assert!(top.insert(result(&[1.0], 1.0)));
        assert_eq!(top.kth_distance(), Some(2.0));

        // worse than the current K-th
        assert!(!top.insert(result(&[9.0], 4.0)));
        // better: evicts the K-th
        assert!(top.insert(result(&[4.0], 0.0)));

        let values: Vec<f64> = top.entries().iter().map(|r| r.values[0]).collect();
        assert_eq!(values, vec![4.0, 1.0, 3.0]);
    }

    #[test]
    fn test_dedup() {
        let mut top = TopK::new(5);
        assert!(top.insert(result(&[2.0, 1.0], 3.0)));
        assert!(!top.insert(result(&[2.0, 1.0], 3.0)));
        assert_eq!(top.len(), 1);
    }
}
