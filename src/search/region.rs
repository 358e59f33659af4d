//! Search regions and the best-first queue that orders them

use crate::types::ValueRange;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// One box of candidate predicate values, in predicate order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub ranges: Vec<ValueRange>,
    /// No refinement inside the region is closer than this
    pub lower_bound: f64,
}

impl Region {
    pub fn new(ranges: Vec<ValueRange>, lower_bound: f64) -> Self {
        Self { ranges, lower_bound }
    }

    pub fn point(values: &[f64], distance: f64) -> Self {
        Self {
            ranges: values.iter().map(|&v| ValueRange::point(v)).collect(),
            lower_bound: distance,
        }
    }

    pub fn is_point(&self) -> bool {
        self.ranges.iter().all(ValueRange::is_point)
    }

    /// Lower ends, which are the values of a point region
    pub fn lows(&self) -> Vec<f64> {
        self.ranges.iter().map(|r| r.lo).collect()
    }
}

/// Heap entry keyed by `(lower_bound, seq)`; ordering is reversed so the
/// std max-heap pops the smallest key.
#[derive(Debug)]
struct QueueEntry {
    key: f64,
    seq: u64,
    region: Region,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-priority queue of unresolved regions. Ties on the bound pop in
/// insertion order.
#[derive(Debug, Default)]
pub struct RegionQueue {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
}

impl RegionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, region: Region) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueueEntry {
            key: region.lower_bound,
            seq,
            region,
        });
    }

    pub fn pop(&mut self) -> Option<Region> {
        self.heap.pop().map(|e| e.region)
    }

    /// Smallest remaining lower bound
    pub fn peek_bound(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.key)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Total regions ever pushed
    pub fn pushed(&self) -> u64 {
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_order() {
        let mut q = RegionQueue::new();
        q.push(Region::point(&[3.0], 2.0));
        q.push(Region::point(&[1.0], 1.0));
        q.push(Region::point(&[5.0], 1.0));
        q.push(Region::new(vec![ValueRange::new(0.0, 9.0)], 0.0));

        assert_eq!(q.peek_bound(), Some(0.0));
        assert!(!q.pop().unwrap().is_point());
        // equal bounds pop in insertion order
        assert_eq!(q.pop().unwrap().lows(), vec![1.0]);
        assert_eq!(q.pop().unwrap().lows(), vec![5.0]);
        assert_eq!(q.pop().unwrap().lows(), vec![3.0]);
        assert!(q.pop().is_none());
        assert_eq!(q.pushed(), 4);
    }
}
