//! Best-first branch-and-bound search over refinement regions
//!
//! Both strategies share one loop:
//!
//! 1. pop the region with the smallest distance lower bound
//! 2. classify clusters against it (membership cache first)
//! 3. evaluate the constraints exactly for points, with intervals for ranges
//! 4. `Full` regions feed the result set, `Partial` ranges are bisected and
//!    re-queued, everything else is dropped
//! 5. stop once K results are held and the next bound exceeds the K-th distance
//!
//! Full filtering seeds the queue with every point of the ranked universe;
//! range pruning seeds it with the starting ranges.

use super::metrics::RunMetrics;
use super::region::{Region, RegionQueue};
use super::topk::{RepairResult, TopK};
use super::traversal::{classify_clusters, Membership};
use crate::cache::{CacheScope, MembershipCache};
use crate::candidate::{bisect, RangeSpace, RefinementUniverse};
use crate::error::{RepairError, Result};
use crate::expr::ConstraintSet;
use crate::stats::StatisticalTree;
use crate::types::{CompareOp, Satisfaction};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Checked regions between progress log lines
const PROGRESS_EVERY: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Exact point-by-point search over the refinement universe
    #[serde(rename = "ff", alias = "full_filtering")]
    FullFiltering,
    /// Interval search over bisected value ranges
    #[serde(rename = "rp", alias = "range_pruning")]
    RangePruning,
}

impl Strategy {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ff" | "full" | "full_filtering" => Ok(Strategy::FullFiltering),
            "rp" | "ranges" | "range_pruning" => Ok(Strategy::RangePruning),
            other => Err(RepairError::Configuration(format!("Unknown strategy: {}", other))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::FullFiltering => "ff",
            Strategy::RangePruning => "rp",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one search run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub strategy: Strategy,
    /// Ascending by `(distance, values)`, at most K entries
    pub results: Vec<RepairResult>,
    pub metrics: RunMetrics,
    /// False when the run stopped on its timeout
    pub complete: bool,
}

pub struct SearchEngine<'a> {
    stats: &'a StatisticalTree,
    constraints: &'a ConstraintSet,
    universe: &'a RefinementUniverse,
    operators: Vec<CompareOp>,
    top_k: usize,
    cache: Option<(&'a MembershipCache, CacheScope)>,
    timeout: Option<Duration>,
}

impl<'a> SearchEngine<'a> {
    pub fn new(
        stats: &'a StatisticalTree,
        constraints: &'a ConstraintSet,
        universe: &'a RefinementUniverse,
        operators: Vec<CompareOp>,
        top_k: usize,
    ) -> Self {
        Self {
            stats,
            constraints,
            universe,
            operators,
            top_k: top_k.max(1),
            cache: None,
            timeout: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a MembershipCache, scope: CacheScope) -> Self {
        self.cache = Some((cache, scope));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn full_filtering(&self) -> SearchOutcome {
        let mut queue = RegionQueue::new();
        for refinement in self.universe.ranked() {
            queue.push(Region::point(&refinement.values, refinement.distance));
        }
        self.drive(Strategy::FullFiltering, queue)
    }

    pub fn range_pruning(&self, space: &RangeSpace) -> SearchOutcome {
        let mut queue = RegionQueue::new();
        for ranges in space.regions() {
            if let Some(bound) = self.universe.min_distance(&ranges) {
                queue.push(Region::new(ranges, bound));
            }
        }
        self.drive(Strategy::RangePruning, queue)
    }

    fn drive(&self, strategy: Strategy, mut queue: RegionQueue) -> SearchOutcome {
        let start = Instant::now();
        let mut metrics = RunMetrics::default();
        let mut top = TopK::new(self.top_k);
        let mut complete = true;

        info!(
            "[Search] {} start: {} seeded regions, K={}",
            strategy,
            queue.len(),
            self.top_k
        );

        while let Some(region) = queue.pop() {
            if let Some(timeout) = self.timeout {
                if start.elapsed() >= timeout {
                    info!(
                        "[Search] {} timed out after {:?} with {} results",
                        strategy,
                        timeout,
                        top.len()
                    );
                    complete = false;
                    break;
                }
            }

            metrics.refinements_checked += 1;
            if metrics.refinements_checked % PROGRESS_EVERY == 0 {
                info!(
                    "[Search] {} checked {} regions, {} queued, {} results",
                    strategy,
                    metrics.refinements_checked,
                    queue.len(),
                    top.len()
                );
            }

            if region.is_point() {
                let t = Instant::now();
                let membership = self.membership(&region, &mut metrics);
                let outcome = self.constraints.evaluate_exact(self.stats, &membership.full);
                metrics.single_time += t.elapsed();

                if outcome.satisfaction == Satisfaction::Full {
                    let t = Instant::now();
                    metrics.refinements_satisfying += 1;
                    metrics.solutions_count += 1;
                    top.insert(RepairResult {
                        values: region.lows(),
                        distance: region.lower_bound,
                        evaluation: outcome.evaluation,
                        range: None,
                    });
                    metrics.processing_time += t.elapsed();
                }
            } else {
                let t = Instant::now();
                let membership = self.membership(&region, &mut metrics);
                let outcome =
                    self.constraints
                        .evaluate_interval(self.stats, &membership.full, &membership.partial);
                metrics.range_eval_time += t.elapsed();

                match outcome.satisfaction {
                    Satisfaction::Full => {
                        let t = Instant::now();
                        metrics.refinements_satisfying += 1;
                        for refinement in self.universe.refinements_in(&region.ranges) {
                            metrics.solutions_count += 1;
                            top.insert(RepairResult {
                                values: refinement.values,
                                distance: refinement.distance,
                                evaluation: outcome.evaluation.clone(),
                                range: Some(region.ranges.clone()),
                            });
                        }
                        metrics.processing_time += t.elapsed();
                    }
                    Satisfaction::Partial => {
                        let t = Instant::now();
                        for ranges in bisect(self.universe, &region.ranges) {
                            if let Some(bound) = self.universe.min_distance(&ranges) {
                                queue.push(Region::new(ranges, bound));
                            }
                        }
                        metrics.division_time += t.elapsed();
                    }
                    Satisfaction::None => {}
                }
            }

            let t = Instant::now();
            let stop = match (top.kth_distance(), queue.peek_bound()) {
                (Some(kth), Some(next)) => next > kth,
                _ => false,
            };
            metrics.processing_time += t.elapsed();
            if stop {
                debug!(
                    "[Search] {} early stop: next bound exceeds K-th distance after {} checks",
                    strategy, metrics.refinements_checked
                );
                break;
            }
        }

        metrics.regions_queued = queue.pushed();
        metrics.elapsed = start.elapsed();
        info!(
            "[Search] {} done: {} results, {} checks, {} clusters visited, {:?}",
            strategy,
            top.len(),
            metrics.refinements_checked,
            metrics.clusters_visited,
            metrics.elapsed
        );

        SearchOutcome {
            strategy,
            results: top.into_vec(),
            metrics,
            complete,
        }
    }

    /// Cached membership of a region, traversing the tree on a miss
    fn membership(&self, region: &Region, metrics: &mut RunMetrics) -> Arc<Membership> {
        let node_count = self.stats.tree().len();
        let key = self.cache.as_ref().map(|(cache, scope)| (*cache, scope.key(&region.ranges)));

        if let Some((cache, key)) = &key {
            if let Some(hit) = cache.get(key, node_count) {
                metrics.cache_hits += 1;
                return hit;
            }
            metrics.cache_misses += 1;
        }

        let (membership, visited) = classify_clusters(self.stats.tree(), &self.operators, &region.ranges);
        metrics.clusters_visited += visited;

        match &key {
            Some((cache, key)) => cache.put(key, &membership),
            None => Arc::new(membership),
        }
    }
}
