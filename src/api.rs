//! Query repair API
//!
//! [`QueryRepair`] wires the pipeline together for one job:
//!
//! ```text
//! validate -> project -> cluster tree -> statistical tree -> constraints
//!          -> refinement universe -> search (ff | rp) -> report
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use qrepair::{Dataset, QueryRepair, RepairJob, Strategy};
//!
//! # fn main() -> qrepair::Result<()> {
//! let job: RepairJob = serde_json::from_str(&std::fs::read_to_string("job.json")?)?;
//! let data: Dataset = serde_json::from_str(&std::fs::read_to_string("data.json")?)?;
//!
//! let repair = QueryRepair::prepare(job, &data)?;
//! let outcome = repair.run(Strategy::RangePruning)?;
//! for result in &outcome.results {
//!     println!("{:?} at distance {}", result.values, result.distance);
//! }
//! # Ok(())
//! # }
//! ```

use crate::cache::{CacheScope, MembershipCache};
use crate::candidate::{DistanceModel, RangeSpace, RefinementUniverse};
use crate::config::{RepairConfig, OUTPUT_DIR_ENV};
use crate::error::{RepairError, Result};
use crate::expr::ConstraintSet;
use crate::index::ClusterTree;
use crate::report::{self, RunInfo};
use crate::search::{RepairResult, RunMetrics, SearchEngine, Strategy};
use crate::stats::{AggregateExpr, StatisticalTree};
use crate::types::{CompareOp, Dataset, PredicateSpec, TupleSet};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Everything that describes one repair job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairJob {
    /// The query's selection predicates; their values are the search origin
    pub predicates: Vec<PredicateSpec>,

    /// Columns the aggregations may reference
    #[serde(default)]
    pub constraint_columns: Vec<String>,

    /// Aggregate name -> `func("args")` text
    pub aggregations: BTreeMap<String, String>,

    /// Bound expressions; a refinement must satisfy all of them
    pub constraints: Vec<String>,

    #[serde(default)]
    pub config: RepairConfig,
}

/// What a finished run hands back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairOutcome {
    pub strategy: Strategy,
    /// Ascending by distance, at most `top_k` entries
    pub results: Vec<RepairResult>,
    pub metrics: RunMetrics,
    /// False when the run hit its timeout
    pub complete: bool,
    pub info: RunInfo,
}

/// A prepared repair job. Building the trees happens once; `run` may be
/// called for each strategy.
#[derive(Debug)]
pub struct QueryRepair {
    job: RepairJob,
    tuples: TupleSet,
    stats: StatisticalTree,
    constraints: ConstraintSet,
    universe: RefinementUniverse,
    cache: Option<MembershipCache>,
    scope: CacheScope,
    dataset_size: usize,
}

impl QueryRepair {
    /// Validate the job, project the dataset and build every index the
    /// search needs. All configuration errors surface here.
    pub fn prepare(job: RepairJob, dataset: &Dataset) -> Result<Self> {
        validate_job(&job)?;
        if dataset.is_empty() {
            return Err(RepairError::EmptyDataset);
        }
        let tuples = dataset.project(&job.predicates, &job.constraint_columns)?;
        Self::from_tuples(job, tuples)
    }

    /// Same as [`prepare`](Self::prepare) for an already projected tuple set
    pub fn from_tuples(job: RepairJob, tuples: TupleSet) -> Result<Self> {
        validate_job(&job)?;
        if tuples.is_empty() {
            return Err(RepairError::EmptyDataset);
        }
        let start = Instant::now();
        let config = &job.config;

        let aggregates = job
            .aggregations
            .iter()
            .map(|(name, text)| AggregateExpr::parse(name, text, tuples.constraint_columns()))
            .collect::<Result<Vec<_>>>()?;

        let tree = Arc::new(ClusterTree::build(&tuples, config.bucket_size, config.branch_factor));
        let stats = StatisticalTree::build(tree, &tuples, &aggregates, config.effective_workers())?;
        let constraints = ConstraintSet::parse(&job.constraints, stats.aggregate_names())?;

        let origin: Vec<f64> = job.predicates.iter().map(|p| p.value).collect();
        let metric = config.distance_metric;
        let universe = RefinementUniverse::from_tuples(&tuples, |domains| {
            DistanceModel::new(metric, origin, domains)
        });

        let dataset_size = config.dataset_size.unwrap_or(tuples.len());
        let scope = CacheScope {
            dataset: config.dataset_name.clone(),
            size: dataset_size,
            bucket: config.bucket_size,
            branch: config.branch_factor,
            columns: tuples.predicate_columns().to_vec(),
            operators: job.predicates.iter().map(|p| p.op).collect(),
            fingerprint: tuples.fingerprint(),
        };
        let cache = if config.cache.enabled {
            Some(MembershipCache::open(&config.cache)?)
        } else {
            None
        };

        info!(
            "[QueryRepair] Prepared '{}': {} tuples, {} clusters, {} refinements in {:?}",
            config.dataset_name,
            tuples.len(),
            stats.tree().len(),
            universe.combinations(),
            start.elapsed()
        );

        Ok(Self {
            job,
            tuples,
            stats,
            constraints,
            universe,
            cache,
            scope,
            dataset_size,
        })
    }

    pub fn config(&self) -> &RepairConfig {
        &self.job.config
    }

    pub fn tuples(&self) -> &TupleSet {
        &self.tuples
    }

    pub fn statistical_tree(&self) -> &StatisticalTree {
        &self.stats
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn universe(&self) -> &RefinementUniverse {
        &self.universe
    }

    pub fn cache(&self) -> Option<&MembershipCache> {
        self.cache.as_ref()
    }

    fn operators(&self) -> Vec<CompareOp> {
        self.job.predicates.iter().map(|p| p.op).collect()
    }

    /// Run one search strategy
    pub fn run(&self, strategy: Strategy) -> Result<RepairOutcome> {
        let config = &self.job.config;
        let mut engine = SearchEngine::new(
            &self.stats,
            &self.constraints,
            &self.universe,
            self.operators(),
            config.top_k,
        );
        if let Some(cache) = &self.cache {
            engine = engine.with_cache(cache, self.scope.clone());
        }
        if let Some(ms) = config.timeout_ms {
            engine = engine.with_timeout(Duration::from_millis(ms));
        }

        let outcome = match strategy {
            Strategy::FullFiltering => engine.full_filtering(),
            Strategy::RangePruning => {
                let space = RangeSpace::build(&self.universe, &self.job.predicates, config.range_strategy);
                debug!("[QueryRepair] Range space: {} starting regions", space.regions().len());
                engine.range_pruning(&space)
            }
        };

        if let Some(cache) = &self.cache {
            debug!("[QueryRepair] {}", cache.stats());
        }

        let info = self.run_info(strategy, &outcome.metrics, outcome.complete);
        Ok(RepairOutcome {
            strategy,
            results: outcome.results,
            metrics: outcome.metrics,
            complete: outcome.complete,
            info,
        })
    }

    pub fn run_info(&self, strategy: Strategy, metrics: &RunMetrics, complete: bool) -> RunInfo {
        let config = &self.job.config;
        RunInfo::from_metrics(
            &config.dataset_name,
            self.dataset_size,
            strategy,
            config.top_k,
            self.universe.combinations(),
            self.constraints.width(),
            metrics,
            complete,
        )
    }

    /// Output directory from the config, else `$QREPAIR_OUTPUT_DIR`
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.job
            .config
            .output_dir
            .clone()
            .or_else(|| std::env::var_os(OUTPUT_DIR_ENV).map(PathBuf::from))
    }

    /// Write the outcome's artifacts. Returns None when no output directory
    /// is configured.
    pub fn write_report(&self, outcome: &RepairOutcome) -> Result<Option<PathBuf>> {
        match self.output_dir() {
            Some(dir) => report::write_results(&dir, &outcome.results, &outcome.info).map(Some),
            None => Ok(None),
        }
    }
}

fn validate_job(job: &RepairJob) -> Result<()> {
    job.config.validate()?;

    if job.predicates.is_empty() {
        return Err(RepairError::Configuration("Job has no predicates".into()));
    }
    let mut seen = AHashSet::new();
    for pred in &job.predicates {
        pred.validate()?;
        if !seen.insert(pred.column.as_str()) {
            return Err(RepairError::Configuration(format!(
                "Column '{}' appears in more than one predicate",
                pred.column
            )));
        }
    }

    if job.aggregations.is_empty() {
        return Err(RepairError::Configuration("Job has no aggregations".into()));
    }
    if job.constraints.is_empty() {
        return Err(RepairError::Configuration("Job has no constraints".into()));
    }
    Ok(())
}
