//! Run configuration for the repair engine
//!
//! Groups the index shape, search budget and cache placement of one repair run.

use crate::candidate::{DistanceMetric, RangeStrategy};
use crate::error::{RepairError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the membership cache directory
pub const CACHE_DIR_ENV: &str = "QREPAIR_CACHE_DIR";

/// Environment variable naming the artifact output directory
pub const OUTPUT_DIR_ENV: &str = "QREPAIR_OUTPUT_DIR";

/// Membership cache placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disk tier directory (None = in-memory tier only)
    pub dir: Option<PathBuf>,

    /// Entries kept in the in-memory LRU tier
    pub hot_capacity: usize,

    /// Master switch; a disabled cache always traverses the tree
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            hot_capacity: 4096,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// No caching at all
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Disk-backed cache under `dir`
    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Default::default()
        }
    }

    /// Resolve the disk directory from the environment.
    ///
    /// `QREPAIR_CACHE_DIR` wins; otherwise `$QREPAIR_OUTPUT_DIR/cache`;
    /// otherwise the cache stays in memory.
    pub fn from_env() -> Self {
        let dir = std::env::var_os(CACHE_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| std::env::var_os(OUTPUT_DIR_ENV).map(|out| PathBuf::from(out).join("cache")));
        Self {
            dir,
            ..Default::default()
        }
    }
}

/// Repair run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Largest tuple count a cluster may hold before it is split
    pub bucket_size: usize,

    /// Fan-out of an inner cluster
    pub branch_factor: usize,

    /// Number of refinements to return
    pub top_k: usize,

    /// Dataset identity, part of every cache key
    pub dataset_name: String,

    /// Dataset size recorded in cache keys and run info (None = tuple count)
    pub dataset_size: Option<usize>,

    /// How RP carves each predicate domain into starting ranges
    pub range_strategy: RangeStrategy,

    pub distance_metric: DistanceMetric,

    /// Aggregator pool size (None = available cores)
    pub worker_threads: Option<usize>,

    pub cache: CacheConfig,

    /// Caller-level timeout. When reached the search stops popping regions
    /// and returns what it has.
    pub timeout_ms: Option<u64>,

    /// Where `report` writes result artifacts
    pub output_dir: Option<PathBuf>,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            bucket_size: 15,
            branch_factor: 5,
            top_k: 7,
            dataset_name: "dataset".to_string(),
            dataset_size: None,
            range_strategy: RangeStrategy::default(),
            distance_metric: DistanceMetric::default(),
            worker_threads: None,
            cache: CacheConfig::default(),
            timeout_ms: None,
            output_dir: None,
        }
    }
}

impl RepairConfig {
    /// Small trees, one worker, memory-only cache
    pub fn for_testing() -> Self {
        Self {
            bucket_size: 4,
            branch_factor: 2,
            top_k: 3,
            dataset_name: "test".to_string(),
            worker_threads: Some(1),
            cache: CacheConfig {
                dir: None,
                hot_capacity: 256,
                enabled: true,
            },
            ..Default::default()
        }
    }

    /// Experiment runs: cache and outputs resolved from the environment
    pub fn for_experiments() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            output_dir: std::env::var_os(OUTPUT_DIR_ENV).map(PathBuf::from),
            ..Default::default()
        }
    }

    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    pub fn with_branch_factor(mut self, branch_factor: usize) -> Self {
        self.branch_factor = branch_factor;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_dataset(mut self, name: impl Into<String>, size: Option<usize>) -> Self {
        self.dataset_name = name.into();
        self.dataset_size = size;
        self
    }

    pub fn with_range_strategy(mut self, strategy: RangeStrategy) -> Self {
        self.range_strategy = strategy;
        self
    }

    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Worker count for the aggregator pool
    pub fn effective_workers(&self) -> usize {
        self.worker_threads
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket_size == 0 {
            return Err(RepairError::Configuration("bucket_size must be at least 1".into()));
        }
        if self.branch_factor < 2 {
            return Err(RepairError::Configuration(format!(
                "branch_factor must be at least 2, got {}",
                self.branch_factor
            )));
        }
        if self.top_k == 0 {
            return Err(RepairError::Configuration("top_k must be at least 1".into()));
        }
        if self.dataset_name.trim().is_empty() {
            return Err(RepairError::Configuration("dataset_name is empty".into()));
        }
        self.range_strategy.validate()?;
        Ok(())
    }
}
