//! Result artifacts
//!
//! Each run leaves two files in the output directory:
//! - `satisfied_conditions_<strategy>_<dataset>_size<n>.json`: the result list,
//!   pretty-printed and committed with a temp file plus rename
//! - `run_info_<dataset>_size<n>.jsonl`: one appended [`RunInfo`] line per run

use crate::error::Result;
use crate::search::{RepairResult, RunMetrics, Strategy};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Summary record of one search run. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub dataset: String,
    pub size: usize,
    pub strategy: Strategy,
    pub top_k: usize,
    pub combinations: u128,
    pub checked_pct: f64,
    pub clusters_visited: u64,
    pub refinements_checked: u64,
    pub refinements_satisfying: u64,
    pub solutions_count: u64,
    pub elapsed: f64,
    pub range_eval_time: f64,
    pub division_time: f64,
    pub single_time: f64,
    pub processing_time: f64,
    pub constraint_width: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub complete: bool,
}

impl RunInfo {
    #[allow(clippy::too_many_arguments)]
    pub fn from_metrics(
        dataset: &str,
        size: usize,
        strategy: Strategy,
        top_k: usize,
        combinations: u128,
        constraint_width: f64,
        metrics: &RunMetrics,
        complete: bool,
    ) -> Self {
        Self {
            dataset: dataset.to_string(),
            size,
            strategy,
            top_k,
            combinations,
            checked_pct: metrics.checked_pct(combinations),
            clusters_visited: metrics.clusters_visited,
            refinements_checked: metrics.refinements_checked,
            refinements_satisfying: metrics.refinements_satisfying,
            solutions_count: metrics.solutions_count,
            elapsed: metrics.elapsed.as_secs_f64(),
            range_eval_time: metrics.range_eval_time.as_secs_f64(),
            division_time: metrics.division_time.as_secs_f64(),
            single_time: metrics.single_time.as_secs_f64(),
            processing_time: metrics.processing_time.as_secs_f64(),
            constraint_width,
            cache_hits: metrics.cache_hits,
            cache_misses: metrics.cache_misses,
            complete,
        }
    }
}

pub fn results_path(dir: &Path, strategy: Strategy, dataset: &str, size: usize) -> PathBuf {
    dir.join(format!("satisfied_conditions_{}_{}_size{}.json", strategy, dataset, size))
}

pub fn run_info_path(dir: &Path, dataset: &str, size: usize) -> PathBuf {
    dir.join(format!("run_info_{}_size{}.jsonl", dataset, size))
}

/// Write the result list and append the run record. Returns the result file path.
pub fn write_results(dir: &Path, results: &[RepairResult], info: &RunInfo) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let path = results_path(dir, info.strategy, &info.dataset, info.size);
    let temp_path = path.with_extension("json.tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, results)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&temp_path, &path)?;

    append_run_info(dir, info)?;
    info!(
        "[Report] Wrote {} results to {}",
        results.len(),
        path.display()
    );
    Ok(path)
}

pub fn append_run_info(dir: &Path, info: &RunInfo) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(run_info_path(dir, &info.dataset, info.size))?;
    let mut line = serde_json::to_vec(info)?;
    line.push(b'\n');
    file.write_all(&line)?;
    Ok(())
}

/// All run records for a dataset, oldest first
pub fn read_run_info(dir: &Path, dataset: &str, size: usize) -> Result<Vec<RunInfo>> {
    let path = run_info_path(dir, dataset, size);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

pub fn read_results(path: &Path) -> Result<Vec<RepairResult>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
