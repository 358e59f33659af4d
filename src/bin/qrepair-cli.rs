//! qrepair command line
//!
//! ```bash
//! qrepair-cli synth --rows 2000 --seed 7 --out data.json
//! qrepair-cli run --job job.json --data data.json --strategy both --out results/
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use qrepair::datagen::{self, SynthConfig};
use qrepair::{CacheConfig, Dataset, QueryRepair, RepairConfig, RepairJob, RepairOutcome, Strategy};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Find the closest refinements of a query that satisfy aggregate constraints
#[derive(Parser, Debug)]
#[command(name = "qrepair-cli", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a repair job
    Run {
        /// Job description (predicates, aggregations, constraints, config)
        #[arg(long)]
        job: PathBuf,

        /// Dataset as `{ "columns": [...], "rows": [[...], ...] }`
        #[arg(long)]
        data: PathBuf,

        #[arg(long, value_enum, default_value_t = StrategyArg::Rp)]
        strategy: StrategyArg,

        /// Output directory for result files (overrides the job config)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a synthetic dataset
    Synth {
        #[arg(long, default_value_t = 1000)]
        rows: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Snap values to this many bins per column
        #[arg(long)]
        bins: Option<usize>,

        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Ff,
    Rp,
    Both,
}

impl StrategyArg {
    fn strategies(self) -> Vec<Strategy> {
        match self {
            StrategyArg::Ff => vec![Strategy::FullFiltering],
            StrategyArg::Rp => vec![Strategy::RangePruning],
            StrategyArg::Both => vec![Strategy::FullFiltering, Strategy::RangePruning],
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Run {
            job,
            data,
            strategy,
            out,
        } => run(job, data, strategy, out),
        Command::Synth {
            rows,
            seed,
            bins,
            out,
        } => synth(rows, seed, bins, out),
    }
}

fn run(job_path: PathBuf, data_path: PathBuf, strategy: StrategyArg, out: Option<PathBuf>) -> Result<()> {
    let mut job: RepairJob = serde_json::from_str(
        &fs::read_to_string(&job_path).with_context(|| format!("reading {}", job_path.display()))?,
    )
    .with_context(|| format!("parsing job {}", job_path.display()))?;
    let dataset: Dataset = serde_json::from_str(
        &fs::read_to_string(&data_path).with_context(|| format!("reading {}", data_path.display()))?,
    )
    .with_context(|| format!("parsing dataset {}", data_path.display()))?;

    if let Some(dir) = out {
        job.config.output_dir = Some(dir);
    }
    if job.config.dataset_name == RepairConfig::default().dataset_name {
        if let Some(stem) = data_path.file_stem().and_then(|s| s.to_str()) {
            job.config.dataset_name = stem.to_string();
        }
    }
    if job.config.cache.enabled && job.config.cache.dir.is_none() {
        job.config.cache.dir = CacheConfig::from_env().dir;
    }

    let repair = QueryRepair::prepare(job, &dataset)?;
    for strategy in strategy.strategies() {
        let outcome = repair.run(strategy)?;
        print_outcome(&outcome);
        if let Some(path) = repair.write_report(&outcome)? {
            info!("Results written to {}", path.display());
        }
    }
    Ok(())
}

fn print_outcome(outcome: &RepairOutcome) {
    println!(
        "\n{} - {} results{}",
        outcome.strategy,
        outcome.results.len(),
        if outcome.complete { "" } else { " (timed out)" }
    );
    println!("{:>4}  {:>10}  refinement", "rank", "distance");
    for (rank, result) in outcome.results.iter().enumerate() {
        println!("{:>4}  {:>10.4}  {:?}", rank + 1, result.distance, result.values);
    }

    let info = &outcome.info;
    println!(
        "checked {} of {} refinements ({:.2}%), {} clusters visited, {:.3}s",
        info.refinements_checked, info.combinations, info.checked_pct, info.clusters_visited, info.elapsed
    );
    println!("cache: {} hits, {} misses", info.cache_hits, info.cache_misses);
}

fn synth(rows: usize, seed: u64, bins: Option<usize>, out: PathBuf) -> Result<()> {
    let mut config = SynthConfig::standard(rows, seed);
    config.bins = bins;
    let dataset = datagen::generate(&config)?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out, serde_json::to_string(&dataset)?).with_context(|| format!("writing {}", out.display()))?;
    info!("Wrote {} rows x {} columns to {}", dataset.len(), dataset.columns.len(), out.display());
    Ok(())
}
