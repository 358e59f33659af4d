#![allow(dead_code)]

use qrepair::datagen::{self, AttributeSpec, Distribution, SynthConfig};
use qrepair::{CacheConfig, CompareOp, Dataset, PredicateSpec, RepairConfig, RepairJob};
use std::collections::BTreeMap;

/// Six tuples `x = 1..=6`, query `x >= 4`, share of `x > 3` within [0.4, 0.6]
pub fn toy_job(top_k: usize) -> (RepairJob, Dataset) {
    let mut aggregations = BTreeMap::new();
    aggregations.insert("agg1".to_string(), r#"count("x > 3")"#.to_string());
    aggregations.insert("agg2".to_string(), r#"count("*")"#.to_string());

    let job = RepairJob {
        predicates: vec![PredicateSpec::numerical("x", CompareOp::Ge, 4.0)],
        constraint_columns: vec!["x".into()],
        aggregations,
        constraints: vec!["0.4 <= agg1 / agg2 <= 0.6".into()],
        config: RepairConfig::for_testing()
            .with_bucket_size(2)
            .with_top_k(top_k)
            .with_dataset("toy", None)
            .with_cache(CacheConfig::disabled()),
    };
    let data = Dataset::new(vec!["x".into()], (1..=6).map(|x| vec![x as f64]).collect()).unwrap();
    (job, data)
}

/// Two small integer predicate columns and a binary group column
pub fn small_dataset(rows: usize, seed: u64) -> Dataset {
    datagen::generate(&SynthConfig {
        rows,
        seed,
        attributes: vec![
            AttributeSpec::new("a", Distribution::Uniform, 0, 15),
            AttributeSpec::new("b", Distribution::Normal, 0, 15),
            AttributeSpec::new("sex", Distribution::Uniform, 0, 1),
        ],
        bins: None,
    })
    .unwrap()
}

/// Balanced-share job over [`small_dataset`]
pub fn share_job(ops: (CompareOp, CompareOp), top_k: usize) -> RepairJob {
    let mut aggregations = BTreeMap::new();
    aggregations.insert("female".to_string(), r#"count("sex == 0")"#.to_string());
    aggregations.insert("total".to_string(), r#"count("*")"#.to_string());

    RepairJob {
        predicates: vec![
            PredicateSpec::numerical("a", ops.0, 8.0),
            PredicateSpec::numerical("b", ops.1, 6.0),
        ],
        constraint_columns: vec!["sex".into()],
        aggregations,
        constraints: vec![
            "0.45 <= female / total <= 0.55".into(),
            "10 <= total <= 1000".into(),
        ],
        config: RepairConfig::for_testing()
            .with_top_k(top_k)
            .with_dataset("small", None)
            .with_cache(CacheConfig::disabled()),
    }
}

/// `(values, distance)` pairs, the part of a result both strategies agree on
pub fn ranked(results: &[qrepair::RepairResult]) -> Vec<(Vec<f64>, f64)> {
    results.iter().map(|r| (r.values.clone(), r.distance)).collect()
}
