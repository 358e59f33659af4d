mod common;

use common::{ranked, share_job, small_dataset, toy_job};
use qrepair::{
    CacheConfig, CompareOp, Dataset, DistanceMetric, PredicateSpec, QueryRepair, RangeStrategy, RepairConfig,
    RepairJob, Strategy,
};
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const OPERATOR_PAIRS: [(CompareOp, CompareOp); 5] = [
    (CompareOp::Ge, CompareOp::Le),
    (CompareOp::Gt, CompareOp::Lt),
    (CompareOp::Eq, CompareOp::Ge),
    (CompareOp::Ne, CompareOp::Le),
    (CompareOp::Ne, CompareOp::Ne),
];

/// Exhaustive reference: every combination of observed values, evaluated
/// directly on the rows.
fn brute_force(job: &RepairJob, data: &Dataset) -> Vec<(Vec<f64>, f64)> {
    let a = data.column_index("a").unwrap();
    let b = data.column_index("b").unwrap();
    let sex = data.column_index("sex").unwrap();
    let (op_a, op_b) = (job.predicates[0].op, job.predicates[1].op);
    let (origin_a, origin_b) = (job.predicates[0].value, job.predicates[1].value);

    let distinct = |col: usize| {
        let mut v: Vec<f64> = data.rows.iter().map(|r| r[col]).collect();
        v.sort_by(|x, y| x.total_cmp(y));
        v.dedup();
        v
    };

    let mut found = Vec::new();
    for &va in &distinct(a) {
        for &vb in &distinct(b) {
            let selected: Vec<&Vec<f64>> = data
                .rows
                .iter()
                .filter(|r| op_a.apply(r[a], va) && op_b.apply(r[b], vb))
                .collect();
            let total = selected.len() as f64;
            let female = selected.iter().filter(|r| r[sex] == 0.0).count() as f64;
            if total == 0.0 {
                continue;
            }
            let share = female / total;
            if (0.45..=0.55).contains(&share) && (10.0..=1000.0).contains(&total) {
                let distance = (va - origin_a).abs() + (vb - origin_b).abs();
                found.push((vec![va, vb], distance));
            }
        }
    }

    found.sort_by(|x, y| {
        x.1.total_cmp(&y.1)
            .then_with(|| x.0[0].total_cmp(&y.0[0]))
            .then_with(|| x.0[1].total_cmp(&y.0[1]))
    });
    found.truncate(job.config.top_k);
    found
}

#[test]
fn test_toy_scenario_both_strategies() {
    let (job, data) = toy_job(2);
    let repair = QueryRepair::prepare(job, &data).unwrap();
    assert_eq!(repair.universe().combinations(), 6);

    for strategy in [Strategy::FullFiltering, Strategy::RangePruning] {
        let outcome = repair.run(strategy).unwrap();
        assert_eq!(ranked(&outcome.results), vec![(vec![2.0], 2.0), (vec![1.0], 3.0)]);
        assert!(outcome.complete);
    }
}

#[test]
fn test_short_result_list_is_not_an_error() {
    let (job, data) = toy_job(5);
    let repair = QueryRepair::prepare(job, &data).unwrap();
    let outcome = repair.run(Strategy::RangePruning).unwrap();
    // only x = 1 and x = 2 give a share inside [0.4, 0.6]
    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.complete);
}

#[test]
fn test_full_filtering_matches_brute_force() {
    let data = small_dataset(150, 11);
    assert!(!brute_force(&share_job(OPERATOR_PAIRS[0], 5), &data).is_empty());

    for ops in OPERATOR_PAIRS {
        let job = share_job(ops, 5);
        let expected = brute_force(&job, &data);

        let repair = QueryRepair::prepare(job, &data).unwrap();
        let ff = repair.run(Strategy::FullFiltering).unwrap();
        assert_eq!(ranked(&ff.results), expected, "{:?}", ops);
    }
}

#[test]
fn test_range_pruning_matches_brute_force() {
    let data = small_dataset(150, 11);
    let strategies = [
        RangeStrategy::EqualWidth { ranges: 1 },
        RangeStrategy::EqualWidth { ranges: 3 },
        RangeStrategy::EqualWidth { ranges: 7 },
        RangeStrategy::Iqr,
    ];

    for ops in OPERATOR_PAIRS {
        let expected = brute_force(&share_job(ops, 5), &data);
        for range_strategy in strategies {
            let mut job = share_job(ops, 5);
            job.config = job.config.with_range_strategy(range_strategy);

            let repair = QueryRepair::prepare(job, &data).unwrap();
            let rp = repair.run(Strategy::RangePruning).unwrap();
            assert_eq!(ranked(&rp.results), expected, "{:?} {:?}", ops, range_strategy);
        }
    }
}

#[test]
fn test_strategies_agree_under_normalized_distance() {
    let data = small_dataset(120, 5);
    let mut job = share_job((CompareOp::Ge, CompareOp::Le), 4);
    job.config = job.config.with_distance_metric(DistanceMetric::Normalized);

    let repair = QueryRepair::prepare(job, &data).unwrap();
    let ff = repair.run(Strategy::FullFiltering).unwrap();
    let rp = repair.run(Strategy::RangePruning).unwrap();
    assert_eq!(ranked(&ff.results), ranked(&rp.results));
}

#[test]
fn test_repeated_runs_are_identical() {
    let data = small_dataset(150, 23);
    for strategy in [Strategy::FullFiltering, Strategy::RangePruning] {
        let first = QueryRepair::prepare(share_job((CompareOp::Ge, CompareOp::Le), 5), &data)
            .unwrap()
            .run(strategy)
            .unwrap();
        let second = QueryRepair::prepare(share_job((CompareOp::Ge, CompareOp::Le), 5), &data)
            .unwrap()
            .run(strategy)
            .unwrap();
        assert_eq!(first.results, second.results);
        assert_eq!(first.metrics.refinements_checked, second.metrics.refinements_checked);
    }
}

#[test]
fn test_strategies_share_one_universe() {
    let data = small_dataset(200, 3);
    let repair = QueryRepair::prepare(share_job((CompareOp::Ge, CompareOp::Le), 3), &data).unwrap();
    let ff = repair.run(Strategy::FullFiltering).unwrap();
    let rp = repair.run(Strategy::RangePruning).unwrap();

    assert_eq!(ranked(&ff.results), ranked(&rp.results));
    assert!(ff.info.checked_pct <= 100.0);
    assert_eq!(ff.info.combinations, rp.info.combinations);
}

#[test]
fn test_range_pruning_terminates_on_adjacent_floats() {
    let lo = 1.0 + f64::EPSILON;
    let hi = 1.0 + 2.0 * f64::EPSILON;
    let data = Dataset::new(vec!["x".into()], vec![vec![lo], vec![hi]]).unwrap();

    let mut aggregations = BTreeMap::new();
    aggregations.insert("upper".to_string(), format!(r#"count("x > {}")"#, lo));
    aggregations.insert("total".to_string(), r#"count("*")"#.to_string());
    let job = RepairJob {
        predicates: vec![PredicateSpec::numerical("x", CompareOp::Ge, lo)],
        constraint_columns: vec!["x".into()],
        aggregations,
        constraints: vec!["0.9 <= upper / total <= 1".into()],
        config: RepairConfig::for_testing()
            .with_top_k(2)
            .with_range_strategy(RangeStrategy::EqualWidth { ranges: 1 })
            .with_cache(CacheConfig::disabled()),
    };

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let repair = QueryRepair::prepare(job, &data).unwrap();
        let ff = repair.run(Strategy::FullFiltering).unwrap();
        let rp = repair.run(Strategy::RangePruning).unwrap();
        let _ = tx.send((ranked(&ff.results), ranked(&rp.results)));
    });

    let (ff, rp) = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("range pruning did not finish");
    assert_eq!(ff, vec![(vec![hi], hi - lo)]);
    assert_eq!(rp, ff);
}
