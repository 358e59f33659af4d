//! Seeded synthetic integer datasets for experiments, benches and tests

use crate::error::{RepairError, Result};
use crate::types::Dataset;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Uniform,
    /// Centered on the midpoint, six standard deviations across `[low, high]`
    Normal,
    /// Starts at `low`, mean at one fifth of the span
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    pub distribution: Distribution,
    pub low: i64,
    pub high: i64,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, distribution: Distribution, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            distribution,
            low,
            high,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    pub rows: usize,
    pub seed: u64,
    pub attributes: Vec<AttributeSpec>,
    /// Snap values to the centers of this many equal bins
    #[serde(default)]
    pub bins: Option<usize>,
}

impl SynthConfig {
    /// Two predicate-style columns and two constraint-style columns
    pub fn standard(rows: usize, seed: u64) -> Self {
        Self {
            rows,
            seed,
            attributes: vec![
                AttributeSpec::new("age", Distribution::Normal, 18, 90),
                AttributeSpec::new("hours", Distribution::Uniform, 1, 99),
                AttributeSpec::new("sex", Distribution::Uniform, 0, 1),
                AttributeSpec::new("income", Distribution::Exponential, 0, 200),
            ],
            bins: None,
        }
    }
}

/// Generate the dataset described by `config`; equal configs give equal data.
pub fn generate(config: &SynthConfig) -> Result<Dataset> {
    for attr in &config.attributes {
        if attr.low > attr.high {
            return Err(RepairError::Configuration(format!(
                "Attribute '{}' has low {} above high {}",
                attr.name, attr.low, attr.high
            )));
        }
    }
    if config.bins == Some(0) {
        return Err(RepairError::Configuration("bins must be at least 1".into()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let rows = (0..config.rows)
        .map(|_| {
            config
                .attributes
                .iter()
                .map(|attr| sample(&mut rng, attr, config.bins))
                .collect()
        })
        .collect();

    Dataset::new(config.attributes.iter().map(|a| a.name.clone()).collect(), rows)
}

fn sample(rng: &mut StdRng, attr: &AttributeSpec, bins: Option<usize>) -> f64 {
    let low = attr.low as f64;
    let high = attr.high as f64;
    let span = high - low;

    let raw = match attr.distribution {
        // +1 so the top value is reachable after flooring
        Distribution::Uniform => low + rng.gen::<f64>() * (span + 1.0) - 0.5,
        Distribution::Normal => (low + high) / 2.0 + standard_normal(rng) * span / 6.0,
        Distribution::Exponential => low - (1.0 - rng.gen::<f64>()).ln() * span / 5.0,
    };
    let value = raw.clamp(low, high);

    match bins {
        Some(bins) if span > 0.0 => {
            let width = span / bins as f64;
            let idx = (((value - low) / width) as usize).min(bins - 1);
            (low + width * (idx as f64 + 0.5)).trunc()
        }
        _ => value.round().clamp(low, high),
    }
}

/// Box-Muller transform
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = generate(&SynthConfig::standard(200, 7)).unwrap();
        let b = generate(&SynthConfig::standard(200, 7)).unwrap();
        let c = generate(&SynthConfig::standard(200, 8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 200);
    }

    #[test]
    fn test_values_in_bounds_and_integral() {
        let config = SynthConfig::standard(500, 1);
        let data = generate(&config).unwrap();
        for row in &data.rows {
            for (v, attr) in row.iter().zip(&config.attributes) {
                assert_eq!(v.fract(), 0.0);
                assert!(*v >= attr.low as f64 && *v <= attr.high as f64);
            }
        }
        // both sexes show up
        let sex = data.column_index("sex").unwrap();
        assert!(data.rows.iter().any(|r| r[sex] == 0.0));
        assert!(data.rows.iter().any(|r| r[sex] == 1.0));
    }

    #[test]
    fn test_bins() {
        let config = SynthConfig {
            rows: 300,
            seed: 3,
            attributes: vec![AttributeSpec::new("x", Distribution::Uniform, 0, 100)],
            bins: Some(4),
        };
        let data = generate(&config).unwrap();
        let mut distinct: Vec<f64> = data.rows.iter().map(|r| r[0]).collect();
        distinct.sort_by(|a, b| a.total_cmp(b));
        distinct.dedup();
        assert!(distinct.len() <= 4);
    }

    #[test]
    fn test_rejects_bad_specs() {
        let mut config = SynthConfig::standard(10, 0);
        config.attributes[0].low = 100;
        assert!(generate(&config).is_err());

        let mut config = SynthConfig::standard(10, 0);
        config.bins = Some(0);
        assert!(generate(&config).is_err());
    }
}
