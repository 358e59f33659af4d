//! Bound expressions `L <= core <= U` and the constraint set evaluator

use super::interval::Interval;
use super::lexer::{Lexer, Token, TokenKind};
use super::parser::{ExprNode, Parser};
use crate::error::{RepairError, Result};
use crate::index::NodeId;
use crate::stats::StatisticalTree;
use crate::types::Satisfaction;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundExpr {
    pub lower: f64,
    pub upper: f64,
    pub core: ExprNode,
    source: String,
}

impl BoundExpr {
    /// Parse `L <= core <= U`; the core is everything between the first
    /// and the last `<=`.
    pub fn parse(text: &str, aggregate_names: &[String]) -> Result<Self> {
        let tokens = Lexer::new(text).tokenize()?;
        let le: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TokenKind::Le)
            .map(|(i, _)| i)
            .collect();

        let (first, last) = match (le.first(), le.last()) {
            (Some(&first), Some(&last)) if first != last => (first, last),
            _ => {
                return Err(RepairError::Parse(format!(
                    "Bound '{}' is not of the form 'L <= expr <= U'",
                    text
                )))
            }
        };

        let lower = Self::literal(&tokens[..first], text)?;
        let upper = Self::literal(&tokens[last + 1..], text)?;
        if lower > upper {
            return Err(RepairError::Configuration(format!(
                "Bound '{}' has lower {} above upper {}",
                text, lower, upper
            )));
        }
        let core = Parser::new(&tokens[first + 1..last], aggregate_names).parse()?;

        Ok(Self {
            lower,
            upper,
            core,
            source: text.trim().to_string(),
        })
    }

    /// A signed numeric literal, optionally followed by `Eof`
    fn literal(tokens: &[Token], text: &str) -> Result<f64> {
        let kinds: Vec<&TokenKind> = tokens
            .iter()
            .map(|t| &t.kind)
            .filter(|k| **k != TokenKind::Eof)
            .collect();
        match kinds.as_slice() {
            [TokenKind::Number(v)] => Ok(*v),
            [TokenKind::Minus, TokenKind::Number(v)] => Ok(-*v),
            [TokenKind::Plus, TokenKind::Number(v)] => Ok(*v),
            _ => Err(RepairError::Parse(format!(
                "Bound '{}' needs numeric endpoints",
                text
            ))),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Width of the admissible band
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn check(&self, value: f64) -> bool {
        !value.is_nan() && self.lower <= value && value <= self.upper
    }
}

impl fmt::Display for BoundExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <= {} <= {}", self.lower, self.core, self.upper)
    }
}

/// Evaluated value of each bound expression of one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum Evaluation {
    Exact(Vec<f64>),
    Interval(Vec<Interval>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintOutcome {
    pub satisfaction: Satisfaction,
    pub evaluation: Evaluation,
}

/// All bound expressions of a run; a refinement qualifies only when every
/// one of them holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSet {
    bounds: Vec<BoundExpr>,
}

impl ConstraintSet {
    pub fn parse<S: AsRef<str>>(texts: &[S], aggregate_names: &[String]) -> Result<Self> {
        if texts.is_empty() {
            return Err(RepairError::Configuration("No bound expression given".into()));
        }
        let bounds = texts
            .iter()
            .map(|t| BoundExpr::parse(t.as_ref(), aggregate_names))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bounds })
    }

    pub fn bounds(&self) -> &[BoundExpr] {
        &self.bounds
    }

    /// Narrowest admissible band across expressions
    pub fn width(&self) -> f64 {
        self.bounds
            .iter()
            .map(BoundExpr::width)
            .fold(f64::INFINITY, f64::min)
    }

    /// Point evaluation: sums aggregates over `Full` clusters only.
    /// An empty selection never qualifies.
    pub fn evaluate_exact(&self, stats: &StatisticalTree, full: &[NodeId]) -> ConstraintOutcome {
        let mut sums = vec![0.0; stats.aggregate_names().len()];
        for &id in full {
            for (sum, v) in sums.iter_mut().zip(&stats.record(id).aggregates) {
                *sum += v;
            }
        }

        let values: Vec<f64> = self.bounds.iter().map(|b| b.core.eval(&sums)).collect();
        let satisfied = !full.is_empty() && self.bounds.iter().zip(&values).all(|(b, v)| b.check(*v));

        ConstraintOutcome {
            satisfaction: if satisfied { Satisfaction::Full } else { Satisfaction::None },
            evaluation: Evaluation::Exact(values),
        }
    }

    /// Range evaluation: `Full` clusters widen both ends of each aggregate's
    /// interval, `Partial` clusters only the upper end.
    pub fn evaluate_interval(
        &self,
        stats: &StatisticalTree,
        full: &[NodeId],
        partial: &[NodeId],
    ) -> ConstraintOutcome {
        let mut sums = vec![Interval::ZERO; stats.aggregate_names().len()];
        for &id in full {
            for (sum, v) in sums.iter_mut().zip(&stats.record(id).aggregates) {
                sum.lower += v;
                sum.upper += v;
            }
        }
        for &id in partial {
            for (sum, v) in sums.iter_mut().zip(&stats.record(id).aggregates) {
                sum.upper += v;
            }
        }

        let values: Vec<Interval> = self.bounds.iter().map(|b| b.core.eval_interval(&sums)).collect();
        let satisfaction = if full.is_empty() && partial.is_empty() {
            Satisfaction::None
        } else {
            let combined = self
                .bounds
                .iter()
                .zip(&values)
                .fold(Satisfaction::Full, |acc, (b, v)| acc.and(v.classify(b.lower, b.upper)));
            // without a certain cluster some refinement may select nothing
            if combined == Satisfaction::Full && full.is_empty() {
                Satisfaction::Partial
            } else {
                combined
            }
        };

        ConstraintOutcome {
            satisfaction,
            evaluation: Evaluation::Interval(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ClusterTree;
    use crate::stats::AggregateExpr;
    use crate::types::TupleSet;
    use std::sync::Arc;

    fn names() -> Vec<String> {
        vec!["agg1".into(), "agg2".into()]
    }

    fn stats() -> StatisticalTree {
        let rows = (1..=6).map(|x| vec![x as f64, x as f64]).collect();
        let tuples = TupleSet::new(vec!["x".into()], vec!["x".into()], rows).unwrap();
        let cols = tuples.constraint_columns().to_vec();
        let aggs = vec![
            AggregateExpr::parse("agg1", r#"count("x > 3")"#, &cols).unwrap(),
            AggregateExpr::parse("agg2", r#"count("*")"#, &cols).unwrap(),
        ];
        let tree = Arc::new(ClusterTree::build(&tuples, 10, 2));
        StatisticalTree::build(tree, &tuples, &aggs, 1).unwrap()
    }

    #[test]
    fn test_parse_bound() {
        let b = BoundExpr::parse("0.4 <= agg1 / agg2 <= 0.6", &names()).unwrap();
        assert_eq!(b.lower, 0.4);
        assert_eq!(b.upper, 0.6);
        assert_eq!(b.core.to_string(), "(agg1 / agg2)");

        let b = BoundExpr::parse("-1 <= agg1 - agg2 <= 1", &names()).unwrap();
        assert_eq!(b.lower, -1.0);
        assert!(b.check(0.0) && !b.check(f64::NAN));
    }

    #[test]
    fn test_parse_bound_errors() {
        assert!(BoundExpr::parse("agg1 / agg2 <= 0.6", &names()).is_err());
        assert!(BoundExpr::parse("0.4 <= agg1 <= agg2", &names()).is_err());
        assert!(BoundExpr::parse("0.6 <= agg1 <= 0.4", &names()).is_err());
        assert!(BoundExpr::parse("0 <= agg7 <= 1", &names()).unwrap_err().is_fatal_config());
        assert!(ConstraintSet::parse::<&str>(&[], &names()).is_err());
    }

    #[test]
    fn test_evaluate_exact() {
        let stats = stats();
        let set = ConstraintSet::parse(&["0.4 <= agg1 / agg2 <= 0.6"], &names()).unwrap();

        // singletons of x = 1..6 are nodes 1..=6; x >= 2 selects 2..6 -> 3/5
        let out = set.evaluate_exact(&stats, &[2, 3, 4, 5, 6]);
        assert_eq!(out.satisfaction, Satisfaction::Full);
        assert_eq!(out.evaluation, Evaluation::Exact(vec![0.6]));

        let out = set.evaluate_exact(&stats, &[5, 6]);
        assert_eq!(out.satisfaction, Satisfaction::None);

        let out = set.evaluate_exact(&stats, &[]);
        assert_eq!(out.satisfaction, Satisfaction::None);
    }

    #[test]
    fn test_evaluate_interval() {
        let stats = stats();
        let set = ConstraintSet::parse(&["0.4 <= agg1 / agg2 <= 0.6"], &names()).unwrap();

        // certain: {4, 5}; possible: {3}
        let out = set.evaluate_interval(&stats, &[4, 5], &[3]);
        match out.evaluation {
            Evaluation::Interval(ref v) => assert_eq!(v[0], Interval::new(2.0 / 3.0, 1.0)),
            _ => panic!("expected interval"),
        }
        assert_eq!(out.satisfaction, Satisfaction::None);

        // certain: {2..6}; possible: {1}  ->  [3/6, 3/5]
        let out = set.evaluate_interval(&stats, &[2, 3, 4, 5, 6], &[1]);
        assert_eq!(out.satisfaction, Satisfaction::Full);

        // certain: {5, 6}; possible: {3, 4}  ->  [2/4, 3/2]
        let out = set.evaluate_interval(&stats, &[5, 6], &[3, 4]);
        assert_eq!(out.satisfaction, Satisfaction::Partial);

        let two = ConstraintSet::parse(&["0.4 <= agg1 / agg2 <= 0.6", "0 <= agg2 <= 3"], &names()).unwrap();
        let out = two.evaluate_interval(&stats, &[2, 3, 4, 5, 6], &[1]);
        assert_eq!(out.satisfaction, Satisfaction::None);
        assert!((two.width() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_interval_without_certain_clusters_is_never_full() {
        let stats = stats();
        let set = ConstraintSet::parse(&["0 <= agg1 <= 10"], &names()).unwrap();
        let out = set.evaluate_interval(&stats, &[], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(out.satisfaction, Satisfaction::Partial);
        assert_eq!(set.evaluate_interval(&stats, &[], &[]).satisfaction, Satisfaction::None);
    }
}
