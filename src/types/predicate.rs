//! Query predicates and comparison operators

use crate::error::{RepairError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a selection predicate or an aggregate condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==", alias = "=")]
    Eq,
    #[serde(rename = "!=", alias = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    /// Parse an operator symbol
    pub fn parse(symbol: &str) -> Result<Self> {
        match symbol.trim() {
            "==" | "=" => Ok(CompareOp::Eq),
            "!=" | "<>" => Ok(CompareOp::Ne),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Le),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Ge),
            other => Err(RepairError::Configuration(format!(
                "Unsupported operator: {}", other
            ))),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Apply `lhs <op> rhs`
    #[inline]
    pub fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Kind of predicate column.
///
/// Categorical codes are compared with the same `|a - b|` metric as numbers,
/// so they only make sense when encoded ordinally upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PredicateKind {
    #[default]
    #[serde(alias = "numeric")]
    Numerical,
    Categorical,
}

/// One predicate of the user's selection query: `column <op> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateSpec {
    #[serde(alias = "field")]
    pub column: String,

    #[serde(rename = "operator", alias = "op")]
    pub op: CompareOp,

    pub value: f64,

    #[serde(default, rename = "type", alias = "kind")]
    pub kind: PredicateKind,
}

impl PredicateSpec {
    pub fn new(column: impl Into<String>, op: CompareOp, value: f64, kind: PredicateKind) -> Self {
        Self {
            column: column.into(),
            op,
            value,
            kind,
        }
    }

    pub fn numerical(column: impl Into<String>, op: CompareOp, value: f64) -> Self {
        Self::new(column, op, value, PredicateKind::Numerical)
    }

    pub fn categorical(column: impl Into<String>, op: CompareOp, value: f64) -> Self {
        Self::new(column, op, value, PredicateKind::Categorical)
    }

    /// Reject specs that cannot drive a search
    pub fn validate(&self) -> Result<()> {
        if self.column.trim().is_empty() {
            return Err(RepairError::Configuration(
                "Predicate column name is empty".to_string(),
            ));
        }
        if !self.value.is_finite() {
            return Err(RepairError::Configuration(format!(
                "Predicate on '{}' has non-finite value {}",
                self.column, self.value
            )));
        }
        Ok(())
    }

    /// Does a tuple value satisfy this predicate for a refinement value?
    #[inline]
    pub fn matches(&self, tuple_value: f64, refinement_value: f64) -> bool {
        self.op.apply(tuple_value, refinement_value)
    }
}

impl fmt::Display for PredicateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.op, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parse() {
        assert_eq!(CompareOp::parse(">=").unwrap(), CompareOp::Ge);
        assert_eq!(CompareOp::parse("=").unwrap(), CompareOp::Eq);
        assert_eq!(CompareOp::parse(" <> ").unwrap(), CompareOp::Ne);
        assert!(CompareOp::parse("=>").is_err());
    }

    #[test]
    fn test_operator_apply() {
        assert!(CompareOp::Ge.apply(4.0, 4.0));
        assert!(!CompareOp::Gt.apply(4.0, 4.0));
        assert!(CompareOp::Ne.apply(1.0, 2.0));
    }

    #[test]
    fn test_predicate_json() {
        let json = r#"{"column": "age", "operator": ">=", "value": 30, "type": "numerical"}"#;
        let pred: PredicateSpec = serde_json::from_str(json).unwrap();
        assert_eq!(pred.op, CompareOp::Ge);
        assert_eq!(pred.kind, PredicateKind::Numerical);

        let json = r#"{"field": "sex", "op": "==", "value": 1, "type": "categorical"}"#;
        let pred: PredicateSpec = serde_json::from_str(json).unwrap();
        assert_eq!(pred.column, "sex");
        assert_eq!(pred.kind, PredicateKind::Categorical);
    }

    #[test]
    fn test_predicate_validate() {
        assert!(PredicateSpec::numerical("", CompareOp::Ge, 1.0).validate().is_err());
        assert!(PredicateSpec::numerical("x", CompareOp::Ge, f64::NAN).validate().is_err());
        assert!(PredicateSpec::numerical("x", CompareOp::Ge, 1.0).validate().is_ok());
    }
}
