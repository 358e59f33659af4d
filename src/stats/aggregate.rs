//! Named aggregate expressions
//!
//! Accepted forms, parsed once into [`AggregateExpr`]:
//!
//! ```text
//! count("condition")            rows matching the condition
//! sum("condition", "column")    column total over matching rows
//! mean("column")                column mean over all rows
//! count("*")                    all rows
//! ```
//!
//! A condition is a chain of `column <op> number` comparisons joined by
//! `and` / `or`, folded strictly left to right into a running row mask.

use crate::error::{RepairError, Result};
use crate::types::{CompareOp, TupleSet};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Count,
    Sum,
    Mean,
    Min,
    Max,
}

impl AggFunc {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(AggFunc::Count),
            "sum" => Ok(AggFunc::Sum),
            "mean" | "avg" => Ok(AggFunc::Mean),
            "min" => Ok(AggFunc::Min),
            "max" => Ok(AggFunc::Max),
            other => Err(RepairError::UnknownFunction(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connective {
    And,
    Or,
}

/// `column <op> value`, with the column resolved to a constraint index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub column: usize,
    pub op: CompareOp,
    pub value: f64,
}

impl Comparison {
    #[inline]
    fn test(&self, row: &[f64]) -> bool {
        self.op.apply(row[self.column], self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub first: Comparison,
    pub rest: Vec<(Connective, Comparison)>,
}

impl Condition {
    // Longer symbols first so ">=" is not read as ">"
    const OPERATORS: [&'static str; 6] = ["==", ">=", "<=", "!=", ">", "<"];

    pub fn parse(text: &str, columns: &[String]) -> Result<Self> {
        let mut parts: Vec<(Option<Connective>, String)> = vec![(None, String::new())];
        for word in text.split_whitespace() {
            let connective = match word.to_ascii_lowercase().as_str() {
                "and" => Some(Connective::And),
                "or" => Some(Connective::Or),
                _ => None,
            };
            match connective {
                Some(c) => parts.push((Some(c), String::new())),
                None => {
                    if let Some((_, current)) = parts.last_mut() {
                        current.push_str(word);
                    }
                }
            }
        }

        let mut comparisons = parts
            .into_iter()
            .map(|(conn, text)| Self::parse_comparison(&text, columns).map(|cmp| (conn, cmp)));

        let first = match comparisons.next() {
            Some(first) => first?.1,
            None => return Err(RepairError::Parse("empty condition".into())),
        };
        let mut rest = Vec::new();
        for item in comparisons {
            let (conn, cmp) = item?;
            rest.push((conn.unwrap_or(Connective::And), cmp));
        }
        Ok(Self { first, rest })
    }

    fn parse_comparison(text: &str, columns: &[String]) -> Result<Comparison> {
        for symbol in Self::OPERATORS {
            if let Some(pos) = text.find(symbol) {
                let column = text[..pos].trim();
                let value = text[pos + symbol.len()..].trim();
                let column = columns
                    .iter()
                    .position(|c| c == column)
                    .ok_or_else(|| RepairError::ColumnNotFound(column.to_string()))?;
                let value: f64 = value
                    .parse()
                    .map_err(|_| RepairError::Parse(format!("invalid number '{}' in condition '{}'", value, text)))?;
                return Ok(Comparison {
                    column,
                    op: CompareOp::parse(symbol)?,
                    value,
                });
            }
        }
        Err(RepairError::Parse(format!("no comparison operator in '{}'", text)))
    }

    /// Left-to-right fold: `and` intersects, `or` unions.
    pub fn test(&self, row: &[f64]) -> bool {
        let mut mask = self.first.test(row);
        for (conn, cmp) in &self.rest {
            mask = match conn {
                Connective::And => mask && cmp.test(row),
                Connective::Or => mask || cmp.test(row),
            };
        }
        mask
    }
}

/// A parsed `func(...)` aggregate bound to constraint column indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateExpr {
    pub name: String,
    pub func: AggFunc,
    /// None = every row
    pub condition: Option<Condition>,
    /// Column aggregated by sum/mean/min/max
    pub column: Option<usize>,
    source: String,
}

impl AggregateExpr {
    pub fn parse(name: &str, text: &str, columns: &[String]) -> Result<Self> {
        let text = text.trim();
        let (func, args) = text
            .split_once('(')
            .ok_or_else(|| RepairError::Parse(format!("aggregate '{}' is not of the form func(...)", text)))?;
        let args = args
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| RepairError::Parse(format!("aggregate '{}' is missing ')'", text)))?;

        let func = AggFunc::parse(func)?;
        let args: Vec<String> = args
            .split(',')
            .map(|a| a.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string())
            .collect();

        let resolve = |col: &str| {
            columns
                .iter()
                .position(|c| c == col)
                .ok_or_else(|| RepairError::ColumnNotFound(col.to_string()))
        };

        let (condition, column) = match args.as_slice() {
            [single] if single.is_empty() || single == "*" => (None, None),
            [single] if columns.iter().any(|c| c == single) => (None, Some(resolve(single)?)),
            [single] => (Some(Condition::parse(single, columns)?), None),
            [cond, col] => (Some(Condition::parse(cond, columns)?), Some(resolve(col)?)),
            _ => {
                return Err(RepairError::Parse(format!(
                    "aggregate '{}' takes one or two arguments",
                    text
                )))
            }
        };

        if func != AggFunc::Count && column.is_none() {
            return Err(RepairError::Configuration(format!(
                "{} in '{}' needs a column argument",
                func.name(),
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            func,
            condition,
            column,
            source: text.to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate over the given tuple indices. Empty selections give 0.
    pub fn evaluate(&self, tuples: &TupleSet, members: &[u32]) -> f64 {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for &idx in members {
            let row = tuples.constraint_values(idx as usize);
            if let Some(cond) = &self.condition {
                if !cond.test(row) {
                    continue;
                }
            }
            count += 1;
            if let Some(col) = self.column {
                let v = row[col];
                sum += v;
                min = min.min(v);
                max = max.max(v);
            }
        }

        if count == 0 {
            return 0.0;
        }
        match self.func {
            AggFunc::Count => count as f64,
            AggFunc::Sum => sum,
            AggFunc::Mean => sum / count as f64,
            AggFunc::Min => min,
            AggFunc::Max => max,
        }
    }
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.source)
    }
}
