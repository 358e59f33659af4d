//! Tuple storage: named datasets and the projected tuple set the engine reads

use super::PredicateSpec;
use crate::error::{RepairError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A fixed-length numeric row
pub type Tuple = Vec<f64>;

/// Named tabular data as handed over by the loading layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Tuple>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Tuple>) -> Result<Self> {
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(RepairError::Data(format!(
                "Row {} has {} values, expected {}",
                idx,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| RepairError::ColumnNotFound(name.to_string()))
    }

    /// Build the engine's tuple layout: predicate columns first (in predicate
    /// order), then the constraint columns. A column may appear in both parts.
    pub fn project(&self, predicates: &[PredicateSpec], constraint_columns: &[String]) -> Result<TupleSet> {
        let mut indices = Vec::with_capacity(predicates.len() + constraint_columns.len());
        for pred in predicates {
            indices.push(self.column_index(&pred.column)?);
        }
        for col in constraint_columns {
            indices.push(self.column_index(col)?);
        }

        // rows may come straight from serde, so widths are checked here too
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                if row.len() != self.columns.len() {
                    return Err(RepairError::Data(format!(
                        "Row {} has {} values, expected {}",
                        idx,
                        row.len(),
                        self.columns.len()
                    )));
                }
                Ok(indices.iter().map(|&i| row[i]).collect())
            })
            .collect::<Result<Vec<Tuple>>>()?;

        TupleSet::new(
            predicates.iter().map(|p| p.column.clone()).collect(),
            constraint_columns.to_vec(),
            rows,
        )
    }
}

/// Immutable tuple set: the first `P` fields of every tuple are predicate
/// dimensions, the remaining fields are constraint dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupleSet {
    predicate_columns: Vec<String>,
    constraint_columns: Vec<String>,
    rows: Vec<Tuple>,
}

impl TupleSet {
    pub fn new(predicate_columns: Vec<String>, constraint_columns: Vec<String>, rows: Vec<Tuple>) -> Result<Self> {
        let width = predicate_columns.len() + constraint_columns.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(RepairError::Data(format!(
                "Tuple {} has {} fields, expected {}",
                idx,
                row.len(),
                width
            )));
        }
        if let Some(idx) = rows.iter().position(|r| r.iter().any(|v| v.is_nan())) {
            return Err(RepairError::Data(format!("Tuple {} contains NaN", idx)));
        }
        Ok(Self {
            predicate_columns,
            constraint_columns,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of predicate dimensions `P`
    pub fn predicate_dims(&self) -> usize {
        self.predicate_columns.len()
    }

    pub fn predicate_columns(&self) -> &[String] {
        &self.predicate_columns
    }

    pub fn constraint_columns(&self) -> &[String] {
        &self.constraint_columns
    }

    pub fn rows(&self) -> &[Tuple] {
        &self.rows
    }

    #[inline]
    pub fn predicate_values(&self, idx: usize) -> &[f64] {
        &self.rows[idx][..self.predicate_columns.len()]
    }

    #[inline]
    pub fn constraint_values(&self, idx: usize) -> &[f64] {
        &self.rows[idx][self.predicate_columns.len()..]
    }

    /// Distinct values of one predicate dimension, ascending
    pub fn distinct_values(&self, dim: usize) -> Vec<f64> {
        let mut values: Vec<f64> = self.rows.iter().map(|r| r[dim]).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        values
    }

    /// Hex SHA-256 over the predicate columns and their values in row
    /// order. Two tuple sets with the same fingerprint build the same tree.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for column in &self.predicate_columns {
            hasher.update(column.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update((self.rows.len() as u64).to_le_bytes());
        for idx in 0..self.rows.len() {
            for value in self.predicate_values(idx) {
                hasher.update(value.to_bits().to_le_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}
