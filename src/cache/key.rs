//! Deterministic cache keys for membership lookups

use crate::types::{CompareOp, ValueRange};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Bump when the keyed representation changes
const KEY_VERSION: u32 = 2;

/// Everything besides the region that decides a membership lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheScope {
    pub dataset: String,
    pub size: usize,
    pub bucket: usize,
    pub branch: usize,
    /// Predicate columns, in predicate order
    pub columns: Vec<String>,
    pub operators: Vec<CompareOp>,
    /// Content hash of the predicate values, see `TupleSet::fingerprint`
    pub fingerprint: String,
}

#[derive(Serialize)]
struct KeyPayload<'a> {
    dataset: &'a str,
    size: usize,
    bucket: usize,
    branch: usize,
    columns: &'a [String],
    operators: Vec<&'static str>,
    fingerprint: &'a str,
    ranges: Vec<[f64; 2]>,
    version: u32,
}

impl CacheScope {
    /// Hex SHA-256 of the scope plus region ranges
    pub fn key(&self, region: &[ValueRange]) -> String {
        let payload = KeyPayload {
            dataset: &self.dataset,
            size: self.size,
            bucket: self.bucket,
            branch: self.branch,
            columns: &self.columns,
            operators: self.operators.iter().map(CompareOp::symbol).collect(),
            fingerprint: &self.fingerprint,
            ranges: region.iter().map(|r| [r.lo, r.hi]).collect(),
            version: KEY_VERSION,
        };
        // Serializing plain structs of strings and numbers cannot fail
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        hex::encode(Sha256::digest(&json))
    }
}
