//! Core data model shared by every stage of the repair pipeline

mod predicate;
mod range;
mod tuple;

pub use predicate::{CompareOp, PredicateKind, PredicateSpec};
pub use range::ValueRange;
pub use tuple::{Dataset, Tuple, TupleSet};

use serde::{Deserialize, Serialize};

/// Three-way classification used for both cluster boxes and constraint results.
///
/// - `Full`: every concrete choice inside the region qualifies
/// - `Partial`: some choices may qualify
/// - `None`: no choice can qualify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Satisfaction {
    Full,
    Partial,
    None,
}

impl Satisfaction {
    /// Combine two classifications of independent conjuncts.
    pub fn and(self, other: Satisfaction) -> Satisfaction {
        match (self, other) {
            (Satisfaction::None, _) | (_, Satisfaction::None) => Satisfaction::None,
            (Satisfaction::Full, Satisfaction::Full) => Satisfaction::Full,
            _ => Satisfaction::Partial,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Satisfaction::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satisfaction_and() {
        assert_eq!(Satisfaction::Full.and(Satisfaction::Full), Satisfaction::Full);
        assert_eq!(Satisfaction::Full.and(Satisfaction::Partial), Satisfaction::Partial);
        assert_eq!(Satisfaction::Partial.and(Satisfaction::None), Satisfaction::None);
        assert_eq!(Satisfaction::None.and(Satisfaction::Full), Satisfaction::None);
    }
}
