//! Closed real intervals and the arithmetic the range evaluator runs on them

use crate::types::Satisfaction;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub const ZERO: Interval = Interval { lower: 0.0, upper: 0.0 };

    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn point(value: f64) -> Self {
        Self { lower: value, upper: value }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn add(self, rhs: Interval) -> Interval {
        Interval::new(self.lower + rhs.lower, self.upper + rhs.upper)
    }

    pub fn sub(self, rhs: Interval) -> Interval {
        Interval::new(self.lower - rhs.upper, self.upper - rhs.lower)
    }

    /// Endpoint product. Only sound for non-negative operands, which holds
    /// for count and sum aggregates over non-negative columns.
    pub fn mul(self, rhs: Interval) -> Interval {
        Interval::new(self.lower * rhs.lower, self.upper * rhs.upper)
    }

    /// Division with ratio-style fallbacks:
    /// - `[0, 0]` when the denominator is exactly zero
    /// - `[0, 1]` when the denominator straddles zero
    pub fn div(self, rhs: Interval) -> Interval {
        if rhs.lower == 0.0 && rhs.upper == 0.0 {
            Interval::ZERO
        } else if rhs.lower <= 0.0 && rhs.upper >= 0.0 {
            Interval::new(0.0, 1.0)
        } else {
            Interval::new(self.lower / rhs.upper, self.upper / rhs.lower)
        }
    }

    /// Classify against the bound `[lo, hi]`
    pub fn classify(&self, lo: f64, hi: f64) -> Satisfaction {
        if self.lower.is_nan() || self.upper.is_nan() {
            Satisfaction::None
        } else if lo <= self.lower && self.upper <= hi {
            Satisfaction::Full
        } else if self.upper < lo || self.lower > hi {
            Satisfaction::None
        } else {
            Satisfaction::Partial
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}
