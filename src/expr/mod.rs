//! Constraint evaluation
//!
//! Bound expressions such as `0.4 <= agg1 / agg2 <= 0.6` are tokenized,
//! parsed once into an expression tree over aggregate slots, and then
//! evaluated per region either exactly (points) or with interval
//! arithmetic (ranges).

pub mod bound;
pub mod interval;
pub mod lexer;
pub mod parser;

pub use bound::{BoundExpr, ConstraintOutcome, ConstraintSet, Evaluation};
pub use interval::Interval;
pub use parser::{BinaryOp, ExprNode};
