//! Arithmetic expression trees over named aggregates
//!
//! Built with a two-stack (operand / operator) shunting-yard pass.
//! `*` and `/` bind tighter than `+` and `-`, equal precedence associates
//! left, and parentheses recurse into a fresh pair of stacks.

use super::interval::Interval;
use super::lexer::{Token, TokenKind};
use crate::error::{RepairError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn from_token(kind: &TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            _ => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }

    fn symbol(&self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }

    /// Exact arithmetic; division by zero yields 0
    #[inline]
    pub fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => {
                if rhs == 0.0 {
                    0.0
                } else {
                    lhs / rhs
                }
            }
        }
    }

    #[inline]
    pub fn apply_interval(&self, lhs: Interval, rhs: Interval) -> Interval {
        match self {
            BinaryOp::Add => lhs.add(rhs),
            BinaryOp::Sub => lhs.sub(rhs),
            BinaryOp::Mul => lhs.mul(rhs),
            BinaryOp::Div => lhs.div(rhs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprNode {
    Literal(f64),
    /// Named aggregate resolved to its slot in the statistical tree
    Aggregate { name: String, slot: usize },
    Binary {
        op: BinaryOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
}

impl ExprNode {
    /// Evaluate with one exact value per aggregate slot
    pub fn eval(&self, values: &[f64]) -> f64 {
        match self {
            ExprNode::Literal(v) => *v,
            ExprNode::Aggregate { slot, .. } => values[*slot],
            ExprNode::Binary { op, lhs, rhs } => op.apply(lhs.eval(values), rhs.eval(values)),
        }
    }

    /// Evaluate with one interval per aggregate slot
    pub fn eval_interval(&self, values: &[Interval]) -> Interval {
        match self {
            ExprNode::Literal(v) => Interval::point(*v),
            ExprNode::Aggregate { slot, .. } => values[*slot],
            ExprNode::Binary { op, lhs, rhs } => {
                op.apply_interval(lhs.eval_interval(values), rhs.eval_interval(values))
            }
        }
    }

    /// Aggregate slots referenced by this tree
    pub fn slots(&self, out: &mut Vec<usize>) {
        match self {
            ExprNode::Literal(_) => {}
            ExprNode::Aggregate { slot, .. } => {
                if !out.contains(slot) {
                    out.push(*slot);
                }
            }
            ExprNode::Binary { lhs, rhs, .. } => {
                lhs.slots(out);
                rhs.slots(out);
            }
        }
    }
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprNode::Literal(v) => write!(f, "{}", v),
            ExprNode::Aggregate { name, .. } => f.write_str(name),
            ExprNode::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
        }
    }
}

/// Parses a token slice into an [`ExprNode`], resolving identifiers
/// against the aggregate names.
pub struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    names: &'a [String],
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], names: &'a [String]) -> Self {
        Self {
            tokens,
            position: 0,
            names,
        }
    }

    /// Parse the whole slice (a trailing `Eof` is allowed)
    pub fn parse(mut self) -> Result<ExprNode> {
        let node = self.parse_group()?;
        match self.current() {
            TokenKind::Eof => Ok(node),
            other => Err(RepairError::Parse(format!(
                "Unexpected {:?} at offset {}",
                other,
                self.offset()
            ))),
        }
    }

    fn current(&self) -> &TokenKind {
        self.tokens
            .get(self.position)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|t| t.pos)
            .unwrap_or(0)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// One parenthesis level: runs until `)` or the end of input
    fn parse_group(&mut self) -> Result<ExprNode> {
        let mut operands: Vec<ExprNode> = Vec::new();
        let mut operators: Vec<BinaryOp> = Vec::new();
        let mut expect_operand = true;

        loop {
            let kind = self.current().clone();
            if expect_operand {
                let operand = match kind {
                    TokenKind::Number(v) => {
                        self.advance();
                        ExprNode::Literal(v)
                    }
                    TokenKind::Identifier(name) => {
                        self.advance();
                        self.resolve(name)?
                    }
                    TokenKind::LParen => {
                        self.advance();
                        let inner = self.parse_group()?;
                        if *self.current() != TokenKind::RParen {
                            return Err(RepairError::Parse(format!(
                                "Unclosed '(' before offset {}",
                                self.offset()
                            )));
                        }
                        self.advance();
                        inner
                    }
                    TokenKind::Minus => {
                        // Unary minus binds to the next operand: -x == (0 - x)
                        self.advance();
                        match self.current().clone() {
                            TokenKind::Number(v) => {
                                self.advance();
                                ExprNode::Literal(-v)
                            }
                            _ => {
                                operands.push(ExprNode::Literal(0.0));
                                operators.push(BinaryOp::Sub);
                                continue;
                            }
                        }
                    }
                    other => {
                        return Err(RepairError::Parse(format!(
                            "Expected operand, found {:?} at offset {}",
                            other,
                            self.offset()
                        )))
                    }
                };
                operands.push(operand);
                expect_operand = false;
            } else {
                match BinaryOp::from_token(&kind) {
                    Some(op) => {
                        while let Some(top) = operators.last() {
                            if top.precedence() < op.precedence() {
                                break;
                            }
                            Self::reduce(&mut operands, &mut operators)?;
                        }
                        operators.push(op);
                        self.advance();
                        expect_operand = true;
                    }
                    None => break,
                }
            }
        }

        if expect_operand {
            return Err(RepairError::Parse(format!(
                "Expression ends without an operand at offset {}",
                self.offset()
            )));
        }
        while !operators.is_empty() {
            Self::reduce(&mut operands, &mut operators)?;
        }
        operands
            .pop()
            .ok_or_else(|| RepairError::Parse("Empty expression".into()))
    }

    fn reduce(operands: &mut Vec<ExprNode>, operators: &mut Vec<BinaryOp>) -> Result<()> {
        let op = operators
            .pop()
            .ok_or_else(|| RepairError::Parse("Operator stack underflow".into()))?;
        let rhs = operands.pop();
        let lhs = operands.pop();
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => {
                operands.push(ExprNode::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                });
                Ok(())
            }
            _ => Err(RepairError::Parse(format!("Missing operand for '{}'", op.symbol()))),
        }
    }

    fn resolve(&self, name: String) -> Result<ExprNode> {
        match self.names.iter().position(|n| *n == name) {
            Some(slot) => Ok(ExprNode::Aggregate { name, slot }),
            None => Err(RepairError::Configuration(format!(
                "Unknown aggregate '{}' in bound expression",
                name
            ))),
        }
    }
}
