//! FILENAME: parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for formula expressions.
//! CONTEXT: After the Lexer tokenizes a formula string, the Parser converts
//! those tokens into this tree structure. The evaluator traverses the tree
//! to compute the final result.
//!
//! SUPPORTED EXPRESSIONS:
//! - Number literals: 42, 3.14
//! - Cell references: A1, AA100
//! - Binary operations: +, -, *, /
//! - Unary negation: -5
//! - Parentheses for grouping
//!
//! The `Display` impl renders the canonical form of an expression: no
//! whitespace, and parentheses only where precedence demands them. The
//! canonical text re-parses to an expression with the same evaluation
//! semantics.

use std::fmt;

/// Precedence of additive operators (+ and -).
const PREC_ADDITIVE: u8 = 1;
/// Precedence of multiplicative operators (* and /).
const PREC_MULTIPLICATIVE: u8 = 2;
/// Precedence of unary negation.
const PREC_UNARY: u8 = 3;
/// Precedence of atoms (literals and references).
const PREC_ATOM: u8 = 4;

/// Represents a parsed formula expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A numeric literal.
    Number(f64),

    /// A single cell reference like A1 or AA100.
    /// The column is stored as uppercase letters (e.g., "A", "AA") and
    /// the row as a 1-indexed integer.
    CellRef { col: String, row: u32 },

    /// A binary operation: left op right (e.g., 5 + 3, A1 * 2).
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A unary operation: op operand (e.g., -5).
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
}

impl Expression {
    /// The precedence of this node, used by canonical printing to decide
    /// where parentheses are required.
    fn precedence(&self) -> u8 {
        match self {
            Expression::Number(_) | Expression::CellRef { .. } => PREC_ATOM,
            Expression::UnaryOp { .. } => PREC_UNARY,
            Expression::BinaryOp { op, .. } => op.precedence(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{}", n),
            Expression::CellRef { col, row } => write!(f, "{}{}", col, row),
            Expression::UnaryOp { op, operand } => {
                write!(f, "{}", op)?;
                if operand.precedence() < PREC_UNARY {
                    write!(f, "({})", operand)
                } else {
                    write!(f, "{}", operand)
                }
            }
            Expression::BinaryOp { left, op, right } => {
                let prec = op.precedence();
                if left.precedence() < prec {
                    write!(f, "({})", left)?;
                } else {
                    write!(f, "{}", left)?;
                }
                write!(f, "{}", op)?;
                // The right operand of - and / needs parentheses even at
                // equal precedence: 1-(2-3) is not 1-2-3.
                let needs_parens = right.precedence() < prec
                    || (right.precedence() == prec
                        && matches!(op, BinaryOperator::Subtract | BinaryOperator::Divide));
                if needs_parens {
                    write!(f, "({})", right)
                } else {
                    write!(f, "{}", right)
                }
            }
        }
    }
}

/// Binary operators for expressions.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
}

impl BinaryOperator {
    fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Add | BinaryOperator::Subtract => PREC_ADDITIVE,
            BinaryOperator::Multiply | BinaryOperator::Divide => PREC_MULTIPLICATIVE,
        }
    }
}

/// Unary operators.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Negate, // -
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}
