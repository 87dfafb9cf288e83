//! FILENAME: engine/src/formula.rs
//! PURPOSE: Evaluates parsed formula ASTs and extracts their references.
//! CONTEXT: Wraps the parser crate's Expression with the engine-side
//! operations a formula cell needs: arithmetic evaluation through a
//! value-lookup function, canonical text, and the list of referenced
//! positions that feeds the dependency graph. The lookup function is
//! supplied by the sheet, which keeps this module free of any knowledge
//! of cell storage.

use parser::{self, BinaryOperator, Expression, ParseError, UnaryOperator};

use crate::cell::CellError;
use crate::position::Position;

/// A parsed formula, ready to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    ast: Expression,
}

impl Formula {
    /// Parses `expression` — the formula text without its leading '='.
    pub fn parse(expression: &str) -> Result<Formula, ParseError> {
        Ok(Formula {
            ast: parser::parse(expression)?,
        })
    }

    /// The canonical text of the formula, without the '=' prefix.
    pub fn expression(&self) -> String {
        self.ast.to_string()
    }

    /// The positions the formula references, sorted and deduplicated.
    /// Out-of-range references are included; they evaluate to #REF!.
    pub fn referenced_cells(&self) -> Vec<Position> {
        let mut cells = Vec::new();
        collect_refs(&self.ast, &mut cells);
        cells.sort();
        cells.dedup();
        cells
    }

    /// Evaluates the formula, calling `lookup` for every cell reference.
    /// The first error aborts evaluation and becomes the result.
    pub fn evaluate<F>(&self, lookup: &F) -> Result<f64, CellError>
    where
        F: Fn(Position) -> Result<f64, CellError>,
    {
        eval(&self.ast, lookup)
    }
}

fn collect_refs(expr: &Expression, out: &mut Vec<Position>) {
    match expr {
        Expression::Number(_) => {}
        Expression::CellRef { col, row } => out.push(Position::from_ref(col, *row)),
        Expression::UnaryOp { operand, .. } => collect_refs(operand, out),
        Expression::BinaryOp { left, right, .. } => {
            collect_refs(left, out);
            collect_refs(right, out);
        }
    }
}

fn eval<F>(expr: &Expression, lookup: &F) -> Result<f64, CellError>
where
    F: Fn(Position) -> Result<f64, CellError>,
{
    match expr {
        Expression::Number(n) => Ok(*n),
        Expression::CellRef { col, row } => lookup(Position::from_ref(col, *row)),
        Expression::UnaryOp { op, operand } => {
            let value = eval(operand, lookup)?;
            match op {
                UnaryOperator::Negate => Ok(-value),
            }
        }
        Expression::BinaryOp { left, op, right } => {
            let lhs = eval(left, lookup)?;
            let rhs = eval(right, lookup)?;
            let result = match op {
                BinaryOperator::Add => lhs + rhs,
                BinaryOperator::Subtract => lhs - rhs,
                BinaryOperator::Multiply => lhs * rhs,
                BinaryOperator::Divide => {
                    if rhs == 0.0 {
                        return Err(CellError::Div0);
                    }
                    lhs / rhs
                }
            };
            if result.is_finite() {
                Ok(result)
            } else {
                Err(CellError::Div0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A lookup that reads every reference as 0.0, for formulas whose
    /// arithmetic is under test.
    fn zeros(_: Position) -> Result<f64, CellError> {
        Ok(0.0)
    }

    #[test]
    fn evaluates_arithmetic() {
        let formula = Formula::parse("1+2*3").unwrap();
        assert_eq!(formula.evaluate(&zeros), Ok(7.0));

        let formula = Formula::parse("(1+2)*3").unwrap();
        assert_eq!(formula.evaluate(&zeros), Ok(9.0));

        let formula = Formula::parse("-(4/2)").unwrap();
        assert_eq!(formula.evaluate(&zeros), Ok(-2.0));
    }

    #[test]
    fn division_by_zero_is_div0() {
        let formula = Formula::parse("1/0").unwrap();
        assert_eq!(formula.evaluate(&zeros), Err(CellError::Div0));

        // A reference that reads as zero divides the same way
        let formula = Formula::parse("1/A1").unwrap();
        assert_eq!(formula.evaluate(&zeros), Err(CellError::Div0));
    }

    #[test]
    fn lookup_values_flow_through() {
        let formula = Formula::parse("A1+B2").unwrap();
        let lookup = |pos: Position| {
            if pos == Position::new(0, 0) {
                Ok(10.0)
            } else {
                Ok(32.0)
            }
        };
        assert_eq!(formula.evaluate(&lookup), Ok(42.0));
    }

    #[test]
    fn lookup_errors_abort_with_their_category() {
        let formula = Formula::parse("1+A1").unwrap();
        let lookup = |_: Position| Err(CellError::Value);
        assert_eq!(formula.evaluate(&lookup), Err(CellError::Value));
    }

    #[test]
    fn referenced_cells_are_sorted_and_deduplicated() {
        let formula = Formula::parse("B2+A1+B2+A1").unwrap();
        assert_eq!(
            formula.referenced_cells(),
            vec![Position::new(0, 0), Position::new(1, 1)]
        );
    }

    #[test]
    fn out_of_range_references_are_reported() {
        let formula = Formula::parse("A0").unwrap();
        let refs = formula.referenced_cells();
        assert_eq!(refs.len(), 1);
        assert!(!refs[0].is_valid());
    }

    #[test]
    fn expression_is_canonical() {
        let formula = Formula::parse(" ( a1 + 2 ) * 3 ").unwrap();
        assert_eq!(formula.expression(), "(A1+2)*3");
    }
}
