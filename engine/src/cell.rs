//! FILENAME: engine/src/cell.rs
//! PURPOSE: Defines a single grid entry and its value types.
//! CONTEXT: A cell holds one of three content variants (empty, text,
//! formula), a lazily filled value cache, and both sides of the dependency
//! graph: the positions its content references (outgoing edges) and the
//! positions that reference it (incoming edges). Edges are stored as plain
//! position values, never as references into the cell store, so removing a
//! cell can never leave a dangling link.

use std::cell::RefCell;
use std::fmt;

use parser::ParseError;
use serde::{Deserialize, Serialize};

use crate::formula::Formula;
use crate::position::Position;
use crate::sheet::Sheet;

/// The error categories a formula evaluation can produce.
/// The category survives propagation verbatim: a cell that reads an
/// erroring cell reports the same category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellError {
    /// Reference to a position outside the sheet limits.
    Ref,
    /// Text operand that cannot be read as a number.
    Value,
    /// Division by zero, or arithmetic that left the finite range.
    Div0,
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellError::Ref => write!(f, "#REF!"),
            CellError::Value => write!(f, "#VALUE!"),
            CellError::Div0 => write!(f, "#DIV/0!"),
        }
    }
}

impl std::error::Error for CellError {}

/// The computed result of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Error(CellError),
}

/// What a cell holds, as classified from the text the user entered.
#[derive(Debug, Clone)]
pub enum CellContent {
    Empty,
    Text(String),
    Formula(Formula),
}

/// The atomic unit of the sheet.
#[derive(Debug)]
pub struct Cell {
    content: CellContent,
    /// Last computed value; None means "must recompute". RefCell because
    /// reads fill the cache lazily through a shared borrow.
    cache: RefCell<Option<CellValue>>,
    /// Positions this cell's content references, sorted and deduplicated.
    referenced: Vec<Position>,
    /// Positions whose content references this cell. Owned by the position,
    /// not the content: overwriting the cell keeps these edges.
    pub(crate) dependents: Vec<Position>,
}

impl Cell {
    pub fn new() -> Self {
        Cell {
            content: CellContent::Empty,
            cache: RefCell::new(None),
            referenced: Vec::new(),
            dependents: Vec::new(),
        }
    }

    /// Installs new content from raw text and invalidates the cache.
    ///
    /// Classification:
    /// - empty string: Empty
    /// - at least two characters and a leading '=': formula, parsed from
    ///   the remainder; a malformed remainder is a ParseError and leaves
    ///   the cell untouched
    /// - anything else (including a lone "="): text
    pub fn set(&mut self, text: &str) -> Result<(), ParseError> {
        self.content = if text.is_empty() {
            CellContent::Empty
        } else if text.len() > 1 && text.starts_with('=') {
            CellContent::Formula(Formula::parse(&text[1..])?)
        } else {
            CellContent::Text(text.to_string())
        };

        self.referenced = match &self.content {
            CellContent::Formula(formula) => formula.referenced_cells(),
            _ => Vec::new(),
        };
        self.clear_cache();
        Ok(())
    }

    /// Resets the cell to Empty. Incoming dependent edges are kept.
    pub fn clear(&mut self) {
        self.content = CellContent::Empty;
        self.referenced.clear();
        self.clear_cache();
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    /// The current value, computed on first read and cached until the sheet
    /// invalidates it.
    pub fn value(&self, sheet: &Sheet) -> CellValue {
        if let Some(value) = self.cache.borrow().clone() {
            return value;
        }
        let value = self.compute(sheet);
        *self.cache.borrow_mut() = Some(value.clone());
        value
    }

    fn compute(&self, sheet: &Sheet) -> CellValue {
        match &self.content {
            CellContent::Empty => CellValue::Number(0.0),
            CellContent::Text(text) => match text.strip_prefix('\'') {
                // Leading quote escapes text that would otherwise look
                // numeric or formula-like
                Some(rest) => CellValue::Text(rest.to_string()),
                None => CellValue::Text(text.clone()),
            },
            CellContent::Formula(formula) => {
                match formula.evaluate(&|pos| sheet.reference_value(pos)) {
                    Ok(number) => CellValue::Number(number),
                    Err(error) => CellValue::Error(error),
                }
            }
        }
    }

    /// The stored text: "" for empty cells, the raw text for text cells
    /// (quote escape included), and "=" plus the canonical expression for
    /// formula cells.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(text) => text.clone(),
            CellContent::Formula(formula) => format!("={}", formula.expression()),
        }
    }

    /// Positions this cell's content references.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.referenced
    }

    /// Positions whose content references this cell.
    pub fn dependent_cells(&self) -> &[Position] {
        &self.dependents
    }

    /// Records an incoming dependent edge. Invalid positions are ignored
    /// and duplicates are not added.
    pub fn add_dependent(&mut self, pos: Position) {
        if pos.is_valid() && !self.dependents.contains(&pos) {
            self.dependents.push(pos);
        }
    }

    /// Drops the cached value. Non-recursive: transitive invalidation is
    /// the sheet's job.
    pub fn clear_cache(&self) {
        *self.cache.borrow_mut() = None;
    }

    /// The cached value, if any, without computing. Lets tests observe
    /// invalidation.
    #[cfg(test)]
    pub(crate) fn cached_value(&self) -> Option<CellValue> {
        self.cache.borrow().clone()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_classifies_as_empty() {
        let mut cell = Cell::new();
        cell.set("").unwrap();
        assert!(matches!(cell.content(), CellContent::Empty));
        assert_eq!(cell.text(), "");
    }

    #[test]
    fn empty_cell_reads_as_zero() {
        let sheet = Sheet::new();
        let cell = Cell::new();
        assert_eq!(cell.value(&sheet), CellValue::Number(0.0));
    }

    #[test]
    fn plain_text_round_trips() {
        let sheet = Sheet::new();
        let mut cell = Cell::new();
        cell.set("hello").unwrap();
        assert_eq!(cell.value(&sheet), CellValue::Text("hello".to_string()));
        assert_eq!(cell.text(), "hello");
    }

    #[test]
    fn quote_escape_strips_in_value_only() {
        let sheet = Sheet::new();
        let mut cell = Cell::new();
        cell.set("'123").unwrap();
        assert_eq!(cell.value(&sheet), CellValue::Text("123".to_string()));
        assert_eq!(cell.text(), "'123");
    }

    #[test]
    fn lone_equals_is_text() {
        let sheet = Sheet::new();
        let mut cell = Cell::new();
        cell.set("=").unwrap();
        assert_eq!(cell.value(&sheet), CellValue::Text("=".to_string()));
        assert_eq!(cell.text(), "=");
    }

    #[test]
    fn formula_text_is_canonicalized() {
        let mut cell = Cell::new();
        cell.set("= 1 +  2*3").unwrap();
        assert_eq!(cell.text(), "=1+2*3");
    }

    #[test]
    fn formula_records_references() {
        let mut cell = Cell::new();
        cell.set("=B1+A2*B1").unwrap();
        assert_eq!(
            cell.referenced_cells(),
            &[Position::new(0, 1), Position::new(1, 0)]
        );
    }

    #[test]
    fn malformed_formula_is_a_parse_error() {
        let mut cell = Cell::new();
        assert!(cell.set("=1+").is_err());
    }

    #[test]
    fn set_invalidates_cache() {
        let sheet = Sheet::new();
        let mut cell = Cell::new();
        cell.set("=1+2").unwrap();
        assert_eq!(cell.value(&sheet), CellValue::Number(3.0));
        assert!(cell.cached_value().is_some());
        cell.set("=5").unwrap();
        assert!(cell.cached_value().is_none());
        assert_eq!(cell.value(&sheet), CellValue::Number(5.0));
    }

    #[test]
    fn clear_resets_content_but_keeps_dependents() {
        let mut cell = Cell::new();
        cell.set("=A1").unwrap();
        cell.add_dependent(Position::new(5, 5));
        cell.clear();
        assert!(matches!(cell.content(), CellContent::Empty));
        assert!(cell.referenced_cells().is_empty());
        assert_eq!(cell.dependent_cells(), &[Position::new(5, 5)]);
    }

    #[test]
    fn add_dependent_ignores_invalid_and_duplicates() {
        let mut cell = Cell::new();
        let dep = Position::new(1, 1);
        cell.add_dependent(dep);
        cell.add_dependent(dep);
        cell.add_dependent(Position::new(u32::MAX, 0));
        assert_eq!(cell.dependent_cells(), &[dep]);
    }
}
