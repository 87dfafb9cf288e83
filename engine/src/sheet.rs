//! FILENAME: engine/src/sheet.rs
//! PURPOSE: Owns the cell store and orchestrates edits.
//! CONTEXT: The sheet keeps a sparse mapping from positions to cells and
//! the corners of the printable region. Every edit runs the same pipeline:
//! parse the text into a trial cell, search the trial's reference closure
//! for a path back to the edited position (cycle rejection), wire the
//! dependency edges, install the trial, and invalidate every cached value
//! that could observe the change. A failed edit leaves the sheet exactly
//! as it was.
//!
//! Cycle detection and cache invalidation both walk with an explicit
//! worklist and a visited set: no recursion to exhaust the stack, and
//! duplicate edges cannot loop.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};

use log::{debug, trace};
use parser::ParseError;

use crate::cell::{Cell, CellError, CellValue};
use crate::position::{Position, Size};

/// Errors surfaced by sheet operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// The position lies outside the sheet limits.
    InvalidPosition(Position),
    /// The text was '='-prefixed but the remainder failed to parse.
    Parse(ParseError),
    /// Committing the edit would close a reference cycle.
    CircularDependency(Position),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::InvalidPosition(pos) => {
                write!(f, "invalid position ({}, {})", pos.row, pos.col)
            }
            SheetError::Parse(error) => write!(f, "{}", error),
            SheetError::CircularDependency(pos) => {
                write!(f, "circular reference through {}", pos.to_a1())
            }
        }
    }
}

impl std::error::Error for SheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SheetError::Parse(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ParseError> for SheetError {
    fn from(error: ParseError) -> Self {
        SheetError::Parse(error)
    }
}

pub type SheetResult<T> = Result<T, SheetError>;

/// The top-level container: all cells keyed by position, plus the corners
/// of the printable region (None while the sheet is empty).
#[derive(Debug, Default)]
pub struct Sheet {
    cells: HashMap<Position, Cell>,
    corners: Option<(Position, Position)>,
}

impl Sheet {
    /// Creates a new, empty sheet.
    pub fn new() -> Self {
        Sheet {
            cells: HashMap::new(),
            corners: None,
        }
    }

    /// Sets the cell at `pos` from raw text.
    ///
    /// Pipeline: validate the position, parse the text into a trial cell,
    /// reject cycles, wire dependency edges (auto-creating empty
    /// placeholders for referenced cells that do not exist yet), install
    /// the trial, and invalidate the caches of every transitive dependent.
    /// On any error the sheet is left unmodified.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> SheetResult<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }

        let mut trial = Cell::new();
        trial.set(text)?;

        if self.would_create_cycle(&trial, pos) {
            debug!("rejected edit at {}: circular reference", pos.to_a1());
            return Err(SheetError::CircularDependency(pos));
        }

        self.wire_dependencies(&trial, pos);

        // Dependent edges belong to the position, not the content: whoever
        // referenced this position still does after the overwrite. A
        // position occupied for the first time (or again, after a clear)
        // collects its dependents from the cells that already name it.
        trial.dependents = match self.cells.get(&pos) {
            Some(old) => old.dependents.clone(),
            None => self.collect_dependents_of(pos),
        };

        let is_new = self.cells.insert(pos, trial).is_none();
        if is_new {
            self.extend_corners(pos);
        }
        self.invalidate_from(pos);
        debug!("set {} to {:?}", pos.to_a1(), text);
        Ok(())
    }

    /// Returns the cell at `pos`, or None when no cell exists there.
    pub fn cell(&self, pos: Position) -> SheetResult<Option<&Cell>> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self.cells.get(&pos))
    }

    /// Mutable variant of [`Sheet::cell`].
    pub fn cell_mut(&mut self, pos: Position) -> SheetResult<Option<&mut Cell>> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self.cells.get_mut(&pos))
    }

    /// The evaluated value at `pos`, or None when no cell exists there.
    pub fn value(&self, pos: Position) -> SheetResult<Option<CellValue>> {
        Ok(self.cell(pos)?.map(|cell| cell.value(self)))
    }

    /// The stored text at `pos`, or None when no cell exists there.
    pub fn text(&self, pos: Position) -> SheetResult<Option<String>> {
        Ok(self.cell(pos)?.map(|cell| cell.text()))
    }

    /// Removes the cell at `pos`. A position with no cell is a no-op.
    ///
    /// Dependents of the removed cell are invalidated first: their next
    /// read sees the position as missing (0.0 through a reference). Other
    /// cells' edge lists are never rewritten here; a formula that still
    /// names this position simply re-creates a placeholder on its next
    /// write, or reads 0.0.
    pub fn clear_cell(&mut self, pos: Position) -> SheetResult<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        if !self.cells.contains_key(&pos) {
            return Ok(());
        }

        self.invalidate_from(pos);
        self.cells.remove(&pos);
        debug!("cleared {}", pos.to_a1());

        match self.corners {
            Some((top_left, bottom_right))
                if pos.row == top_left.row
                    || pos.col == top_left.col
                    || pos.row == bottom_right.row
                    || pos.col == bottom_right.col =>
            {
                self.corners = self.scan_corners();
            }
            _ => {}
        }
        Ok(())
    }

    /// The dimensions of the printable region, (0, 0) when empty.
    pub fn printable_size(&self) -> Size {
        match self.corners {
            None => Size { rows: 0, cols: 0 },
            Some((top_left, bottom_right)) => Size {
                rows: bottom_right.row - top_left.row + 1,
                cols: bottom_right.col - top_left.col + 1,
            },
        }
    }

    /// Prints evaluated values over the printable region: tab-separated
    /// within a row, newline-terminated rows, absent cells blank. Numbers
    /// use the default f64 rendering, errors their category token.
    pub fn print_values<W: Write>(&self, out: &mut W) -> fmt::Result {
        self.print_with(out, |out, cell| match cell.value(self) {
            CellValue::Number(n) => write!(out, "{}", n),
            CellValue::Text(s) => write!(out, "{}", s),
            CellValue::Error(e) => write!(out, "{}", e),
        })
    }

    /// Prints stored texts over the printable region, with the same layout
    /// as [`Sheet::print_values`]. Formulas print canonically with their
    /// '=' prefix restored.
    pub fn print_texts<W: Write>(&self, out: &mut W) -> fmt::Result {
        self.print_with(out, |out, cell| write!(out, "{}", cell.text()))
    }

    /// Shared print loop; the projection decides what a cell emits.
    fn print_with<W, F>(&self, out: &mut W, print_cell: F) -> fmt::Result
    where
        W: Write,
        F: Fn(&mut W, &Cell) -> fmt::Result,
    {
        let (top_left, bottom_right) = match self.corners {
            None => return Ok(()),
            Some(corners) => corners,
        };
        for row in top_left.row..=bottom_right.row {
            for col in top_left.col..=bottom_right.col {
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    print_cell(out, cell)?;
                }
                if col != bottom_right.col {
                    out.write_char('\t')?;
                }
            }
            out.write_char('\n')?;
        }
        Ok(())
    }

    /// The value-lookup used by formula evaluation: invalid positions are
    /// a #REF! error, missing cells read as 0.0, text must parse as a
    /// number, and stored errors propagate with their category intact.
    pub(crate) fn reference_value(&self, pos: Position) -> Result<f64, CellError> {
        if !pos.is_valid() {
            return Err(CellError::Ref);
        }
        match self.cells.get(&pos) {
            None => Ok(0.0),
            Some(cell) => match cell.value(self) {
                CellValue::Number(n) => Ok(n),
                CellValue::Text(s) => s.trim().parse::<f64>().map_err(|_| CellError::Value),
                CellValue::Error(e) => Err(e),
            },
        }
    }

    /// Walks the trial's reference closure looking for a path back to
    /// `pos`. Invalid positions and missing cells are terminal.
    fn would_create_cycle(&self, trial: &Cell, pos: Position) -> bool {
        let mut to_check: Vec<Position> = trial.referenced_cells().to_vec();
        let mut checked: HashSet<Position> = HashSet::new();

        while let Some(current) = to_check.pop() {
            if current == pos {
                return true;
            }
            if !checked.insert(current) {
                continue;
            }
            if let Some(cell) = self.cells.get(&current) {
                for &next in cell.referenced_cells() {
                    if !checked.contains(&next) {
                        to_check.push(next);
                    }
                }
            }
        }
        false
    }

    /// Registers `pos` as a dependent of every valid position the trial
    /// references, creating empty placeholder cells where none exist.
    /// Placeholders count as occupied and extend the printable region.
    fn wire_dependencies(&mut self, trial: &Cell, pos: Position) {
        for &target in trial.referenced_cells() {
            if !target.is_valid() {
                // Evaluates to #REF!; there is no cell to wire
                continue;
            }
            if !self.cells.contains_key(&target) {
                trace!("placeholder created at {}", target.to_a1());
                let mut placeholder = Cell::new();
                placeholder.dependents = self.collect_dependents_of(target);
                self.cells.insert(target, placeholder);
                self.extend_corners(target);
            }
            if let Some(cell) = self.cells.get_mut(&target) {
                cell.add_dependent(pos);
            }
        }
    }

    /// Scans the occupied cells for those whose content references `pos`.
    /// Needed when a position becomes occupied: formulas may already name
    /// it (its previous occupant was cleared, or it never existed), and
    /// their edges must re-attach so invalidation keeps reaching them.
    fn collect_dependents_of(&self, pos: Position) -> Vec<Position> {
        self.cells
            .iter()
            .filter(|(_, cell)| cell.referenced_cells().contains(&pos))
            .map(|(&dependent, _)| dependent)
            .collect()
    }

    /// Clears the cached value at `pos` and of every cell reachable along
    /// dependent edges.
    fn invalidate_from(&mut self, pos: Position) {
        let mut to_clear = vec![pos];
        let mut cleared: HashSet<Position> = HashSet::new();

        while let Some(current) = to_clear.pop() {
            if !cleared.insert(current) {
                continue;
            }
            if let Some(cell) = self.cells.get(&current) {
                cell.clear_cache();
                for &dependent in cell.dependent_cells() {
                    if !cleared.contains(&dependent) {
                        to_clear.push(dependent);
                    }
                }
            }
        }
        if cleared.len() > 1 {
            trace!("invalidated {} cached values from {}", cleared.len(), pos.to_a1());
        }
    }

    /// Grows the printable region to include `pos`.
    fn extend_corners(&mut self, pos: Position) {
        match &mut self.corners {
            None => self.corners = Some((pos, pos)),
            Some((top_left, bottom_right)) => {
                top_left.row = top_left.row.min(pos.row);
                top_left.col = top_left.col.min(pos.col);
                bottom_right.row = bottom_right.row.max(pos.row);
                bottom_right.col = bottom_right.col.max(pos.col);
            }
        }
    }

    /// Every occupied position, in no particular order. Placeholder cells
    /// count as occupied.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.keys().copied()
    }

    /// Recomputes both corners from scratch: element-wise minima and
    /// maxima over the occupied positions. None when the sheet is empty.
    fn scan_corners(&self) -> Option<(Position, Position)> {
        let mut corners: Option<(Position, Position)> = None;
        for &pos in self.cells.keys() {
            corners = Some(match corners {
                None => (pos, pos),
                Some((mut top_left, mut bottom_right)) => {
                    top_left.row = top_left.row.min(pos.row);
                    top_left.col = top_left.col.min(pos.col);
                    bottom_right.row = bottom_right.row.max(pos.row);
                    bottom_right.col = bottom_right.col.max(pos.col);
                    (top_left, bottom_right)
                }
            });
        }
        corners
    }
}
