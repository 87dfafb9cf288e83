//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the cell-graph engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod cell;
pub mod formula;
pub mod position;
pub mod sheet;

// Re-export commonly used types at the crate root
pub use cell::{Cell, CellContent, CellError, CellValue};
pub use formula::Formula;
pub use parser::ParseError;
pub use position::{col_to_index, index_to_col, Position, Size, MAX_COLS, MAX_ROWS};
pub use sheet::{Sheet, SheetError, SheetResult};
