//! FILENAME: engine/src/position.rs
//! PURPOSE: Coordinate and size value types plus A1-style conversions.
//! CONTEXT: Positions are 0-based (row, col) pairs bounded by the sheet
//! limits. Formulas name cells in A1 notation ("A1", "AA100"); this module
//! converts between the two. Column "A" = 0, "B" = 1, ..., "Z" = 25,
//! "AA" = 26, etc. Row 1 in A1 notation = row 0 internally.

use serde::{Deserialize, Serialize};

/// Maximum number of rows a sheet can address.
pub const MAX_ROWS: u32 = 16_384;

/// Maximum number of columns a sheet can address.
pub const MAX_COLS: u32 = 16_384;

/// A cell coordinate as 0-based (row, col).
///
/// Ordering is lexicographic by (row, col), which the derive produces from
/// the field order. Positions outside the sheet limits are representable on
/// purpose: a formula may name a coordinate no sheet can address, and the
/// evaluator reports that as a #REF! error rather than refusing to parse.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

impl Position {
    pub fn new(row: u32, col: u32) -> Self {
        Position { row, col }
    }

    /// Returns true when both coordinates lie within the sheet limits.
    pub fn is_valid(&self) -> bool {
        self.row < MAX_ROWS && self.col < MAX_COLS
    }

    /// Builds the position named by a formula reference: column letters
    /// plus a 1-based row number. A row of 0 or an overlong column maps to
    /// an out-of-range position instead of panicking.
    pub fn from_ref(col: &str, row: u32) -> Self {
        Position {
            row: row.checked_sub(1).unwrap_or(u32::MAX),
            col: col_to_index(col),
        }
    }

    /// Parses an A1-style reference string ("B2" -> row 1, col 1).
    /// Returns None when the string is not letters followed by digits.
    pub fn from_a1(reference: &str) -> Option<Self> {
        let letters: String = reference
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        let digits = &reference[letters.len()..];

        if letters.is_empty() || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let row = digits.parse::<u32>().ok()?;
        if row == 0 {
            return None;
        }
        Some(Position::from_ref(&letters, row))
    }

    /// Renders the position in A1 notation: (1, 1) -> "B2".
    pub fn to_a1(&self) -> String {
        format!("{}{}", index_to_col(self.col), self.row.saturating_add(1))
    }
}

/// The dimensions of a printable region. (0, 0) means empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub rows: u32,
    pub cols: u32,
}

/// Converts a column string (e.g., "A", "AA", "ABC") to a 0-based column index.
/// "A" -> 0, "B" -> 1, ..., "Z" -> 25, "AA" -> 26, "AB" -> 27, etc.
/// Saturates on overlong input; the result is then simply an invalid column.
pub fn col_to_index(col_str: &str) -> u32 {
    let mut result: u32 = 0;
    for c in col_str.chars() {
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result.saturating_mul(26).saturating_add(digit);
    }
    result.saturating_sub(1) // Convert to 0-based
}

/// Converts a 0-based column index to a column string.
/// 0 -> "A", 1 -> "B", ..., 25 -> "Z", 26 -> "AA", 27 -> "AB", etc.
pub fn index_to_col(mut col_index: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_to_index() {
        assert_eq!(col_to_index("A"), 0);
        assert_eq!(col_to_index("B"), 1);
        assert_eq!(col_to_index("Z"), 25);
        assert_eq!(col_to_index("AA"), 26);
        assert_eq!(col_to_index("AB"), 27);
        assert_eq!(col_to_index("AZ"), 51);
        assert_eq!(col_to_index("BA"), 52);
        assert_eq!(col_to_index("ZZ"), 701);
        assert_eq!(col_to_index("AAA"), 702);
    }

    #[test]
    fn test_index_to_col() {
        assert_eq!(index_to_col(0), "A");
        assert_eq!(index_to_col(1), "B");
        assert_eq!(index_to_col(25), "Z");
        assert_eq!(index_to_col(26), "AA");
        assert_eq!(index_to_col(27), "AB");
        assert_eq!(index_to_col(51), "AZ");
        assert_eq!(index_to_col(52), "BA");
        assert_eq!(index_to_col(701), "ZZ");
        assert_eq!(index_to_col(702), "AAA");
    }

    #[test]
    fn test_roundtrip() {
        for i in 0..1000 {
            let col_str = index_to_col(i);
            let back = col_to_index(&col_str);
            assert_eq!(back, i, "Roundtrip failed for index {}", i);
        }
    }

    #[test]
    fn test_from_a1() {
        assert_eq!(Position::from_a1("A1"), Some(Position::new(0, 0)));
        assert_eq!(Position::from_a1("B2"), Some(Position::new(1, 1)));
        assert_eq!(Position::from_a1("AA100"), Some(Position::new(99, 26)));
        assert_eq!(Position::from_a1("Z50"), Some(Position::new(49, 25)));
        assert_eq!(Position::from_a1("A0"), None);
        assert_eq!(Position::from_a1("A"), None);
        assert_eq!(Position::from_a1("1"), None);
        assert_eq!(Position::from_a1("A1B"), None);
    }

    #[test]
    fn test_to_a1() {
        assert_eq!(Position::new(0, 0).to_a1(), "A1");
        assert_eq!(Position::new(1, 1).to_a1(), "B2");
        assert_eq!(Position::new(99, 26).to_a1(), "AA100");
        assert_eq!(Position::new(49, 25).to_a1(), "Z50");
    }

    #[test]
    fn test_validity_bounds() {
        assert!(Position::new(0, 0).is_valid());
        assert!(Position::new(MAX_ROWS - 1, MAX_COLS - 1).is_valid());
        assert!(!Position::new(MAX_ROWS, 0).is_valid());
        assert!(!Position::new(0, MAX_COLS).is_valid());
        assert!(!Position::from_ref("A", 0).is_valid());
        assert!(!Position::from_ref("ZZZZ", 1).is_valid());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        assert!(Position::new(0, 5) < Position::new(1, 0));
        assert!(Position::new(2, 1) < Position::new(2, 3));
        assert_eq!(Position::new(4, 4), Position::new(4, 4));
    }
}
