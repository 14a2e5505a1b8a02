//! Result grid geometry
//!
//! The result authority delivers one 5×3 grid per round, column-major and
//! top-to-bottom. Everything downstream indexes it as `columns[reel][row]`.

use serde::{Deserialize, Serialize};

use crate::error::{RfError, RfResult};

/// Symbol identifier as delivered by the result authority
pub type SymbolId = u32;

/// Number of reels (columns)
pub const REEL_COUNT: usize = 5;

/// Number of visible rows per reel
pub const ROW_COUNT: usize = 3;

/// Visible symbols of one column, top to bottom
pub type ColumnSymbols = [SymbolId; ROW_COUNT];

/// A cell on the visible grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    /// Reel index (0 = leftmost)
    pub column: u8,
    /// Row index (0 = top)
    pub row: u8,
}

impl CellPos {
    pub fn new(column: u8, row: u8) -> Self {
        Self { column, row }
    }

    /// Check the position lies inside the 5×3 window
    #[inline]
    pub fn is_valid(&self) -> bool {
        (self.column as usize) < REEL_COUNT && (self.row as usize) < ROW_COUNT
    }
}

/// Authoritative 5×3 result grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<SymbolId>>", into = "Vec<Vec<SymbolId>>")]
pub struct ResultGrid {
    columns: [ColumnSymbols; REEL_COUNT],
}

impl ResultGrid {
    /// Create from column-major symbols
    pub fn new(columns: [ColumnSymbols; REEL_COUNT]) -> Self {
        Self { columns }
    }

    /// Build from row-major symbols (`rows[row][reel]`)
    pub fn from_rows(rows: [[SymbolId; REEL_COUNT]; ROW_COUNT]) -> Self {
        let mut columns = [[0; ROW_COUNT]; REEL_COUNT];
        for (row, symbols) in rows.iter().enumerate() {
            for (reel, &symbol) in symbols.iter().enumerate() {
                columns[reel][row] = symbol;
            }
        }
        Self { columns }
    }

    /// Visible symbols for one reel, top to bottom
    ///
    /// # Panics
    /// Panics if `reel >= REEL_COUNT`.
    #[inline]
    pub fn column(&self, reel: usize) -> &ColumnSymbols {
        &self.columns[reel]
    }

    /// All columns
    #[inline]
    pub fn columns(&self) -> &[ColumnSymbols; REEL_COUNT] {
        &self.columns
    }

    /// Symbol at a cell, `None` when out of bounds
    pub fn symbol(&self, cell: CellPos) -> Option<SymbolId> {
        if !cell.is_valid() {
            return None;
        }
        Some(self.columns[cell.column as usize][cell.row as usize])
    }

    /// Convert to nested vectors (reels × rows)
    pub fn to_vec(&self) -> Vec<Vec<SymbolId>> {
        self.columns.iter().map(|c| c.to_vec()).collect()
    }
}

impl From<[ColumnSymbols; REEL_COUNT]> for ResultGrid {
    fn from(columns: [ColumnSymbols; REEL_COUNT]) -> Self {
        Self::new(columns)
    }
}

impl TryFrom<Vec<Vec<SymbolId>>> for ResultGrid {
    type Error = RfError;

    fn try_from(value: Vec<Vec<SymbolId>>) -> RfResult<Self> {
        if value.len() != REEL_COUNT {
            return Err(RfError::InvalidGrid(format!(
                "expected {} reels, got {}",
                REEL_COUNT,
                value.len()
            )));
        }

        let mut columns = [[0; ROW_COUNT]; REEL_COUNT];
        for (reel, symbols) in value.iter().enumerate() {
            if symbols.len() != ROW_COUNT {
                return Err(RfError::InvalidGrid(format!(
                    "reel {} has {} rows, expected {}",
                    reel,
                    symbols.len(),
                    ROW_COUNT
                )));
            }
            columns[reel].copy_from_slice(symbols);
        }
        Ok(Self { columns })
    }
}

impl From<ResultGrid> for Vec<Vec<SymbolId>> {
    fn from(grid: ResultGrid) -> Self {
        grid.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_from_rows_is_column_major() {
        let grid = ResultGrid::from_rows([[1, 2, 3, 4, 5], [6, 7, 8, 9, 10], [11, 12, 13, 14, 15]]);

        assert_eq!(grid.column(0), &[1, 6, 11]);
        assert_eq!(grid.column(4), &[5, 10, 15]);
        assert_eq!(grid.symbol(CellPos::new(2, 1)), Some(8));
        assert_eq!(grid.symbol(CellPos::new(5, 0)), None);
    }

    #[test]
    fn test_grid_rejects_wrong_shape() {
        let short = vec![vec![1, 2, 3]; 4];
        assert!(matches!(ResultGrid::try_from(short), Err(RfError::InvalidGrid(_))));

        let mut ragged = vec![vec![1, 2, 3]; 5];
        ragged[3].push(9);
        assert!(ResultGrid::try_from(ragged).is_err());
    }

    #[test]
    fn test_grid_serialization() {
        let grid = ResultGrid::new([[0, 1, 2], [3, 4, 5], [6, 7, 8], [9, 0, 1], [2, 3, 4]]);
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, "[[0,1,2],[3,4,5],[6,7,8],[9,0,1],[2,3,4]]");

        let back: ResultGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);

        let bad: Result<ResultGrid, _> = serde_json::from_str("[[0,1],[3,4,5]]");
        assert!(bad.is_err());
    }
}
