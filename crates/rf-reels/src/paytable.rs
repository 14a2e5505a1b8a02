//! Payline geometry for the 5×3 grid

use serde::{Deserialize, Serialize};

use rf_core::{CellPos, REEL_COUNT};

/// A payline definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payline {
    /// Payline id as reported by the result authority
    pub id: u32,
    /// Row for each reel (e.g., [0, 1, 2, 1, 0] for a "V" shape)
    pub rows: [u8; REEL_COUNT],
}

impl Payline {
    pub const fn new(id: u32, rows: [u8; REEL_COUNT]) -> Self {
        Self { id, rows }
    }

    /// Straight line (same row across all reels)
    pub const fn straight(id: u32, row: u8) -> Self {
        Self::new(id, [row; REEL_COUNT])
    }

    /// Cells of the full line, left to right
    pub fn cells(&self) -> Vec<CellPos> {
        self.rows
            .iter()
            .enumerate()
            .map(|(reel, row)| CellPos::new(reel as u8, *row))
            .collect()
    }
}

/// Lookup table from payline id to geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaylineTable {
    lines: Vec<Payline>,
}

impl PaylineTable {
    pub fn new(lines: Vec<Payline>) -> Self {
        Self { lines }
    }

    /// Standard 20 payline patterns for a 5×3 grid
    pub fn standard_20() -> Self {
        Self::new(vec![
            // Straight lines
            Payline::straight(0, 1), // Middle
            Payline::straight(1, 0), // Top
            Payline::straight(2, 2), // Bottom
            // V shapes
            Payline::new(3, [0, 1, 2, 1, 0]),
            Payline::new(4, [2, 1, 0, 1, 2]),
            // Zigzag
            Payline::new(5, [0, 0, 1, 2, 2]),
            Payline::new(6, [2, 2, 1, 0, 0]),
            Payline::new(7, [1, 0, 0, 0, 1]),
            Payline::new(8, [1, 2, 2, 2, 1]),
            // W shapes
            Payline::new(9, [0, 1, 0, 1, 0]),
            Payline::new(10, [2, 1, 2, 1, 2]),
            // Shallow U
            Payline::new(11, [0, 1, 1, 1, 0]),
            Payline::new(12, [2, 1, 1, 1, 2]),
            // Steps
            Payline::new(13, [1, 1, 0, 1, 1]),
            Payline::new(14, [1, 1, 2, 1, 1]),
            // Complex
            Payline::new(15, [0, 2, 0, 2, 0]),
            Payline::new(16, [2, 0, 2, 0, 2]),
            Payline::new(17, [1, 0, 1, 0, 1]),
            Payline::new(18, [1, 2, 1, 2, 1]),
            Payline::new(19, [0, 0, 2, 0, 0]),
        ])
    }

    pub fn get(&self, id: u32) -> Option<&Payline> {
        self.lines.iter().find(|l| l.id == id)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Cells of a payline; empty for unknown ids
    pub fn cells(&self, id: u32) -> Vec<CellPos> {
        self.get(id).map(|l| l.cells()).unwrap_or_default()
    }
}

impl Default for PaylineTable {
    fn default() -> Self {
        Self::standard_20()
    }
}
