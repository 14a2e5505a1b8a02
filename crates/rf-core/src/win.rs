//! Win-line descriptors and the per-round payload from the result authority

use serde::{Deserialize, Serialize};

use crate::error::{RfError, RfResult};
use crate::grid::{CellPos, ResultGrid};

/// A winning line as reported by the result authority
///
/// Immutable once created: fields are only reachable through getters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinLine {
    line_id: u32,
    #[serde(default)]
    cells: Vec<CellPos>,
    amount: f64,
}

impl WinLine {
    pub fn new(line_id: u32, cells: Vec<CellPos>, amount: f64) -> Self {
        Self {
            line_id,
            cells,
            amount,
        }
    }

    /// Payline identifier
    #[inline]
    pub fn line_id(&self) -> u32 {
        self.line_id
    }

    /// Cells covered by this win
    #[inline]
    pub fn cells(&self) -> &[CellPos] {
        &self.cells
    }

    /// Amount paid by this line
    #[inline]
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Check amount and cell bounds
    pub fn validate(&self) -> RfResult<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(RfError::InvalidWinLine(format!(
                "line {} has invalid amount {}",
                self.line_id, self.amount
            )));
        }
        if let Some(cell) = self.cells.iter().find(|c| !c.is_valid()) {
            return Err(RfError::InvalidWinLine(format!(
                "line {} references cell ({}, {}) outside the grid",
                self.line_id, cell.column, cell.row
            )));
        }
        Ok(())
    }
}

/// One round as delivered by the result authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Authority round identifier (for logs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,

    /// Final grid
    pub grid: ResultGrid,

    /// Winning lines in presentation order
    #[serde(default)]
    pub win_lines: Vec<WinLine>,

    /// Total win; derived from the lines when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_win: Option<f64>,

    /// Bet amount for the round
    pub bet: f64,
}

impl RoundResult {
    pub fn new(grid: ResultGrid, bet: f64) -> Self {
        Self {
            round_id: None,
            grid,
            win_lines: Vec::new(),
            total_win: None,
            bet,
        }
    }

    /// Append a win line (builder pattern)
    pub fn with_line(mut self, line: WinLine) -> Self {
        self.win_lines.push(line);
        self
    }

    /// Set an explicit total win
    pub fn with_total_win(mut self, total_win: f64) -> Self {
        self.total_win = Some(total_win);
        self
    }

    /// Total win: explicit value, or the sum of the line amounts
    pub fn total_win(&self) -> f64 {
        self.total_win
            .unwrap_or_else(|| self.win_lines.iter().map(|l| l.amount()).sum())
    }

    /// Win-to-bet ratio, 0.0 when the bet is not positive
    pub fn win_ratio(&self) -> f64 {
        if self.bet > 0.0 {
            self.total_win() / self.bet
        } else {
            0.0
        }
    }

    pub fn is_win(&self) -> bool {
        self.total_win() > 0.0
    }

    /// Reject payloads the presentation layer cannot animate faithfully
    pub fn validate(&self) -> RfResult<()> {
        if !self.bet.is_finite() || self.bet < 0.0 {
            return Err(RfError::InvalidParam(format!("invalid bet {}", self.bet)));
        }
        if let Some(total) = self.total_win {
            if !total.is_finite() || total < 0.0 {
                return Err(RfError::InvalidParam(format!("invalid total win {}", total)));
            }
        }
        for line in &self.win_lines {
            line.validate()?;
        }
        Ok(())
    }

    /// Parse and validate an authority payload
    pub fn from_json(json: &str) -> RfResult<Self> {
        let result: Self = serde_json::from_str(json)?;
        result.validate()?;
        Ok(result)
    }
}
