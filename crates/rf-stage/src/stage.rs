//! Stage — The core enum defining every render event of a round
//!
//! A Stage is NOT a frame, NOT a physics sample.
//! A Stage is the SEMANTIC MEANING of a moment in the presentation.

use serde::{Deserialize, Serialize};

use rf_core::{CellPos, SymbolId};

use crate::taxonomy::{CadenceStatus, CelebrationPhase, CelebrationTier};

/// Canonical presentation stage
///
/// Every render hook the shell installs is driven by one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stage {
    // ═══════════════════════════════════════════════════════════════════════
    // SPIN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Spin input accepted, all reels starting
    SpinStart,

    /// Reel left Idle and is accelerating
    ReelSpinning {
        /// Which reel (0-indexed)
        reel_index: u8,
    },

    /// A symbol scrolled out and its slot was refilled
    ReelWrap {
        reel_index: u8,
        /// Symbol that entered above the window
        symbol: SymbolId,
        /// Wraps since this reel started spinning
        wrap_count: u32,
    },

    /// Reel began decelerating towards its target
    ReelBrake { reel_index: u8, wrap_count: u32 },

    /// Reel landed on its final symbols
    ReelStop {
        /// Which reel stopped (0-indexed)
        reel_index: u8,
        /// Visible symbols (top to bottom)
        #[serde(default)]
        symbols: Vec<SymbolId>,
        #[serde(default)]
        wrap_count: u32,
    },

    /// Reel finished its settle animation and is Idle
    ReelSettled { reel_index: u8 },

    /// Quick-stop requested by the player
    QuickStop,

    /// All reels settled, wins about to be presented
    EvaluateWins {
        #[serde(default)]
        total_win: f64,
        #[serde(default)]
        line_count: u32,
    },

    /// Round complete, ready for next spin
    SpinEnd,

    // ═══════════════════════════════════════════════════════════════════════
    // WIN LINE CADENCE
    // ═══════════════════════════════════════════════════════════════════════
    /// Individual win line highlighted
    WinLineShow {
        line_id: u32,
        #[serde(default)]
        line_amount: f64,
        #[serde(default)]
        cells: Vec<CellPos>,
    },

    /// Win line highlight cleared
    WinLineClear { line_id: u32 },

    /// Cadence run reached a terminal outcome
    CadenceEnd {
        status: CadenceStatus,
        lines_presented: u32,
        lines_queued: u32,
    },

    /// Fallback total shown when the cadence did not show every line
    TotalWinSummary { total_win: f64 },

    // ═══════════════════════════════════════════════════════════════════════
    // CELEBRATION
    // ═══════════════════════════════════════════════════════════════════════
    /// Celebration overlay took the presentation lock
    CelebrationStart { tier: CelebrationTier, amount: f64 },

    /// Overlay entered a new phase
    CelebrationPhase {
        tier: CelebrationTier,
        phase: CelebrationPhase,
    },

    /// Overlay reached its terminal visual state
    CelebrationEnd {
        tier: CelebrationTier,
        #[serde(default)]
        skipped: bool,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // CONTROL
    // ═══════════════════════════════════════════════════════════════════════
    /// Presentation lock changed
    PresentationLock { locked: bool },

    /// Motion preferences changed
    MotionChanged {
        fast_mode: bool,
        reduced_motion: bool,
        skip_allowed: bool,
    },
}

impl Stage {
    /// Get stage category
    pub fn category(&self) -> StageCategory {
        match self {
            Stage::SpinStart | Stage::EvaluateWins { .. } | Stage::SpinEnd => {
                StageCategory::SpinLifecycle
            }

            Stage::ReelSpinning { .. }
            | Stage::ReelWrap { .. }
            | Stage::ReelBrake { .. }
            | Stage::ReelStop { .. }
            | Stage::ReelSettled { .. } => StageCategory::Reel,

            Stage::WinLineShow { .. }
            | Stage::WinLineClear { .. }
            | Stage::CadenceEnd { .. }
            | Stage::TotalWinSummary { .. } => StageCategory::WinLifecycle,

            Stage::CelebrationStart { .. }
            | Stage::CelebrationPhase { .. }
            | Stage::CelebrationEnd { .. } => StageCategory::Celebration,

            Stage::QuickStop | Stage::PresentationLock { .. } | Stage::MotionChanged { .. } => {
                StageCategory::Control
            }
        }
    }

    /// Get stage type name (snake_case)
    pub fn type_name(&self) -> &'static str {
        match self {
            Stage::SpinStart => "spin_start",
            Stage::ReelSpinning { .. } => "reel_spinning",
            Stage::ReelWrap { .. } => "reel_wrap",
            Stage::ReelBrake { .. } => "reel_brake",
            Stage::ReelStop { .. } => "reel_stop",
            Stage::ReelSettled { .. } => "reel_settled",
            Stage::QuickStop => "quick_stop",
            Stage::EvaluateWins { .. } => "evaluate_wins",
            Stage::SpinEnd => "spin_end",
            Stage::WinLineShow { .. } => "win_line_show",
            Stage::WinLineClear { .. } => "win_line_clear",
            Stage::CadenceEnd { .. } => "cadence_end",
            Stage::TotalWinSummary { .. } => "total_win_summary",
            Stage::CelebrationStart { .. } => "celebration_start",
            Stage::CelebrationPhase { .. } => "celebration_phase",
            Stage::CelebrationEnd { .. } => "celebration_end",
            Stage::PresentationLock { .. } => "presentation_lock",
            Stage::MotionChanged { .. } => "motion_changed",
        }
    }

    /// Reel index for reel-local stages
    pub fn reel_index(&self) -> Option<u8> {
        match self {
            Stage::ReelSpinning { reel_index }
            | Stage::ReelWrap { reel_index, .. }
            | Stage::ReelBrake { reel_index, .. }
            | Stage::ReelStop { reel_index, .. }
            | Stage::ReelSettled { reel_index } => Some(*reel_index),
            _ => None,
        }
    }

    /// High-frequency stages that shells usually skip when logging
    pub fn is_per_frame_noise(&self) -> bool {
        matches!(self, Stage::ReelWrap { .. })
    }
}

/// Stage category for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    SpinLifecycle,
    Reel,
    WinLifecycle,
    Celebration,
    Control,
}

impl StageCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SpinLifecycle => "Spin Lifecycle",
            Self::Reel => "Reels",
            Self::WinLifecycle => "Win Lifecycle",
            Self::Celebration => "Celebration",
            Self::Control => "Control",
        }
    }
}
