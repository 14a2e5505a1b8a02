//! Stage Taxonomy — Enums for presentation outcomes
//!
//! These enums classify win size, celebration phases and cadence outcomes.

use serde::{Deserialize, Serialize};

/// Celebration tier classification
///
/// Fixed tiers based on win-to-bet ratio:
/// - None: below 20x
/// - Big: 20x+
/// - Mega: 200x+
/// - Epic: 1000x+
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CelebrationTier {
    #[default]
    None,
    Big,
    Mega,
    Epic,
}

impl CelebrationTier {
    pub const BIG_RATIO: f64 = 20.0;
    pub const MEGA_RATIO: f64 = 200.0;
    pub const EPIC_RATIO: f64 = 1000.0;

    /// Classify a win against the bet
    ///
    /// Compares `total_win >= ratio * bet` rather than dividing, so a caller
    /// passing exactly `20.0 * bet` lands on the boundary.
    pub fn from_amounts(total_win: f64, bet: f64) -> Self {
        if !total_win.is_finite() || !bet.is_finite() || bet <= 0.0 {
            return Self::None;
        }
        match total_win {
            w if w >= Self::EPIC_RATIO * bet => Self::Epic,
            w if w >= Self::MEGA_RATIO * bet => Self::Mega,
            w if w >= Self::BIG_RATIO * bet => Self::Big,
            _ => Self::None,
        }
    }

    /// Classify a pre-computed win-to-bet ratio
    pub fn from_ratio(ratio: f64) -> Self {
        Self::from_amounts(ratio, 1.0)
    }

    /// Get minimum ratio for this tier
    pub fn min_ratio(&self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Big => Self::BIG_RATIO,
            Self::Mega => Self::MEGA_RATIO,
            Self::Epic => Self::EPIC_RATIO,
        }
    }

    /// Overlay duration scale relative to the base celebration length
    pub fn duration_multiplier(&self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Big => 1.0,
            Self::Mega => 1.6,
            Self::Epic => 2.4,
        }
    }

    /// Tiers the overlay climbs through on its way to this tier
    pub fn escalation_steps(&self) -> &'static [CelebrationTier] {
        match self {
            Self::None => &[],
            Self::Big => &[Self::Big],
            Self::Mega => &[Self::Big, Self::Mega],
            Self::Epic => &[Self::Big, Self::Mega, Self::Epic],
        }
    }

    pub fn is_celebrated(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Big => "BIG WIN",
            Self::Mega => "MEGA WIN",
            Self::Epic => "EPIC WIN",
        }
    }
}

/// Phase of the celebration overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CelebrationPhase {
    /// Overlay fades in
    Intro,
    /// Banner climbs to the given step tier
    Escalate { step: CelebrationTier },
    /// Final tier held on screen
    Hold,
    /// Overlay fades out
    Outro,
}

impl CelebrationPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Escalate { .. } => "escalate",
            Self::Hold => "hold",
            Self::Outro => "outro",
        }
    }
}

/// Terminal status of a win-line cadence run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceStatus {
    /// Every eligible line was shown
    Completed,
    /// The overall duration budget ran out mid-run
    Capped,
    /// Skipped, cancelled, or rejected because a run was already active
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        let bet = 0.1;
        assert_eq!(CelebrationTier::from_amounts(19.999 * bet, bet), CelebrationTier::None);
        assert_eq!(CelebrationTier::from_amounts(20.0 * bet, bet), CelebrationTier::Big);
        assert_eq!(CelebrationTier::from_amounts(199.0 * bet, bet), CelebrationTier::Big);
        assert_eq!(CelebrationTier::from_amounts(200.0 * bet, bet), CelebrationTier::Mega);
        assert_eq!(CelebrationTier::from_amounts(1000.0 * bet, bet), CelebrationTier::Epic);
    }

    #[test]
    fn test_tier_degenerate_inputs() {
        assert_eq!(CelebrationTier::from_amounts(100.0, 0.0), CelebrationTier::None);
        assert_eq!(CelebrationTier::from_amounts(100.0, -1.0), CelebrationTier::None);
        assert_eq!(CelebrationTier::from_amounts(f64::NAN, 1.0), CelebrationTier::None);
        assert_eq!(CelebrationTier::from_ratio(250.0), CelebrationTier::Mega);
    }

    #[test]
    fn test_escalation_steps() {
        assert!(CelebrationTier::None.escalation_steps().is_empty());
        assert_eq!(
            CelebrationTier::Epic.escalation_steps(),
            &[CelebrationTier::Big, CelebrationTier::Mega, CelebrationTier::Epic]
        );
        assert!(CelebrationTier::Epic > CelebrationTier::Mega);
    }
}
