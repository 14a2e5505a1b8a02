//! Presenter configuration

use serde::{Deserialize, Serialize};

use rf_core::RfResult;

use crate::motion::MotionPreferences;

/// Pixel geometry of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    /// Height of one symbol cell in pixels
    pub symbol_height_px: f64,
}

impl ColumnLayout {
    /// Convert a distance in symbol heights to pixels
    #[inline]
    pub fn to_px(&self, symbols: f64) -> f64 {
        symbols * self.symbol_height_px
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            symbol_height_px: 120.0,
        }
    }
}

/// Complete presenter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    /// Seed for filler symbols
    pub seed: u64,
    /// Distinct filler symbol ids (0..symbol_count)
    pub symbol_count: u32,
    pub layout: ColumnLayout,
    /// Initial motion preferences
    pub motion: MotionPreferences,
    /// Stop automatically once a result is known and the minimum spin elapsed
    pub auto_stop: bool,
    /// Compare the landed grid against the result after every stop
    pub verify_on_stop: bool,
    /// Record a stage trace per round
    pub record_trace: bool,
    /// Overall duration budget for one cadence run (ms)
    pub cadence_budget_ms: Option<f64>,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            symbol_count: 10,
            layout: ColumnLayout::default(),
            motion: MotionPreferences::default(),
            auto_stop: true,
            verify_on_stop: cfg!(debug_assertions),
            record_trace: true,
            cadence_budget_ms: None,
        }
    }
}

impl PresenterConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> RfResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_motion(mut self, motion: MotionPreferences) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify_on_stop = verify;
        self
    }

    pub fn with_cadence_budget(mut self, budget_ms: f64) -> Self {
        self.cadence_budget_ms = Some(budget_ms);
        self
    }
}
