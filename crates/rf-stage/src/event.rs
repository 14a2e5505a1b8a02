//! StageEvent — A stage occurrence with frame metadata
//!
//! Wraps a Stage with the frame time at which it was emitted.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// A stage event with timing metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// The canonical stage
    pub stage: Stage,

    /// Frame timestamp in milliseconds (shell clock)
    pub timestamp_ms: f64,

    /// Frame counter of the presenter loop, 0 when emitted outside a frame
    #[serde(default)]
    pub frame: u64,
}

impl StageEvent {
    /// Create a new stage event
    pub fn new(stage: Stage, timestamp_ms: f64) -> Self {
        Self {
            stage,
            timestamp_ms,
            frame: 0,
        }
    }

    /// Stamp the frame counter
    pub fn at_frame(mut self, frame: u64) -> Self {
        self.frame = frame;
        self
    }

    /// Get stage type name
    pub fn type_name(&self) -> &'static str {
        self.stage.type_name()
    }
}
