//! Frame timing for the presentation loop

use serde::{Deserialize, Serialize};

/// Tracks frame timestamps delivered by the shell's frame callback
///
/// Timestamps are wall-clock milliseconds. Backwards jumps are clamped to a
/// zero delta so physics never integrates negative time. A non-finite first
/// timestamp starts the clock at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameClock {
    last_ms: Option<f64>,
    frame: u64,
}

/// Result of advancing the clock by one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    /// Frame timestamp (ms), never earlier than the previous frame
    pub now_ms: f64,
    /// Elapsed since the previous frame (ms)
    pub delta_ms: f64,
    /// Frame counter, starting at 1
    pub frame: u64,
    /// The delivered timestamp was earlier than the previous one, or not finite
    pub went_backwards: bool,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to a new frame timestamp
    pub fn advance(&mut self, now_ms: f64) -> FrameStep {
        self.frame += 1;
        let (now, delta, went_backwards) = match self.last_ms {
            None if !now_ms.is_finite() => (0.0, 0.0, true),
            None => (now_ms, 0.0, false),
            Some(last) if now_ms < last || !now_ms.is_finite() => (last, 0.0, true),
            Some(last) => (now_ms, now_ms - last, false),
        };
        self.last_ms = Some(now);
        FrameStep {
            now_ms: now,
            delta_ms: delta,
            frame: self.frame,
            went_backwards,
        }
    }

    /// Timestamp of the last frame
    #[inline]
    pub fn now(&self) -> Option<f64> {
        self.last_ms
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }
}
