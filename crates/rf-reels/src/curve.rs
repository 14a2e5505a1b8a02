//! Easing curves for reel motion, rollups and overlays

use serde::{Deserialize, Serialize};

/// Easing curve applied to a normalised progress value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionCurve {
    Linear,
    /// Quadratic ease-in (slow start)
    EaseInQuad,
    /// Quadratic ease-out (slow end)
    #[default]
    EaseOutQuad,
    EaseInOutQuad,
    /// Cubic ease-out
    EaseOutCubic,
}

impl MotionCurve {
    /// Apply the curve to a progress value (clamped to 0.0-1.0)
    #[inline]
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            MotionCurve::Linear => t,
            MotionCurve::EaseInQuad => t * t,
            MotionCurve::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            MotionCurve::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            MotionCurve::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// Progress of `elapsed` through `duration`, 1.0 for empty durations
#[inline]
pub fn progress(elapsed: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        1.0
    } else {
        (elapsed / duration).clamp(0.0, 1.0)
    }
}

/// Damped settle offset for a landed column, in symbol heights
///
/// Starts and ends at zero; positive values push the strip past its rest
/// position.
#[inline]
pub fn settle_bounce(t: f64, amplitude: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    amplitude * (std::f64::consts::PI * t).sin() * (1.0 - t)
}

// ═══════════════════════════════════════════════════════════════════════════════
// BRAKE CURVE
// ═══════════════════════════════════════════════════════════════════════════════

/// Time-parameterised deceleration covering an exact distance
///
/// Cubic Hermite from `(0, v_start)` to `(distance, v_end)` over a fixed
/// duration. Tangents are limited so the position never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrakeCurve {
    distance: f64,
    duration_ms: f64,
    m0: f64,
    m1: f64,
}

impl BrakeCurve {
    pub fn new(distance: f64, duration_ms: f64, v_start: f64, v_end: f64) -> Self {
        let distance = distance.max(0.0);
        let duration_ms = duration_ms.max(1.0);
        if distance <= f64::EPSILON {
            return Self {
                distance: 0.0,
                duration_ms,
                m0: 0.0,
                m1: 0.0,
            };
        }

        let mut m0 = (v_start.max(0.0) * duration_ms) / distance;
        let mut m1 = (v_end.max(0.0) * duration_ms) / distance;
        let norm = (m0 * m0 + m1 * m1).sqrt();
        if norm > 3.0 {
            m0 *= 3.0 / norm;
            m1 *= 3.0 / norm;
        }

        Self {
            distance,
            duration_ms,
            m0,
            m1,
        }
    }

    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    #[inline]
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Distance covered after `elapsed_ms`
    pub fn position(&self, elapsed_ms: f64) -> f64 {
        let u = progress(elapsed_ms, self.duration_ms);
        if u >= 1.0 {
            return self.distance;
        }
        let u2 = u * u;
        let u3 = u2 * u;
        let h10 = u3 - 2.0 * u2 + u;
        let h01 = -2.0 * u3 + 3.0 * u2;
        let h11 = u3 - u2;
        self.distance * (h10 * self.m0 + h01 + h11 * self.m1)
    }

    /// Instantaneous velocity after `elapsed_ms`
    pub fn velocity(&self, elapsed_ms: f64) -> f64 {
        let u = progress(elapsed_ms, self.duration_ms);
        let d10 = 3.0 * u * u - 4.0 * u + 1.0;
        let d01 = -6.0 * u * u + 6.0 * u;
        let d11 = 3.0 * u * u - 2.0 * u;
        (self.distance / self.duration_ms) * (d10 * self.m0 + d01 + d11 * self.m1)
    }

    pub fn is_finished(&self, elapsed_ms: f64) -> bool {
        elapsed_ms >= self.duration_ms
    }
}
