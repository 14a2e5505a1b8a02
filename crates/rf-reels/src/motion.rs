//! Motion preferences and the resolved motion profile
//!
//! Every timing constant the presentation uses lives in [`MotionProfile`].
//! Components never cache a profile across frames: they hold a
//! [`MotionSettings`] handle and resolve the profile on every tick, so a
//! preference change takes effect on the next frame without re-initialisation.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// PREFERENCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Player-facing motion preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionPreferences {
    /// Shortened spin, cadence and celebration timings
    pub fast_mode: bool,
    /// No bounce, no escalation, slower peak reel speed
    pub reduced_motion: bool,
    /// Whether celebrations and cadence runs may be skipped
    pub skip_allowed: bool,
}

impl Default for MotionPreferences {
    fn default() -> Self {
        Self {
            fast_mode: false,
            reduced_motion: false,
            skip_allowed: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROFILE
// ═══════════════════════════════════════════════════════════════════════════════

/// Which base preset a profile was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPreset {
    #[default]
    Normal,
    Fast,
}

/// Resolved timing and physics constants
///
/// Distances are in symbol heights, velocities in symbol heights per ms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    pub preset: MotionPreset,
    pub preferences: MotionPreferences,

    // --- Spin physics ---
    /// Ease-in time from rest to peak velocity (ms)
    pub spin_accel_ms: f64,
    /// Peak scroll velocity
    pub max_velocity: f64,
    /// Velocity a braking column settles into just before landing
    pub floor_velocity: f64,
    /// Deceleration time once the brake engages (ms)
    pub brake_ms: f64,
    /// Deceleration time under quick-stop (ms)
    pub quick_brake_ms: f64,
    /// Wraps a column must complete before it may brake
    pub min_wraps: u32,
    /// Same, under quick-stop
    pub quick_min_wraps: u32,
    /// Spin time before the presenter auto-stops on a known result (ms)
    pub min_spin_ms: f64,
    /// Delay between consecutive column brakes (ms)
    pub stop_stagger_ms: f64,
    /// Divisor applied to the stagger under quick-stop
    pub quick_stagger_divisor: f64,
    /// A stopping column exceeding this is snapped to its target (ms)
    pub stop_watchdog_ms: f64,

    // --- Settle ---
    pub bounce_enabled: bool,
    pub bounce_ms: f64,
    /// Peak bounce overshoot
    pub bounce_amplitude: f64,

    // --- Win cadence ---
    pub win_line_highlight_ms: f64,
    pub win_line_fade_ms: f64,
    /// Lines shown before the cadence stops and the summary takes over
    pub max_cadence_lines: usize,

    // --- Celebration ---
    /// Overlay length for the lowest celebrated tier (ms)
    pub celebration_base_ms: f64,
    /// Climb through intermediate tiers instead of jumping to the final one
    pub celebration_escalation: bool,

    pub skip_allowed: bool,
}

impl MotionProfile {
    /// Normal gameplay timing
    pub fn normal() -> Self {
        Self {
            preset: MotionPreset::Normal,
            preferences: MotionPreferences::default(),
            spin_accel_ms: 300.0,
            max_velocity: 0.025,
            floor_velocity: 0.002,
            brake_ms: 320.0,
            quick_brake_ms: 140.0,
            min_wraps: 4,
            quick_min_wraps: 2,
            min_spin_ms: 800.0,
            stop_stagger_ms: 150.0,
            quick_stagger_divisor: 3.0,
            stop_watchdog_ms: 4000.0,
            bounce_enabled: true,
            bounce_ms: 180.0,
            bounce_amplitude: 0.12,
            win_line_highlight_ms: 1200.0,
            win_line_fade_ms: 250.0,
            max_cadence_lines: 20,
            celebration_base_ms: 3000.0,
            celebration_escalation: true,
            skip_allowed: true,
        }
    }

    /// Fast mode
    pub fn fast() -> Self {
        let normal = Self::normal();
        Self {
            preset: MotionPreset::Fast,
            spin_accel_ms: 150.0,
            max_velocity: 0.04,
            brake_ms: 200.0,
            quick_brake_ms: 100.0,
            min_spin_ms: 400.0,
            stop_stagger_ms: normal.stop_stagger_ms / 2.0,
            bounce_ms: 100.0,
            win_line_highlight_ms: 500.0,
            win_line_fade_ms: 0.0,
            max_cadence_lines: 6,
            celebration_base_ms: 1500.0,
            ..normal
        }
    }

    /// Resolve the profile for a set of preferences
    ///
    /// Total: every combination of flags yields a usable profile.
    pub fn resolve(preferences: MotionPreferences) -> Self {
        let mut profile = if preferences.fast_mode {
            Self::fast()
        } else {
            Self::normal()
        };

        if preferences.reduced_motion {
            profile.bounce_enabled = false;
            profile.celebration_escalation = false;
            profile.max_velocity *= 0.7;
        }

        profile.preferences = preferences;
        profile.skip_allowed = preferences.skip_allowed;
        profile
    }

    /// Scale every duration by a factor (< 1.0 = faster)
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = factor.max(0.01);
        Self {
            spin_accel_ms: self.spin_accel_ms * factor,
            max_velocity: self.max_velocity / factor,
            floor_velocity: self.floor_velocity / factor,
            brake_ms: self.brake_ms * factor,
            quick_brake_ms: self.quick_brake_ms * factor,
            min_spin_ms: self.min_spin_ms * factor,
            stop_stagger_ms: self.stop_stagger_ms * factor,
            stop_watchdog_ms: self.stop_watchdog_ms * factor,
            bounce_ms: self.bounce_ms * factor,
            win_line_highlight_ms: self.win_line_highlight_ms * factor,
            win_line_fade_ms: self.win_line_fade_ms * factor,
            celebration_base_ms: self.celebration_base_ms * factor,
            ..*self
        }
    }

    /// Minimum wraps before braking
    #[inline]
    pub fn min_wraps_for(&self, quick: bool) -> u32 {
        if quick { self.quick_min_wraps } else { self.min_wraps }
    }

    /// Brake duration
    #[inline]
    pub fn brake_ms_for(&self, quick: bool) -> f64 {
        if quick { self.quick_brake_ms } else { self.brake_ms }
    }

    /// Stagger between column brakes
    pub fn stop_stagger_for(&self, quick: bool) -> f64 {
        if quick && self.quick_stagger_divisor > 0.0 {
            self.stop_stagger_ms / self.quick_stagger_divisor
        } else {
            self.stop_stagger_ms
        }
    }

    /// Time to highlight and fade one line
    pub fn line_cycle_ms(&self) -> f64 {
        self.win_line_highlight_ms + self.win_line_fade_ms
    }
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self::normal()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETTINGS STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Handle returned by [`MotionSettings::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&MotionPreferences) + Send + Sync>;

struct SettingsInner {
    preferences: MotionPreferences,
    revision: u64,
    observers: Vec<(SubscriptionId, Observer)>,
    next_id: u64,
}

/// Shared, observable motion preference store
///
/// Cloning yields another handle onto the same store.
#[derive(Clone)]
pub struct MotionSettings {
    inner: Arc<RwLock<SettingsInner>>,
}

impl MotionSettings {
    pub fn new(preferences: MotionPreferences) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SettingsInner {
                preferences,
                revision: 0,
                observers: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Current preferences
    pub fn snapshot(&self) -> MotionPreferences {
        self.inner.read().preferences
    }

    /// Profile for the current preferences
    pub fn profile(&self) -> MotionProfile {
        MotionProfile::resolve(self.snapshot())
    }

    /// Bumped on every effective change
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// Replace the preferences, notifying observers if anything changed
    pub fn set(&self, preferences: MotionPreferences) {
        let observers: Vec<Observer> = {
            let mut inner = self.inner.write();
            if inner.preferences == preferences {
                return;
            }
            inner.preferences = preferences;
            inner.revision += 1;
            inner.observers.iter().map(|(_, o)| o.clone()).collect()
        };

        log::debug!(
            "Motion preferences changed: fast={} reduced={} skip={}",
            preferences.fast_mode,
            preferences.reduced_motion,
            preferences.skip_allowed
        );

        // Lock released so observers may read the store
        for observer in observers {
            observer(&preferences);
        }
    }

    /// Apply a change to the current preferences
    pub fn update(&self, f: impl FnOnce(&mut MotionPreferences)) {
        let mut preferences = self.snapshot();
        f(&mut preferences);
        self.set(preferences);
    }

    pub fn set_fast_mode(&self, enabled: bool) {
        self.update(|p| p.fast_mode = enabled);
    }

    pub fn set_reduced_motion(&self, enabled: bool) {
        self.update(|p| p.reduced_motion = enabled);
    }

    pub fn set_skip_allowed(&self, allowed: bool) {
        self.update(|p| p.skip_allowed = allowed);
    }

    /// Register a change observer
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&MotionPreferences) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.observers.push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.write();
        let before = inner.observers.len();
        inner.observers.retain(|(sid, _)| *sid != id);
        inner.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.inner.read().observers.len()
    }
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self::new(MotionPreferences::default())
    }
}

impl std::fmt::Debug for MotionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MotionSettings")
            .field("preferences", &inner.preferences)
            .field("revision", &inner.revision)
            .field("observers", &inner.observers.len())
            .finish()
    }
}
