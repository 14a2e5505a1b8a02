//! Column Controller — per-reel spin physics and target injection
//!
//! ## Architecture
//!
//! ```text
//! Idle ──start_spin──► Spinning ──request_stop──► Stopping ──land──► Bouncing ──► Idle
//!                                                    │                    (bounce disabled)
//!                                                    └────────────────────────────► Idle
//! ```
//!
//! Physics runs in symbol heights. The scroll offset is the fraction of a
//! symbol travelled since the last wrap; each time it crosses 1.0 the strip
//! wraps and takes in one symbol. While spinning the symbol comes from the
//! column's deterministic stream. Once the brake engages, exactly
//! `ROW_COUNT + 1` further wraps happen, and they inject the target bottom
//! row first, then middle, then top, then the top again for the slot above
//! the window. The brake is a fixed-duration curve covering that exact
//! distance, so landing time depends only on when the brake engaged.

use rf_core::{
    ColumnSymbols, Completion, DiagnosticKind, Diagnostics, ROW_COUNT, Resolver, RfError,
    RfResult, SymbolId, completion,
};
use rf_stage::{Stage, StageEvent};
use serde::{Deserialize, Serialize};

use crate::config::{ColumnLayout, PresenterConfig};
use crate::curve::{BrakeCurve, MotionCurve, progress, settle_bounce};
use crate::motion::{MotionProfile, MotionSettings};
use crate::symbols::{SymbolStream, SymbolStrip};

/// Wraps that carry target symbols once the brake engages
const TARGET_WRAPS: u32 = ROW_COUNT as u32 + 1;

/// Lifecycle state of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnState {
    #[default]
    Idle,
    Spinning,
    Stopping,
    Bouncing,
}

/// Sub-phase of a spinning column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinPhase {
    Accelerating,
    Cruising,
    Braking,
}

/// How a column came to rest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopOutcome {
    pub reel_index: u8,
    /// Visible symbols after landing, top to bottom
    pub symbols: ColumnSymbols,
    /// Wraps since the spin started
    pub wrap_count: u32,
    /// Quick-stop was active when the column landed
    pub quick: bool,
    /// Snapped by the watchdog or a correctness fail-safe
    pub forced: bool,
    pub landed_at_ms: f64,
}

struct PendingStop {
    target: ColumnSymbols,
    requested_ms: f64,
    resolver: Option<Resolver<StopOutcome>>,
    completion: Completion<StopOutcome>,
    /// Filled at landing, handed to the resolver once settled
    outcome: Option<StopOutcome>,
}

#[derive(Debug, Clone, Copy)]
struct Brake {
    started_ms: f64,
    curve: BrakeCurve,
    travelled: f64,
}

impl Brake {
    fn eta_ms(&self) -> f64 {
        self.started_ms + self.curve.duration_ms()
    }
}

/// State machine for one reel
pub struct ColumnController {
    reel: u8,
    motion: MotionSettings,
    diagnostics: Diagnostics,
    layout: ColumnLayout,
    base_seed: u64,
    symbol_count: u32,
    spin_index: u64,
    stream: SymbolStream,
    strip: SymbolStrip,

    state: ColumnState,
    offset: f64,
    velocity: f64,
    wrap_count: u32,
    target_wraps: u32,
    quick_stop: bool,
    spin_started_ms: f64,
    last_tick_ms: f64,

    stop: Option<PendingStop>,
    brake: Option<Brake>,
    landing_floor_ms: Option<f64>,
    committed_ms: Option<f64>,
    landed_ms: Option<f64>,
    bounce_started_ms: f64,
    bounce_offset: f64,
}

impl ColumnController {
    pub fn new(
        reel: u8,
        config: &PresenterConfig,
        motion: MotionSettings,
        diagnostics: Diagnostics,
    ) -> Self {
        let mut stream = SymbolStream::new(config.seed, reel, 0, config.symbol_count);
        let strip = SymbolStrip::filled(&mut stream);
        Self {
            reel,
            motion,
            diagnostics,
            layout: config.layout,
            base_seed: config.seed,
            symbol_count: config.symbol_count,
            spin_index: 0,
            stream,
            strip,
            state: ColumnState::Idle,
            offset: 0.0,
            velocity: 0.0,
            wrap_count: 0,
            target_wraps: 0,
            quick_stop: false,
            spin_started_ms: 0.0,
            last_tick_ms: 0.0,
            stop: None,
            brake: None,
            landing_floor_ms: None,
            committed_ms: None,
            landed_ms: None,
            bounce_started_ms: 0.0,
            bounce_offset: 0.0,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // COMMANDS
    // ═══════════════════════════════════════════════════════════════════════

    /// Idle → Spinning
    pub fn start_spin(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) -> RfResult<()> {
        if self.state != ColumnState::Idle {
            let message = format!("start_spin while {:?}", self.state);
            self.diagnostics.report(
                DiagnosticKind::InvalidTransition,
                Some(self.reel),
                message.clone(),
                now_ms,
            );
            return Err(RfError::InvalidTransition(format!("reel {}: {}", self.reel, message)));
        }

        self.spin_index += 1;
        self.stream = SymbolStream::new(self.base_seed, self.reel, self.spin_index, self.symbol_count);
        self.state = ColumnState::Spinning;
        self.offset = 0.0;
        self.velocity = 0.0;
        self.wrap_count = 0;
        self.target_wraps = 0;
        self.quick_stop = false;
        self.spin_started_ms = now_ms;
        self.last_tick_ms = now_ms;
        self.stop = None;
        self.brake = None;
        self.landing_floor_ms = None;
        self.committed_ms = None;
        self.landed_ms = None;
        self.bounce_offset = 0.0;

        out.push(StageEvent::new(Stage::ReelSpinning { reel_index: self.reel }, now_ms));
        Ok(())
    }

    /// Arm the stop on a target window (top to bottom)
    ///
    /// Repeated calls return the same completion. From Idle the target is
    /// applied at once and the returned completion is already resolved.
    pub fn request_stop(
        &mut self,
        target: ColumnSymbols,
        now_ms: f64,
        out: &mut Vec<StageEvent>,
    ) -> Completion<StopOutcome> {
        match self.state {
            ColumnState::Idle => self.apply_immediately(target, now_ms, out),
            ColumnState::Spinning => {
                let (resolver, completion) = completion();
                self.stop = Some(PendingStop {
                    target,
                    requested_ms: now_ms,
                    resolver: Some(resolver),
                    completion: completion.clone(),
                    outcome: None,
                });
                self.state = ColumnState::Stopping;
                log::debug!("Reel {} stop armed at {:.1}ms: {:?}", self.reel, now_ms, target);
                completion
            }
            ColumnState::Stopping | ColumnState::Bouncing => {
                let injecting = self.target_wraps > 0 || self.state == ColumnState::Bouncing;
                match self.stop.as_mut() {
                    Some(stop) => {
                        if stop.target != target {
                            if injecting {
                                self.diagnostics.report(
                                    DiagnosticKind::TargetChanged,
                                    Some(self.reel),
                                    format!("target changed to {:?} after injection of {:?}", target, stop.target),
                                    now_ms,
                                );
                            } else {
                                log::debug!("Reel {} target replaced before injection", self.reel);
                                stop.target = target;
                            }
                        }
                        stop.completion.clone()
                    }
                    None => self.apply_immediately(target, now_ms, out),
                }
            }
        }
    }

    /// Shorten the stop; no-op while Idle
    pub fn request_quick_stop(&mut self, now_ms: f64) {
        if self.state == ColumnState::Idle || self.quick_stop {
            return;
        }
        self.quick_stop = true;

        let Some(brake) = self.brake else {
            return;
        };
        let profile = self.motion.profile();
        let elapsed = (now_ms - brake.started_ms).max(0.0);
        let remaining_ms = brake.curve.duration_ms() - elapsed;
        if remaining_ms <= profile.quick_brake_ms {
            return;
        }

        let duration = self.brake_duration(now_ms, profile.quick_brake_ms);
        let remaining = (brake.curve.distance() - brake.travelled).max(0.0);
        self.brake = Some(Brake {
            started_ms: now_ms,
            curve: BrakeCurve::new(
                remaining,
                duration,
                brake.curve.velocity(elapsed),
                profile.floor_velocity,
            ),
            travelled: 0.0,
        });
        log::debug!("Reel {} brake shortened to {:.0}ms", self.reel, duration);
    }

    /// Earliest time this column may land, so it never overtakes its left neighbour
    pub fn set_landing_floor(&mut self, floor_ms: Option<f64>) {
        self.landing_floor_ms = floor_ms;
    }

    /// Snap to a target from any state and resolve any pending stop
    pub fn force_snap(&mut self, target: ColumnSymbols, now_ms: f64, out: &mut Vec<StageEvent>) {
        let already_landed = self.landed_ms.is_some();
        let was_idle = self.state == ColumnState::Idle;

        self.strip.set_visible(&target);
        self.offset = 0.0;
        self.velocity = 0.0;
        self.bounce_offset = 0.0;
        self.brake = None;
        self.state = ColumnState::Idle;
        self.committed_ms.get_or_insert(now_ms);
        self.landed_ms = Some(now_ms);

        let outcome = StopOutcome {
            reel_index: self.reel,
            symbols: target,
            wrap_count: self.wrap_count,
            quick: self.quick_stop,
            forced: true,
            landed_at_ms: now_ms,
        };

        if !already_landed {
            out.push(self.stop_event(now_ms));
        }
        if !was_idle || !already_landed {
            out.push(StageEvent::new(Stage::ReelSettled { reel_index: self.reel }, now_ms));
        }
        if let Some(mut stop) = self.stop.take() {
            if let Some(resolver) = stop.resolver.take() {
                resolver.resolve(outcome);
            }
        }
        log::warn!("Reel {} snapped to {:?}", self.reel, target);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FRAME UPDATE
    // ═══════════════════════════════════════════════════════════════════════

    /// Advance to a frame timestamp
    pub fn tick(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) {
        let dt = (now_ms - self.last_tick_ms).max(0.0);
        self.last_tick_ms = self.last_tick_ms.max(now_ms);
        let now_ms = self.last_tick_ms;
        let profile = self.motion.profile();

        match self.state {
            ColumnState::Idle => {}
            ColumnState::Spinning | ColumnState::Stopping => {
                if let Some(stop) = &self.stop {
                    if now_ms - stop.requested_ms > profile.stop_watchdog_ms {
                        let target = stop.target;
                        self.diagnostics.report(
                            DiagnosticKind::StopWatchdog,
                            Some(self.reel),
                            format!(
                                "stop still pending after {:.0}ms, snapping",
                                now_ms - stop.requested_ms
                            ),
                            now_ms,
                        );
                        self.force_snap(target, now_ms, out);
                        return;
                    }
                }

                if self.brake.is_some() {
                    self.advance_brake(now_ms, &profile, out);
                } else {
                    self.advance_free(now_ms, dt, &profile, out);
                }
            }
            ColumnState::Bouncing => self.advance_bounce(now_ms, &profile, out),
        }
    }

    fn advance_free(
        &mut self,
        now_ms: f64,
        dt: f64,
        profile: &MotionProfile,
        out: &mut Vec<StageEvent>,
    ) {
        let ramp = MotionCurve::EaseInQuad.apply(progress(
            now_ms - self.spin_started_ms,
            profile.spin_accel_ms,
        ));
        self.velocity = profile.max_velocity * ramp;
        self.offset += self.velocity * dt;

        while self.offset >= 1.0 {
            self.offset -= 1.0;
            let symbol = self.stream.next_symbol();
            self.wrap(symbol, now_ms, out);

            if self.state == ColumnState::Stopping
                && self.wrap_count >= profile.min_wraps_for(self.quick_stop)
            {
                self.engage_brake(now_ms, profile, out);
                return;
            }
        }
    }

    fn engage_brake(&mut self, now_ms: f64, profile: &MotionProfile, out: &mut Vec<StageEvent>) {
        // Travel beyond this wrap in an oversized frame is dropped
        self.offset = self.offset.fract();
        let distance = TARGET_WRAPS as f64 - self.offset;
        let duration = self.brake_duration(now_ms, profile.brake_ms_for(self.quick_stop));

        self.brake = Some(Brake {
            started_ms: now_ms,
            curve: BrakeCurve::new(
                distance,
                duration,
                self.velocity.max(profile.floor_velocity),
                profile.floor_velocity,
            ),
            travelled: 0.0,
        });
        self.committed_ms = Some(now_ms);

        log::debug!(
            "Reel {} brake at {:.1}ms after {} wraps ({:.0}ms, {:.2} symbols)",
            self.reel,
            now_ms,
            self.wrap_count,
            duration,
            distance
        );
        out.push(StageEvent::new(
            Stage::ReelBrake {
                reel_index: self.reel,
                wrap_count: self.wrap_count,
            },
            now_ms,
        ));
    }

    fn brake_duration(&self, now_ms: f64, base_ms: f64) -> f64 {
        match self.landing_floor_ms {
            Some(floor) => base_ms.max(floor - now_ms),
            None => base_ms,
        }
    }

    fn advance_brake(&mut self, now_ms: f64, profile: &MotionProfile, out: &mut Vec<StageEvent>) {
        let Some(mut brake) = self.brake else {
            return;
        };
        let elapsed = (now_ms - brake.started_ms).max(0.0);
        let position = brake.curve.position(elapsed);
        self.offset += (position - brake.travelled).max(0.0);
        brake.travelled = position;
        self.velocity = brake.curve.velocity(elapsed).max(profile.floor_velocity);
        self.brake = Some(brake);

        while self.offset >= 1.0 && self.target_wraps < TARGET_WRAPS {
            self.offset -= 1.0;
            self.inject_target(now_ms, out);
        }

        if brake.curve.is_finished(elapsed) {
            // Float drift can leave the final wrap a hair short
            while self.target_wraps < TARGET_WRAPS {
                self.inject_target(now_ms, out);
            }
            self.land(now_ms, profile, out);
        }
    }

    fn inject_target(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) {
        let Some(target) = self.stop.as_ref().map(|s| s.target) else {
            return;
        };
        let k = self.target_wraps as usize;
        let symbol = if k < ROW_COUNT {
            target[ROW_COUNT - 1 - k]
        } else {
            target[0]
        };
        self.target_wraps += 1;
        self.wrap(symbol, now_ms, out);
    }

    fn wrap(&mut self, symbol: SymbolId, now_ms: f64, out: &mut Vec<StageEvent>) {
        self.strip.wrap(symbol);
        self.wrap_count += 1;
        out.push(StageEvent::new(
            Stage::ReelWrap {
                reel_index: self.reel,
                symbol,
                wrap_count: self.wrap_count,
            },
            now_ms,
        ));
    }

    fn land(&mut self, now_ms: f64, profile: &MotionProfile, out: &mut Vec<StageEvent>) {
        let Some(target) = self.stop.as_ref().map(|s| s.target) else {
            return;
        };

        let landed = self.strip.visible();
        if landed != target {
            self.diagnostics.report(
                DiagnosticKind::GridMismatch,
                Some(self.reel),
                format!("landed on {:?}, expected {:?}", landed, target),
                now_ms,
            );
        }
        self.strip.set_visible(&target);

        log::debug!(
            "Reel {} landed at {:.1}ms after {} wraps (residual {:.4})",
            self.reel,
            now_ms,
            self.wrap_count,
            self.offset
        );

        self.offset = 0.0;
        self.velocity = 0.0;
        self.brake = None;
        self.landed_ms = Some(now_ms);
        self.committed_ms.get_or_insert(now_ms);

        let outcome = StopOutcome {
            reel_index: self.reel,
            symbols: target,
            wrap_count: self.wrap_count,
            quick: self.quick_stop,
            forced: false,
            landed_at_ms: now_ms,
        };
        if let Some(stop) = self.stop.as_mut() {
            stop.outcome = Some(outcome);
        }
        out.push(self.stop_event(now_ms));

        if profile.bounce_enabled && profile.bounce_ms > 0.0 {
            self.state = ColumnState::Bouncing;
            self.bounce_started_ms = now_ms;
        } else {
            self.settle(now_ms, out);
        }
    }

    fn advance_bounce(&mut self, now_ms: f64, profile: &MotionProfile, out: &mut Vec<StageEvent>) {
        if !profile.bounce_enabled {
            self.settle(now_ms, out);
            return;
        }
        let t = progress(now_ms - self.bounce_started_ms, profile.bounce_ms);
        self.bounce_offset = settle_bounce(t, profile.bounce_amplitude);
        if t >= 1.0 {
            self.settle(now_ms, out);
        }
    }

    fn settle(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) {
        self.state = ColumnState::Idle;
        self.bounce_offset = 0.0;
        out.push(StageEvent::new(Stage::ReelSettled { reel_index: self.reel }, now_ms));

        if let Some(mut stop) = self.stop.take() {
            if let (Some(resolver), Some(outcome)) = (stop.resolver.take(), stop.outcome) {
                resolver.resolve(outcome);
            }
        }
    }

    fn apply_immediately(
        &mut self,
        target: ColumnSymbols,
        now_ms: f64,
        out: &mut Vec<StageEvent>,
    ) -> Completion<StopOutcome> {
        let first_landing = self.landed_ms.is_none();
        if !first_landing && self.strip.visible() != target {
            self.diagnostics.report(
                DiagnosticKind::TargetChanged,
                Some(self.reel),
                format!("target {:?} arrived after landing", target),
                now_ms,
            );
        }

        self.strip.set_visible(&target);
        self.offset = 0.0;
        self.velocity = 0.0;

        if first_landing {
            self.landed_ms = Some(now_ms);
            self.committed_ms = Some(now_ms);
            out.push(self.stop_event(now_ms));
            out.push(StageEvent::new(Stage::ReelSettled { reel_index: self.reel }, now_ms));
        }

        Completion::ready(StopOutcome {
            reel_index: self.reel,
            symbols: target,
            wrap_count: self.wrap_count,
            quick: self.quick_stop,
            forced: false,
            landed_at_ms: now_ms,
        })
    }

    fn stop_event(&self, now_ms: f64) -> StageEvent {
        StageEvent::new(
            Stage::ReelStop {
                reel_index: self.reel,
                symbols: self.strip.visible().to_vec(),
                wrap_count: self.wrap_count,
            },
            now_ms,
        )
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn reel_index(&self) -> u8 {
        self.reel
    }

    #[inline]
    pub fn state(&self) -> ColumnState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ColumnState::Idle
    }

    /// Motion sub-phase while Spinning or Stopping
    pub fn spin_phase(&self) -> Option<SpinPhase> {
        match self.state {
            ColumnState::Spinning | ColumnState::Stopping => {
                if self.brake.is_some() {
                    Some(SpinPhase::Braking)
                } else if self.last_tick_ms - self.spin_started_ms
                    < self.motion.profile().spin_accel_ms
                {
                    Some(SpinPhase::Accelerating)
                } else {
                    Some(SpinPhase::Cruising)
                }
            }
            _ => None,
        }
    }

    /// Landed on its target this spin (possibly still bouncing)
    pub fn has_landed(&self) -> bool {
        self.landed_ms.is_some()
    }

    /// Visible window, top to bottom
    pub fn visible(&self) -> ColumnSymbols {
        self.strip.visible()
    }

    pub fn strip(&self) -> &SymbolStrip {
        &self.strip
    }

    /// Scroll offset within the current symbol (0.0-1.0)
    pub fn scroll_offset(&self) -> f64 {
        self.offset
    }

    /// Scroll velocity in symbol heights per ms
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn wrap_count(&self) -> u32 {
        self.wrap_count
    }

    pub fn is_quick_stop(&self) -> bool {
        self.quick_stop
    }

    /// Pixel offset for rendering, including any settle overshoot
    pub fn render_offset_px(&self) -> f64 {
        self.layout.to_px(self.offset + self.bounce_offset)
    }

    /// Time the column committed to its stop (brake engaged or landed)
    pub fn committed_at(&self) -> Option<f64> {
        self.committed_ms
    }

    /// Expected landing time once committed
    pub fn landing_eta(&self) -> Option<f64> {
        match (self.landed_ms, self.brake) {
            (Some(landed), _) => Some(landed),
            (None, Some(brake)) => Some(brake.eta_ms()),
            _ => None,
        }
    }

    /// Completion of the pending stop, if one is armed
    pub fn pending_stop(&self) -> Option<Completion<StopOutcome>> {
        self.stop.as_ref().map(|s| s.completion.clone())
    }
}

impl std::fmt::Debug for ColumnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnController")
            .field("reel", &self.reel)
            .field("state", &self.state)
            .field("offset", &self.offset)
            .field("velocity", &self.velocity)
            .field("wrap_count", &self.wrap_count)
            .field("visible", &self.strip.visible())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionPreferences;

    const FRAME_MS: f64 = 16.0;

    fn column(preferences: MotionPreferences) -> (ColumnController, Diagnostics) {
        let diagnostics = Diagnostics::new();
        let column = ColumnController::new(
            0,
            &PresenterConfig::default(),
            MotionSettings::new(preferences),
            diagnostics.clone(),
        );
        (column, diagnostics)
    }

    /// Tick until Idle; returns the time the column went idle
    fn run_until_idle(column: &mut ColumnController, mut now: f64, out: &mut Vec<StageEvent>) -> f64 {
        for _ in 0..2000 {
            if column.is_idle() {
                return now;
            }
            now += FRAME_MS;
            column.tick(now, out);
        }
        panic!("column never settled: {:?}", column);
    }

    fn stage_names(out: &[StageEvent]) -> Vec<&'static str> {
        out.iter()
            .map(|e| e.type_name())
            .filter(|n| *n != "reel_wrap")
            .collect()
    }

    #[test]
    fn test_spin_and_land_on_target() {
        let (mut col, diagnostics) = column(MotionPreferences::default());
        let mut out = Vec::new();
        col.start_spin(0.0, &mut out).unwrap();
        assert_eq!(col.spin_phase(), Some(SpinPhase::Accelerating));

        let mut now = 0.0;
        for _ in 0..30 {
            now += FRAME_MS;
            col.tick(now, &mut out);
        }
        assert_eq!(col.spin_phase(), Some(SpinPhase::Cruising));
        let done = col.request_stop([3, 4, 5], now, &mut out);
        assert_eq!(col.state(), ColumnState::Stopping);
        run_until_idle(&mut col, now, &mut out);

        assert_eq!(col.visible(), [3, 4, 5]);
        assert_eq!(col.scroll_offset(), 0.0);
        assert!(col.wrap_count() >= 4 + TARGET_WRAPS);
        assert!(diagnostics.is_empty());

        let outcome = done.peek().unwrap();
        assert_eq!(outcome.symbols, [3, 4, 5]);
        assert!(!outcome.forced);

        assert_eq!(
            stage_names(&out),
            vec!["reel_spinning", "reel_brake", "reel_stop", "reel_settled"]
        );
    }

    #[test]
    fn test_stop_requested_immediately_waits_for_min_wraps() {
        let (mut col, _) = column(MotionPreferences::default());
        let mut out = Vec::new();
        col.start_spin(0.0, &mut out).unwrap();
        col.request_stop([1, 1, 2], 0.0, &mut out);
        run_until_idle(&mut col, 0.0, &mut out);

        let brake_wraps = out.iter().find_map(|e| match e.stage {
            Stage::ReelBrake { wrap_count, .. } => Some(wrap_count),
            _ => None,
        });
        assert_eq!(brake_wraps, Some(4));
        assert_eq!(col.wrap_count(), 4 + TARGET_WRAPS);
        assert_eq!(col.visible(), [1, 1, 2]);
    }

    #[test]
    fn test_quick_stop_uses_reduced_floor() {
        let (mut col, _) = column(MotionPreferences::default());
        let mut out = Vec::new();
        col.request_quick_stop(0.0); // Idle: no-op
        assert!(!col.is_quick_stop());

        col.start_spin(0.0, &mut out).unwrap();
        col.request_quick_stop(0.0);
        col.request_stop([9, 8, 7], 0.0, &mut out);
        let end = run_until_idle(&mut col, 0.0, &mut out);

        assert_eq!(col.visible(), [9, 8, 7]);
        assert!(col.wrap_count() >= 2 + TARGET_WRAPS);
        assert!(col.wrap_count() < 4 + TARGET_WRAPS);
        assert!(end < 1000.0);
    }

    #[test]
    fn test_quick_stop_shortens_active_brake() {
        let (mut col, _) = column(MotionPreferences::default());
        let mut out = Vec::new();
        col.start_spin(0.0, &mut out).unwrap();
        let mut now = 0.0;
        for _ in 0..40 {
            now += FRAME_MS;
            col.tick(now, &mut out);
        }
        col.request_stop([2, 2, 2], now, &mut out);
        while col.committed_at().is_none() {
            now += FRAME_MS;
            col.tick(now, &mut out);
        }
        let normal_eta = col.landing_eta().unwrap();
        col.request_quick_stop(now);
        assert!(col.landing_eta().unwrap() < normal_eta);

        run_until_idle(&mut col, now, &mut out);
        assert_eq!(col.visible(), [2, 2, 2]);
    }

    #[test]
    fn test_request_stop_from_idle_applies_immediately() {
        let (mut col, _) = column(MotionPreferences::default());
        let mut out = Vec::new();
        let done = col.request_stop([4, 5, 6], 10.0, &mut out);

        assert!(done.is_resolved());
        assert_eq!(col.visible(), [4, 5, 6]);
        assert_eq!(stage_names(&out), vec!["reel_stop", "reel_settled"]);
    }

    #[test]
    fn test_repeated_request_stop_returns_same_handle() {
        let (mut col, diagnostics) = column(MotionPreferences::default());
        let mut out = Vec::new();
        col.start_spin(0.0, &mut out).unwrap();

        let first = col.request_stop([1, 2, 3], 0.0, &mut out);
        let second = col.request_stop([4, 5, 6], 0.0, &mut out);
        assert!(first.same_as(&second));
        assert!(diagnostics.is_empty());

        run_until_idle(&mut col, 0.0, &mut out);
        assert_eq!(col.visible(), [4, 5, 6]);
    }

    #[test]
    fn test_target_change_after_injection_is_reported() {
        let (mut col, diagnostics) = column(MotionPreferences::default());
        let mut out = Vec::new();
        col.start_spin(0.0, &mut out).unwrap();
        col.request_stop([1, 2, 3], 0.0, &mut out);

        let mut now = 0.0;
        while col.target_wraps == 0 {
            now += FRAME_MS;
            col.tick(now, &mut out);
        }
        col.request_stop([7, 7, 7], now, &mut out);
        assert!(diagnostics.has(DiagnosticKind::TargetChanged));

        run_until_idle(&mut col, now, &mut out);
        assert_eq!(col.visible(), [1, 2, 3]);
    }

    #[test]
    fn test_start_while_spinning_is_rejected() {
        let (mut col, diagnostics) = column(MotionPreferences::default());
        let mut out = Vec::new();
        col.start_spin(0.0, &mut out).unwrap();
        assert!(col.start_spin(5.0, &mut out).is_err());
        assert!(diagnostics.has(DiagnosticKind::InvalidTransition));
    }

    #[test]
    fn test_large_frame_steps_still_land() {
        let (mut col, diagnostics) = column(MotionPreferences::default());
        let mut out = Vec::new();
        col.start_spin(0.0, &mut out).unwrap();
        col.request_stop([6, 0, 6], 0.0, &mut out);

        let mut now = 0.0;
        while !col.is_idle() {
            now += 250.0;
            col.tick(now, &mut out);
            assert!(now < 10_000.0);
        }
        assert_eq!(col.visible(), [6, 0, 6]);
        assert!(!diagnostics.has(DiagnosticKind::GridMismatch));
    }

    #[test]
    fn test_reduced_motion_skips_bounce() {
        let (mut col, _) = column(MotionPreferences {
            reduced_motion: true,
            ..Default::default()
        });
        let mut out = Vec::new();
        col.start_spin(0.0, &mut out).unwrap();
        col.request_stop([1, 2, 3], 0.0, &mut out);
        run_until_idle(&mut col, 0.0, &mut out);

        let stop = out.iter().find(|e| e.type_name() == "reel_stop").unwrap();
        let settled = out.iter().find(|e| e.type_name() == "reel_settled").unwrap();
        assert_eq!(stop.timestamp_ms, settled.timestamp_ms);
    }

    #[test]
    fn test_stop_watchdog_snaps_after_stall() {
        let (mut col, diagnostics) = column(MotionPreferences::default());
        let mut out = Vec::new();
        col.start_spin(0.0, &mut out).unwrap();
        let done = col.request_stop([5, 5, 1], 0.0, &mut out);

        col.tick(10_000.0, &mut out);
        assert!(col.is_idle());
        assert_eq!(col.visible(), [5, 5, 1]);
        assert!(diagnostics.has(DiagnosticKind::StopWatchdog));
        assert!(done.peek().unwrap().forced);
    }

    #[test]
    fn test_landing_floor_delays_brake() {
        let (mut col, _) = column(MotionPreferences::default());
        let mut out = Vec::new();
        col.start_spin(0.0, &mut out).unwrap();
        col.set_landing_floor(Some(2_000.0));
        col.request_stop([1, 2, 3], 0.0, &mut out);

        let end = run_until_idle(&mut col, 0.0, &mut out);
        let landed = out
            .iter()
            .find(|e| e.type_name() == "reel_stop")
            .map(|e| e.timestamp_ms)
            .unwrap();
        assert!(landed >= 2_000.0);
        assert!(end >= landed);
    }

    #[test]
    fn test_spins_are_deterministic() {
        let record = || {
            let (mut col, _) = column(MotionPreferences::default());
            let mut out = Vec::new();
            col.start_spin(0.0, &mut out).unwrap();
            col.request_stop([0, 1, 2], 0.0, &mut out);
            run_until_idle(&mut col, 0.0, &mut out);
            out
        };
        assert_eq!(record(), record());
    }
}
