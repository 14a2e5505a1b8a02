//! Slot Presenter — the shared per-frame loop for one reel presentation
//!
//! Owns every presentation component and routes a round through them:
//!
//! ```text
//! start_spin ──► Spinning ──(result + stop)──► Stopping ──► PresentingLines
//!                                                               │
//!                          Complete ◄── Celebrating ◄───────────┘
//! ```
//!
//! Components push render events into a shared outbox; the presenter stamps
//! them with the frame counter, applies win-line highlights to the grid,
//! invokes the shell's callbacks and records the round trace.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rf_core::{Completion, Diagnostics, FrameClock, RfError, RfResult, RoundResult};
use rf_stage::{CelebrationTier, Stage, StageEvent, StageTrace};
use serde::{Deserialize, Serialize};

use crate::cadence::{CadenceOutcome, WinCadenceSequencer};
use crate::callbacks::PresenterCallbacks;
use crate::celebration::{CelebrationGate, CelebrationOutcome};
use crate::config::PresenterConfig;
use crate::grid::{GridCoordinator, StopAllOutcome};
use crate::motion::{MotionSettings, SubscriptionId};

/// Where the current round is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    #[default]
    Idle,
    Spinning,
    Stopping,
    PresentingLines,
    Celebrating,
    Complete,
}

impl RoundPhase {
    /// Whether a new spin may start from this phase (lock permitting)
    pub fn accepts_spin(&self) -> bool {
        matches!(self, RoundPhase::Idle | RoundPhase::Complete)
    }
}

/// Session counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PresenterStats {
    pub rounds_started: u64,
    pub rounds_completed: u64,
    pub quick_stops: u64,
    pub celebrations: u64,
    pub celebrations_skipped: u64,
    /// Columns snapped back onto the result after a failed check
    pub columns_repaired: u64,
}

#[derive(Default)]
struct Round {
    result: Option<RoundResult>,
    spin_started_ms: f64,
    stop_requested: bool,
    stop: Option<Completion<StopAllOutcome>>,
    cadence: Option<Completion<CadenceOutcome>>,
    celebration: Option<Completion<CelebrationOutcome>>,
}

/// Frame-driven presenter for one 5×3 reel set
pub struct SlotPresenter {
    config: PresenterConfig,
    motion: MotionSettings,
    diagnostics: Diagnostics,
    grid: GridCoordinator,
    cadence: WinCadenceSequencer,
    celebration: CelebrationGate,
    callbacks: PresenterCallbacks,
    clock: FrameClock,
    phase: RoundPhase,
    round: Round,
    round_counter: u64,
    outbox: Vec<StageEvent>,
    trace: Option<StageTrace>,
    motion_dirty: Arc<AtomicBool>,
    motion_subscription: SubscriptionId,
    stats: PresenterStats,
}

impl SlotPresenter {
    /// Create a presenter with its own preference store
    pub fn new(config: PresenterConfig) -> Self {
        let motion = MotionSettings::new(config.motion);
        Self::with_settings(config, motion)
    }

    /// Create a presenter sharing an external preference store
    pub fn with_settings(config: PresenterConfig, motion: MotionSettings) -> Self {
        let diagnostics = Diagnostics::new();
        let motion_dirty = Arc::new(AtomicBool::new(false));
        let dirty = motion_dirty.clone();
        let motion_subscription = motion.subscribe(move |_| dirty.store(true, Ordering::Release));

        Self {
            grid: GridCoordinator::new(&config, motion.clone(), diagnostics.clone()),
            cadence: WinCadenceSequencer::new(motion.clone()),
            celebration: CelebrationGate::new(motion.clone()),
            callbacks: PresenterCallbacks::default(),
            clock: FrameClock::new(),
            phase: RoundPhase::Idle,
            round: Round::default(),
            round_counter: 0,
            outbox: Vec::new(),
            trace: None,
            motion_dirty,
            motion_subscription,
            stats: PresenterStats::default(),
            config,
            motion,
            diagnostics,
        }
    }

    /// Install render hooks (builder pattern)
    pub fn with_callbacks(mut self, callbacks: PresenterCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Replace every render hook at once
    pub fn set_callbacks(&mut self, callbacks: PresenterCallbacks) {
        self.callbacks = callbacks;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SHELL INPUT
    // ═══════════════════════════════════════════════════════════════════════

    /// Start a new round
    pub fn start_spin(&mut self, now_ms: f64) -> RfResult<()> {
        let now_ms = self.input_time(now_ms);
        if self.celebration.is_locked() {
            return Err(RfError::PresentationLocked);
        }
        if !self.phase.accepts_spin() {
            return Err(RfError::InvalidTransition(format!(
                "start_spin while {:?}",
                self.phase
            )));
        }
        if !self.grid.is_idle() {
            return Err(RfError::InvalidTransition(
                "start_spin while reels are still moving".into(),
            ));
        }

        // Flush the previous round's tail into its own trace
        self.flush();

        self.cadence.clear_queue();
        self.grid.clear_highlights();
        self.round_counter += 1;
        self.round = Round {
            spin_started_ms: now_ms,
            ..Round::default()
        };
        if self.config.record_trace {
            self.trace = Some(
                StageTrace::new(format!("round-{}", self.round_counter))
                    .with_metadata("seed", serde_json::json!(self.config.seed)),
            );
        }

        self.outbox.push(StageEvent::new(Stage::SpinStart, now_ms));
        self.grid.start_all(now_ms, &mut self.outbox)?;
        self.phase = RoundPhase::Spinning;
        self.stats.rounds_started += 1;
        log::info!("Round {} spin started at {:.1}ms", self.round_counter, now_ms);

        self.flush();
        Ok(())
    }

    /// Deliver the authority payload for the spinning round
    pub fn receive_result(&mut self, result: RoundResult, now_ms: f64) -> RfResult<()> {
        let now_ms = self.input_time(now_ms);
        result.validate()?;
        if self.phase != RoundPhase::Spinning {
            return Err(RfError::InvalidTransition(format!(
                "receive_result while {:?}",
                self.phase
            )));
        }
        if self.round.result.is_some() {
            return Err(RfError::InvalidTransition(
                "result already received for this round".into(),
            ));
        }

        log::info!(
            "Round {} result: {} lines, total {:.2} on bet {:.2}",
            self.round_counter,
            result.win_lines.len(),
            result.total_win(),
            result.bet
        );
        for line in &result.win_lines {
            self.cadence.push(line.clone());
        }
        self.grid.set_pending_result(result.grid);
        if let (Some(trace), Some(round_id)) = (self.trace.as_mut(), result.round_id.as_ref()) {
            trace.round_id = Some(round_id.clone());
        }
        self.round.result = Some(result);

        if self.grid.is_quick_stop() {
            self.begin_quick_stop(now_ms);
        } else if self.round.stop_requested {
            self.begin_stop(now_ms);
        }
        self.flush();
        Ok(())
    }

    /// Manual stop; deferred until the result is known
    pub fn stop_spin(&mut self, now_ms: f64) -> RfResult<()> {
        let now_ms = self.input_time(now_ms);
        match self.phase {
            RoundPhase::Spinning => {
                self.round.stop_requested = true;
                if self.round.result.is_some() {
                    self.begin_stop(now_ms);
                }
                self.flush();
                Ok(())
            }
            RoundPhase::Stopping => Ok(()),
            phase => Err(RfError::InvalidTransition(format!(
                "stop_spin while {:?}",
                phase
            ))),
        }
    }

    /// Shorten the stop; returns false when no reels are moving
    pub fn quick_stop(&mut self, now_ms: f64) -> bool {
        let now_ms = self.input_time(now_ms);
        if !matches!(self.phase, RoundPhase::Spinning | RoundPhase::Stopping) {
            return false;
        }
        self.round.stop_requested = true;
        let honoured = self.begin_quick_stop(now_ms);
        self.flush();
        honoured
    }

    /// Skip the celebration if one is playing, otherwise the line cadence
    pub fn skip(&mut self, now_ms: f64) -> bool {
        let now_ms = self.input_time(now_ms);
        let skipped = if self.celebration.is_locked() {
            let skipped = self.celebration.request_skip(now_ms, &mut self.outbox);
            if skipped {
                self.stats.celebrations_skipped += 1;
            }
            skipped
        } else {
            self.cadence.request_skip(now_ms, &mut self.outbox)
        };
        self.flush();
        skipped
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FRAME LOOP
    // ═══════════════════════════════════════════════════════════════════════

    /// Advance one frame
    pub fn tick(&mut self, now_ms: f64) {
        let step = self.clock.advance(now_ms);
        if step.went_backwards {
            self.diagnostics.report(
                rf_core::DiagnosticKind::NonMonotonicClock,
                None,
                format!("frame time {:.1}ms is before {:.1}ms", now_ms, step.now_ms),
                step.now_ms,
            );
        }
        let now_ms = step.now_ms;

        self.grid.tick(now_ms, &mut self.outbox);
        self.cadence.tick(now_ms, &mut self.outbox);
        self.celebration.tick(now_ms, &mut self.outbox);
        self.advance_round(now_ms);

        if self.motion_dirty.swap(false, Ordering::AcqRel) {
            let preferences = self.motion.snapshot();
            log::debug!("Motion preferences changed: {:?}", preferences);
            self.outbox.push(StageEvent::new(
                Stage::MotionChanged {
                    fast_mode: preferences.fast_mode,
                    reduced_motion: preferences.reduced_motion,
                    skip_allowed: preferences.skip_allowed,
                },
                now_ms,
            ));
        }

        self.flush();
    }

    fn advance_round(&mut self, now_ms: f64) {
        loop {
            match self.phase {
                RoundPhase::Spinning => {
                    let Some(result) = self.round.result.as_ref() else {
                        return;
                    };
                    let min_spin_elapsed = now_ms - self.round.spin_started_ms
                        >= self.motion.profile().min_spin_ms;
                    let due = self.round.stop_requested
                        || (self.config.auto_stop && min_spin_elapsed);
                    if !due {
                        return;
                    }
                    log::trace!("Stop due for round {:?}", result.round_id);
                    self.begin_stop(now_ms);
                }
                RoundPhase::Stopping => {
                    let Some(outcome) = self.round.stop.as_ref().and_then(|s| s.peek()) else {
                        return;
                    };
                    self.on_reels_stopped(outcome, now_ms);
                }
                RoundPhase::PresentingLines => {
                    let Some(outcome) = self.round.cadence.as_ref().and_then(|c| c.peek()) else {
                        return;
                    };
                    self.on_lines_presented(outcome, now_ms);
                }
                RoundPhase::Celebrating => {
                    let Some(outcome) = self.round.celebration.as_ref().and_then(|c| c.peek())
                    else {
                        return;
                    };
                    log::debug!("Celebration outcome: {:?}", outcome);
                    self.outbox.push(StageEvent::new(Stage::SpinEnd, now_ms));
                    self.phase = RoundPhase::Complete;
                    self.stats.rounds_completed += 1;
                    log::info!("Round {} complete at {:.1}ms", self.round_counter, now_ms);
                }
                RoundPhase::Idle | RoundPhase::Complete => return,
            }
        }
    }

    fn begin_stop(&mut self, now_ms: f64) {
        if self.round.stop.is_some() {
            return;
        }
        let Some(grid) = self.round.result.as_ref().map(|r| r.grid) else {
            return;
        };
        log::debug!("Stopping reels at {:.1}ms", now_ms);
        self.round.stop = Some(self.grid.stop_all(grid, now_ms, &mut self.outbox));
        self.phase = RoundPhase::Stopping;
    }

    fn begin_quick_stop(&mut self, now_ms: f64) -> bool {
        let first = !self.grid.is_quick_stop();
        let completion = self.grid.request_quick_stop(now_ms, &mut self.outbox);
        if first && self.grid.is_quick_stop() {
            self.stats.quick_stops += 1;
        }
        if let Some(completion) = completion {
            if self.round.stop.is_none() {
                self.round.stop = Some(completion);
                self.phase = RoundPhase::Stopping;
            }
        }
        self.grid.is_quick_stop()
    }

    fn on_reels_stopped(&mut self, outcome: StopAllOutcome, now_ms: f64) {
        let Some(result) = self.round.result.as_ref() else {
            return;
        };
        let grid = result.grid;
        let total_win = result.total_win();
        let line_count = result.win_lines.len() as u32;

        if outcome.any_forced() {
            log::warn!("Round {} stop needed a forced snap", self.round_counter);
        }
        if self.config.verify_on_stop {
            let verification = self.grid.verify_correctness(&grid, now_ms);
            if !verification.is_ok() {
                let repaired = self.grid.repair(&grid, &verification, now_ms, &mut self.outbox);
                self.stats.columns_repaired += repaired as u64;
                log::warn!("Repaired {} column(s) after grid check", repaired);
            }
        }

        self.outbox.push(StageEvent::new(
            Stage::EvaluateWins {
                total_win,
                line_count,
            },
            now_ms,
        ));
        self.round.cadence = Some(self.cadence.run(
            now_ms,
            self.config.cadence_budget_ms,
            &mut self.outbox,
        ));
        self.phase = RoundPhase::PresentingLines;
    }

    fn on_lines_presented(&mut self, outcome: CadenceOutcome, now_ms: f64) {
        let Some(result) = self.round.result.as_ref() else {
            return;
        };
        let total_win = result.total_win();
        let tier = CelebrationGate::compute_tier(total_win, result.bet);

        if outcome.needs_summary() {
            self.outbox
                .push(StageEvent::new(Stage::TotalWinSummary { total_win }, now_ms));
        }
        if tier.is_celebrated() {
            self.stats.celebrations += 1;
        }
        self.round.celebration =
            Some(self.celebration.present(total_win, tier, now_ms, &mut self.outbox));
        self.phase = RoundPhase::Celebrating;
    }

    fn flush(&mut self) {
        let frame = self.clock.frame();
        for event in std::mem::take(&mut self.outbox) {
            let event = event.at_frame(frame);
            match &event.stage {
                Stage::WinLineShow { cells, .. } => self.grid.highlight_cells(cells),
                Stage::WinLineClear { .. } => self.grid.clear_highlights(),
                stage if !stage.is_per_frame_noise() => {
                    log::debug!("{} at {:.1}ms", event.type_name(), event.timestamp_ms)
                }
                _ => {}
            }
            self.callbacks.dispatch(&event);
            if let Some(trace) = self.trace.as_mut() {
                trace.push(event);
            }
        }
        for diagnostic in self.diagnostics.drain_new() {
            self.callbacks.report(&diagnostic);
        }
    }

    /// Shell inputs are stamped no earlier than the last frame
    fn input_time(&self, now_ms: f64) -> f64 {
        match self.clock.now() {
            Some(last) if now_ms < last || !now_ms.is_finite() => last,
            None if !now_ms.is_finite() => 0.0,
            _ => now_ms,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    /// True while a celebration holds the presentation lock
    pub fn is_locked(&self) -> bool {
        self.celebration.is_locked()
    }

    /// Resolves once the presentation lock is released
    pub fn wait_unlocked(&mut self) -> Completion<()> {
        self.celebration.wait_unlocked()
    }

    pub fn round_phase(&self) -> RoundPhase {
        self.phase
    }

    /// Number of rounds started
    pub fn round_count(&self) -> u64 {
        self.round_counter
    }

    /// Payload of the current round, once received
    pub fn result(&self) -> Option<&RoundResult> {
        self.round.result.as_ref()
    }

    /// Tier the current round will celebrate, once the result is known
    pub fn pending_tier(&self) -> Option<CelebrationTier> {
        self.round
            .result
            .as_ref()
            .map(|r| CelebrationGate::compute_tier(r.total_win(), r.bet))
    }

    pub fn grid(&self) -> &GridCoordinator {
        &self.grid
    }

    pub fn cadence(&self) -> &WinCadenceSequencer {
        &self.cadence
    }

    pub fn celebration(&self) -> &CelebrationGate {
        &self.celebration
    }

    pub fn motion(&self) -> &MotionSettings {
        &self.motion
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn config(&self) -> &PresenterConfig {
        &self.config
    }

    pub fn stats(&self) -> &PresenterStats {
        &self.stats
    }

    /// Trace of the current (or last) round
    pub fn trace(&self) -> Option<&StageTrace> {
        self.trace.as_ref()
    }

    pub fn take_trace(&mut self) -> Option<StageTrace> {
        self.trace.take()
    }
}

impl Drop for SlotPresenter {
    fn drop(&mut self) {
        self.motion.unsubscribe(self.motion_subscription);
    }
}

impl std::fmt::Debug for SlotPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotPresenter")
            .field("phase", &self.phase)
            .field("round", &self.round_counter)
            .field("frame", &self.clock.frame())
            .field("locked", &self.is_locked())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
