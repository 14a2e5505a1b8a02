//! Celebration Gate — tiered big-win overlay holding the presentation lock
//!
//! While a celebration runs, the gate is locked and the shell must refuse new
//! spins. The lock lives inside the active celebration, so ending, skipping or
//! dropping the celebration always releases it and wakes every unlock waiter.

use rf_core::{Completion, Resolver, completion};
use rf_stage::{CelebrationPhase, CelebrationTier, Stage, StageEvent};
use serde::{Deserialize, Serialize};

use crate::curve::{MotionCurve, progress};
use crate::motion::{MotionProfile, MotionSettings};

/// Share of the overlay spent in each phase
const INTRO_SHARE: f64 = 0.15;
const ESCALATE_SHARE: f64 = 0.55;
const HOLD_SHARE: f64 = 0.20;
const OUTRO_SHARE: f64 = 0.10;

/// How a `present` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CelebrationOutcome {
    /// Played through every phase
    Completed,
    /// Cut short by a skip
    Skipped,
    /// Another celebration already held the lock
    Ignored,
    /// Win below the lowest tier
    NotCelebrated,
}

struct ActiveCelebration {
    tier: CelebrationTier,
    amount: f64,
    started_ms: f64,
    phases: Vec<(CelebrationPhase, f64)>,
    index: usize,
    phase_started_ms: f64,
    rollup_ms: f64,
    displayed: f64,
    resolver: Option<Resolver<CelebrationOutcome>>,
    unlock_waiters: Vec<Resolver<()>>,
}

impl ActiveCelebration {
    fn current_phase(&self) -> Option<CelebrationPhase> {
        self.phases.get(self.index).map(|(phase, _)| *phase)
    }
}

impl Drop for ActiveCelebration {
    fn drop(&mut self) {
        for waiter in self.unlock_waiters.drain(..) {
            waiter.resolve(());
        }
    }
}

/// Phase plan for a tier
fn plan_phases(tier: CelebrationTier, profile: &MotionProfile) -> Vec<(CelebrationPhase, f64)> {
    let total = profile.celebration_base_ms * tier.duration_multiplier();
    let steps: Vec<CelebrationTier> = if profile.celebration_escalation {
        tier.escalation_steps().to_vec()
    } else {
        vec![tier]
    };
    let step_ms = total * ESCALATE_SHARE / steps.len().max(1) as f64;

    let mut phases = Vec::with_capacity(steps.len() + 3);
    phases.push((CelebrationPhase::Intro, total * INTRO_SHARE));
    for step in steps {
        phases.push((CelebrationPhase::Escalate { step }, step_ms));
    }
    phases.push((CelebrationPhase::Hold, total * HOLD_SHARE));
    phases.push((CelebrationPhase::Outro, total * OUTRO_SHARE));
    phases
}

/// Mutual-exclusion gate for celebration overlays
pub struct CelebrationGate {
    motion: MotionSettings,
    active: Option<ActiveCelebration>,
    last_displayed: f64,
}

impl CelebrationGate {
    pub fn new(motion: MotionSettings) -> Self {
        Self {
            motion,
            active: None,
            last_displayed: 0.0,
        }
    }

    /// Tier for a win against its bet
    pub fn compute_tier(total_win: f64, bet: f64) -> CelebrationTier {
        CelebrationTier::from_amounts(total_win, bet)
    }

    /// Play the overlay for a tier, taking the presentation lock
    pub fn present(
        &mut self,
        total_win: f64,
        tier: CelebrationTier,
        now_ms: f64,
        out: &mut Vec<StageEvent>,
    ) -> Completion<CelebrationOutcome> {
        if !tier.is_celebrated() {
            return Completion::ready(CelebrationOutcome::NotCelebrated);
        }
        if let Some(active) = &self.active {
            log::debug!(
                "Celebration {:?} ignored: {:?} already playing",
                tier,
                active.tier
            );
            return Completion::ready(CelebrationOutcome::Ignored);
        }

        let profile = self.motion.profile();
        let phases = plan_phases(tier, &profile);
        let rollup_ms: f64 = phases
            .iter()
            .filter(|(p, _)| matches!(p, CelebrationPhase::Intro | CelebrationPhase::Escalate { .. }))
            .map(|(_, ms)| ms)
            .sum();
        let (resolver, completion) = completion();

        log::debug!(
            "Celebration {} for {:.2} ({} phases, {:.0}ms)",
            tier.display_name(),
            total_win,
            phases.len(),
            phases.iter().map(|(_, ms)| ms).sum::<f64>()
        );
        out.push(StageEvent::new(
            Stage::CelebrationStart {
                tier,
                amount: total_win,
            },
            now_ms,
        ));
        out.push(StageEvent::new(Stage::PresentationLock { locked: true }, now_ms));
        out.push(StageEvent::new(
            Stage::CelebrationPhase {
                tier,
                phase: CelebrationPhase::Intro,
            },
            now_ms,
        ));

        self.active = Some(ActiveCelebration {
            tier,
            amount: total_win,
            started_ms: now_ms,
            phases,
            index: 0,
            phase_started_ms: now_ms,
            rollup_ms,
            displayed: 0.0,
            resolver: Some(resolver),
            unlock_waiters: Vec::new(),
        });
        completion
    }

    /// Advance phases and the amount rollup
    pub fn tick(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let t = progress(now_ms - active.started_ms, active.rollup_ms);
        active.displayed = active.amount * MotionCurve::EaseOutCubic.apply(t);

        loop {
            let Some((_, duration)) = active.phases.get(active.index).copied() else {
                break;
            };
            let phase_end = active.phase_started_ms + duration;
            if now_ms < phase_end {
                return;
            }
            active.index += 1;
            active.phase_started_ms = phase_end;

            match active.current_phase() {
                Some(phase) => out.push(StageEvent::new(
                    Stage::CelebrationPhase {
                        tier: active.tier,
                        phase,
                    },
                    phase_end,
                )),
                None => break,
            }
        }

        let end_ms = active.phase_started_ms;
        self.finish(CelebrationOutcome::Completed, end_ms, out);
    }

    /// Jump to the terminal state; honoured only while skipping is allowed
    pub fn request_skip(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) -> bool {
        if self.active.is_none() || !self.motion.profile().skip_allowed {
            return false;
        }
        self.finish(CelebrationOutcome::Skipped, now_ms, out);
        true
    }

    /// End the celebration regardless of skip preferences
    pub fn cancel(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.finish(CelebrationOutcome::Skipped, now_ms, out);
        true
    }

    fn finish(&mut self, outcome: CelebrationOutcome, at_ms: f64, out: &mut Vec<StageEvent>) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        self.last_displayed = active.amount;

        log::debug!("Celebration {:?} ended: {:?}", active.tier, outcome);
        out.push(StageEvent::new(
            Stage::CelebrationEnd {
                tier: active.tier,
                skipped: outcome == CelebrationOutcome::Skipped,
            },
            at_ms,
        ));
        out.push(StageEvent::new(Stage::PresentationLock { locked: false }, at_ms));

        if let Some(resolver) = active.resolver.take() {
            resolver.resolve(outcome);
        }
        // Dropping `active` releases the unlock waiters
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LOCK
    // ═══════════════════════════════════════════════════════════════════════

    /// True while a celebration holds the presentation lock
    pub fn is_locked(&self) -> bool {
        self.active.is_some()
    }

    /// Resolves once the lock is released (at once if unlocked)
    pub fn wait_unlocked(&mut self) -> Completion<()> {
        match self.active.as_mut() {
            Some(active) => {
                let (resolver, completion) = completion();
                active.unlock_waiters.push(resolver);
                completion
            }
            None => Completion::ready(()),
        }
    }

    pub fn active_tier(&self) -> Option<CelebrationTier> {
        self.active.as_ref().map(|a| a.tier)
    }

    pub fn current_phase(&self) -> Option<CelebrationPhase> {
        self.active.as_ref().and_then(|a| a.current_phase())
    }

    /// Rolled-up amount shown on the overlay
    pub fn displayed_amount(&self) -> f64 {
        match &self.active {
            Some(active) => active.displayed,
            None => self.last_displayed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionPreferences;

    fn gate(preferences: MotionPreferences) -> (CelebrationGate, MotionSettings) {
        let settings = MotionSettings::new(preferences);
        (CelebrationGate::new(settings.clone()), settings)
    }

    fn phases(out: &[StageEvent]) -> Vec<CelebrationPhase> {
        out.iter()
            .filter_map(|e| match e.stage {
                Stage::CelebrationPhase { phase, .. } => Some(phase),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_full_celebration_with_escalation() {
        let (mut gate, _) = gate(MotionPreferences::default());
        let mut out = Vec::new();
        let done = gate.present(300.0, CelebrationTier::Mega, 0.0, &mut out);
        assert!(gate.is_locked());

        let mut now = 0.0;
        while gate.is_locked() {
            now += 16.0;
            gate.tick(now, &mut out);
            assert!(now < 60_000.0);
        }

        assert_eq!(done.peek(), Some(CelebrationOutcome::Completed));
        assert_eq!(
            phases(&out),
            vec![
                CelebrationPhase::Intro,
                CelebrationPhase::Escalate {
                    step: CelebrationTier::Big
                },
                CelebrationPhase::Escalate {
                    step: CelebrationTier::Mega
                },
                CelebrationPhase::Hold,
                CelebrationPhase::Outro,
            ]
        );
        assert_eq!(gate.displayed_amount(), 300.0);
        // 3000ms base × 1.6 for Mega
        assert!(now >= 4799.0 && now <= 4800.0 + 32.0, "ended at {}", now);
    }

    #[test]
    fn test_reduced_motion_jumps_to_final_tier() {
        let (mut gate, _) = gate(MotionPreferences {
            reduced_motion: true,
            ..Default::default()
        });
        let mut out = Vec::new();
        gate.present(5000.0, CelebrationTier::Epic, 0.0, &mut out);
        gate.tick(100_000.0, &mut out);

        assert_eq!(
            phases(&out),
            vec![
                CelebrationPhase::Intro,
                CelebrationPhase::Escalate {
                    step: CelebrationTier::Epic
                },
                CelebrationPhase::Hold,
                CelebrationPhase::Outro,
            ]
        );
        assert!(!gate.is_locked());
    }

    #[test]
    fn test_second_present_is_ignored() {
        let (mut gate, _) = gate(MotionPreferences::default());
        let mut out = Vec::new();
        let first = gate.present(30.0, CelebrationTier::Big, 0.0, &mut out);
        let second = gate.present(400.0, CelebrationTier::Mega, 10.0, &mut out);

        assert_eq!(second.peek(), Some(CelebrationOutcome::Ignored));
        assert!(first.is_pending());
        assert_eq!(gate.active_tier(), Some(CelebrationTier::Big));
    }

    #[test]
    fn test_not_celebrated() {
        let (mut gate, _) = gate(MotionPreferences::default());
        let mut out = Vec::new();
        let done = gate.present(1.0, CelebrationTier::None, 0.0, &mut out);
        assert_eq!(done.peek(), Some(CelebrationOutcome::NotCelebrated));
        assert!(!gate.is_locked());
        assert!(out.is_empty());
    }

    #[test]
    fn test_skip_releases_lock_synchronously() {
        let (mut gate, settings) = gate(MotionPreferences::default());
        let mut out = Vec::new();
        let done = gate.present(250.0, CelebrationTier::Mega, 0.0, &mut out);
        let unlocked = gate.wait_unlocked();
        gate.tick(500.0, &mut out);
        assert!(gate.displayed_amount() < 250.0);

        settings.set_skip_allowed(false);
        assert!(!gate.request_skip(600.0, &mut out));
        assert!(gate.is_locked());

        settings.set_skip_allowed(true);
        assert!(gate.request_skip(700.0, &mut out));
        assert!(!gate.is_locked());
        assert!(unlocked.is_resolved());
        assert_eq!(done.peek(), Some(CelebrationOutcome::Skipped));
        assert_eq!(gate.displayed_amount(), 250.0);

        let lock_events: Vec<bool> = out
            .iter()
            .filter_map(|e| match e.stage {
                Stage::PresentationLock { locked } => Some(locked),
                _ => None,
            })
            .collect();
        assert_eq!(lock_events, vec![true, false]);
    }

    #[test]
    fn test_dropping_gate_releases_waiters() {
        let (mut gate, _) = gate(MotionPreferences::default());
        let mut out = Vec::new();
        let done = gate.present(30.0, CelebrationTier::Big, 0.0, &mut out);
        let unlocked = gate.wait_unlocked();
        drop(gate);

        assert_eq!(unlocked.peek(), Some(()));
        assert!(done.is_abandoned());
    }

    #[test]
    fn test_wait_unlocked_when_idle() {
        let (mut gate, _) = gate(MotionPreferences::default());
        assert!(gate.wait_unlocked().is_resolved());
    }
}
