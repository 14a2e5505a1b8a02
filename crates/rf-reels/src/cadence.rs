//! Win Cadence Sequencer — presents winning lines one at a time
//!
//! Each line is highlighted, cleared, and followed by a fade gap before the
//! next one. Phase deadlines are laid out on the ideal schedule from the run
//! start, so a late frame catches up (possibly through several phases) rather
//! than pushing every later line back.

use rf_core::{Completion, Resolver, WinLine, completion};
use rf_stage::{CadenceStatus, Stage, StageEvent};
use serde::{Deserialize, Serialize};

use crate::motion::MotionSettings;
use crate::paytable::PaylineTable;

/// Terminal result of one cadence run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceOutcome {
    pub status: CadenceStatus,
    /// Lines that were highlighted
    pub lines_presented: usize,
    /// Lines queued when the run started
    pub lines_queued: usize,
    /// Sum of all queued line amounts
    pub total_amount: f64,
}

impl CadenceOutcome {
    /// Whether the shell should fall back to a total-win summary
    pub fn needs_summary(&self) -> bool {
        self.lines_presented < self.lines_queued
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LinePhase {
    Highlight { deadline_ms: f64 },
    Fade { deadline_ms: f64 },
}

impl LinePhase {
    fn deadline(&self) -> f64 {
        match self {
            LinePhase::Highlight { deadline_ms } | LinePhase::Fade { deadline_ms } => *deadline_ms,
        }
    }
}

struct ActiveRun {
    started_ms: f64,
    budget_ms: Option<f64>,
    limit: usize,
    index: usize,
    phase: LinePhase,
    presented: usize,
    skip_requested: bool,
    resolver: Option<Resolver<CadenceOutcome>>,
}

/// Sequencer owning the round's queue of winning lines
pub struct WinCadenceSequencer {
    motion: MotionSettings,
    paylines: PaylineTable,
    queue: Vec<WinLine>,
    run: Option<ActiveRun>,
}

impl WinCadenceSequencer {
    pub fn new(motion: MotionSettings) -> Self {
        Self::with_paylines(motion, PaylineTable::standard_20())
    }

    pub fn with_paylines(motion: MotionSettings, paylines: PaylineTable) -> Self {
        Self {
            motion,
            paylines,
            queue: Vec::new(),
            run: None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // QUEUE
    // ═══════════════════════════════════════════════════════════════════════

    /// Append a full line descriptor
    pub fn push(&mut self, line: WinLine) {
        self.queue.push(line);
    }

    /// Append a full-length payline win by id
    ///
    /// No deduplication or reordering: insertion order is presentation order.
    pub fn add_line(&mut self, line_id: u32, amount: f64) {
        let cells = self.paylines.cells(line_id);
        self.queue.push(WinLine::new(line_id, cells, amount));
    }

    /// Drop all queued lines (next spin)
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn queue(&self) -> &[WinLine] {
        &self.queue
    }

    pub fn queued_amount(&self) -> f64 {
        self.queue.iter().map(|l| l.amount()).sum()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RUN
    // ═══════════════════════════════════════════════════════════════════════

    /// Present the queued lines in order
    ///
    /// A call while a run is active resolves at once as cancelled and leaves
    /// the active run untouched.
    pub fn run(
        &mut self,
        now_ms: f64,
        budget_ms: Option<f64>,
        out: &mut Vec<StageEvent>,
    ) -> Completion<CadenceOutcome> {
        if self.run.is_some() {
            log::debug!("Cadence run rejected: already running");
            return Completion::ready(CadenceOutcome {
                status: CadenceStatus::Cancelled,
                lines_presented: 0,
                lines_queued: self.queue.len(),
                total_amount: self.queued_amount(),
            });
        }

        if self.queue.is_empty() {
            return Completion::ready(CadenceOutcome {
                status: CadenceStatus::Completed,
                lines_presented: 0,
                lines_queued: 0,
                total_amount: 0.0,
            });
        }

        let profile = self.motion.profile();
        let limit = self.queue.len().min(profile.max_cadence_lines.max(1));
        let (resolver, completion) = completion();
        self.run = Some(ActiveRun {
            started_ms: now_ms,
            budget_ms,
            limit,
            index: 0,
            phase: LinePhase::Highlight {
                deadline_ms: now_ms + profile.win_line_highlight_ms,
            },
            presented: 0,
            skip_requested: false,
            resolver: Some(resolver),
        });
        log::debug!(
            "Cadence run: {} of {} lines, budget {:?}",
            limit,
            self.queue.len(),
            budget_ms
        );

        self.present(0, now_ms, out);
        completion
    }

    /// Advance phases up to a frame timestamp
    pub fn tick(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) {
        let profile = self.motion.profile();

        loop {
            let Some(run) = self.run.as_mut() else {
                return;
            };
            let deadline = run.phase.deadline();

            if let Some(budget) = run.budget_ms {
                let cap_at = run.started_ms + budget;
                if cap_at < deadline && now_ms >= cap_at {
                    self.finish(CadenceStatus::Capped, cap_at, out);
                    return;
                }
            }
            if now_ms < deadline {
                return;
            }

            match run.phase {
                LinePhase::Highlight { .. } => {
                    run.phase = LinePhase::Fade {
                        deadline_ms: deadline + profile.win_line_fade_ms,
                    };
                    self.clear_current(deadline, out);
                }
                LinePhase::Fade { .. } => {
                    if run.skip_requested {
                        self.finish(CadenceStatus::Cancelled, deadline, out);
                        return;
                    }
                    run.index += 1;
                    if run.index >= run.limit {
                        self.finish(CadenceStatus::Completed, deadline, out);
                        return;
                    }
                    run.phase = LinePhase::Highlight {
                        deadline_ms: deadline + profile.win_line_highlight_ms,
                    };
                    let index = run.index;
                    self.present(index, deadline, out);
                }
            }
        }
    }

    /// Cut the run short after the current line's fade
    ///
    /// Honoured only while skipping is allowed.
    pub fn request_skip(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) -> bool {
        let profile = self.motion.profile();
        if !profile.skip_allowed {
            return false;
        }
        let Some(run) = self.run.as_mut() else {
            return false;
        };

        run.skip_requested = true;
        if let LinePhase::Highlight { .. } = run.phase {
            run.phase = LinePhase::Fade {
                deadline_ms: now_ms + profile.win_line_fade_ms,
            };
            self.clear_current(now_ms, out);
        }
        self.tick(now_ms, out);
        true
    }

    /// Abort immediately, regardless of skip preferences
    pub fn cancel(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) -> bool {
        let Some(run) = self.run.as_ref() else {
            return false;
        };
        if let LinePhase::Highlight { .. } = run.phase {
            self.clear_current(now_ms, out);
        }
        self.finish(CadenceStatus::Cancelled, now_ms, out);
        true
    }

    fn present(&mut self, index: usize, at_ms: f64, out: &mut Vec<StageEvent>) {
        let Some(line) = self.queue.get(index) else {
            return;
        };
        if let Some(run) = self.run.as_mut() {
            run.presented += 1;
        }
        log::debug!("Win line {} shown at {:.1}ms", line.line_id(), at_ms);
        out.push(StageEvent::new(
            Stage::WinLineShow {
                line_id: line.line_id(),
                line_amount: line.amount(),
                cells: line.cells().to_vec(),
            },
            at_ms,
        ));
    }

    fn clear_current(&mut self, at_ms: f64, out: &mut Vec<StageEvent>) {
        let Some(index) = self.run.as_ref().map(|r| r.index) else {
            return;
        };
        if let Some(line) = self.queue.get(index) {
            out.push(StageEvent::new(
                Stage::WinLineClear {
                    line_id: line.line_id(),
                },
                at_ms,
            ));
        }
    }

    fn finish(&mut self, status: CadenceStatus, at_ms: f64, out: &mut Vec<StageEvent>) {
        let Some(mut run) = self.run.take() else {
            return;
        };

        // A capped run may end mid-highlight
        if status == CadenceStatus::Capped {
            if let LinePhase::Highlight { .. } = run.phase {
                if let Some(line) = self.queue.get(run.index) {
                    out.push(StageEvent::new(
                        Stage::WinLineClear {
                            line_id: line.line_id(),
                        },
                        at_ms,
                    ));
                }
            }
        }

        let outcome = CadenceOutcome {
            status,
            lines_presented: run.presented,
            lines_queued: self.queue.len(),
            total_amount: self.queued_amount(),
        };
        log::debug!(
            "Cadence {:?}: {}/{} lines",
            status,
            outcome.lines_presented,
            outcome.lines_queued
        );
        out.push(StageEvent::new(
            Stage::CadenceEnd {
                status,
                lines_presented: outcome.lines_presented as u32,
                lines_queued: outcome.lines_queued as u32,
            },
            at_ms,
        ));
        if let Some(resolver) = run.resolver.take() {
            resolver.resolve(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionPreferences;

    fn sequencer(preferences: MotionPreferences, lines: &[(u32, f64)]) -> WinCadenceSequencer {
        let mut cadence = WinCadenceSequencer::new(MotionSettings::new(preferences));
        for (id, amount) in lines {
            cadence.add_line(*id, *amount);
        }
        cadence
    }

    fn shown(out: &[StageEvent]) -> Vec<u32> {
        out.iter()
            .filter_map(|e| match e.stage {
                Stage::WinLineShow { line_id, .. } => Some(line_id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_presents_lines_in_order() {
        let mut cadence = sequencer(MotionPreferences::default(), &[(0, 1.0), (3, 2.0), (7, 0.5)]);
        let mut out = Vec::new();
        let done = cadence.run(0.0, None, &mut out);
        assert_eq!(shown(&out), vec![0]);

        let mut now = 0.0;
        while !done.is_resolved() {
            now += 16.0;
            cadence.tick(now, &mut out);
            assert!(now < 10_000.0);
        }

        let outcome = done.peek().unwrap();
        assert_eq!(outcome.status, CadenceStatus::Completed);
        assert_eq!(outcome.lines_presented, 3);
        assert!(!outcome.needs_summary());
        assert_eq!(outcome.total_amount, 3.5);
        assert_eq!(shown(&out), vec![0, 3, 7]);

        let clears = out.iter().filter(|e| e.type_name() == "win_line_clear").count();
        assert_eq!(clears, 3);
    }

    #[test]
    fn test_late_frame_catches_up() {
        let mut cadence = sequencer(MotionPreferences::default(), &[(0, 1.0), (1, 1.0), (2, 1.0)]);
        let mut out = Vec::new();
        let done = cadence.run(0.0, None, &mut out);

        // One frame well past the whole schedule
        cadence.tick(60_000.0, &mut out);
        assert!(done.is_resolved());
        assert_eq!(shown(&out), vec![0, 1, 2]);

        let show_times: Vec<f64> = out
            .iter()
            .filter(|e| e.type_name() == "win_line_show")
            .map(|e| e.timestamp_ms)
            .collect();
        assert_eq!(show_times, vec![0.0, 1450.0, 2900.0]);
    }

    #[test]
    fn test_budget_caps_run() {
        let mut cadence = sequencer(MotionPreferences::default(), &[(0, 1.0), (1, 1.0), (2, 1.0)]);
        let mut out = Vec::new();
        let done = cadence.run(0.0, Some(2000.0), &mut out);

        cadence.tick(2100.0, &mut out);
        let outcome = done.peek().unwrap();
        assert_eq!(outcome.status, CadenceStatus::Capped);
        assert_eq!(outcome.lines_presented, 2);
        assert!(outcome.needs_summary());

        let shows = out.iter().filter(|e| e.type_name() == "win_line_show").count();
        let clears = out.iter().filter(|e| e.type_name() == "win_line_clear").count();
        assert_eq!(shows, clears);
    }

    #[test]
    fn test_fast_mode_caps_line_count() {
        let lines: Vec<(u32, f64)> = (0..10).map(|i| (i, 1.0)).collect();
        let mut cadence = sequencer(
            MotionPreferences {
                fast_mode: true,
                ..Default::default()
            },
            &lines,
        );
        let mut out = Vec::new();
        let done = cadence.run(0.0, None, &mut out);
        cadence.tick(60_000.0, &mut out);

        let outcome = done.peek().unwrap();
        assert_eq!(outcome.status, CadenceStatus::Completed);
        assert_eq!(outcome.lines_presented, 6);
        assert!(outcome.needs_summary());
    }

    #[test]
    fn test_concurrent_run_is_cancelled_without_side_effects() {
        let mut cadence = sequencer(MotionPreferences::default(), &[(0, 1.0)]);
        let mut out = Vec::new();
        let first = cadence.run(0.0, None, &mut out);
        let events = out.len();

        let second = cadence.run(10.0, None, &mut out);
        assert_eq!(second.peek().unwrap().status, CadenceStatus::Cancelled);
        assert_eq!(out.len(), events);
        assert!(first.is_pending());
    }

    #[test]
    fn test_empty_queue_completes_immediately() {
        let mut cadence = sequencer(MotionPreferences::default(), &[]);
        let mut out = Vec::new();
        let done = cadence.run(0.0, None, &mut out);
        assert_eq!(done.peek().unwrap().status, CadenceStatus::Completed);
        assert!(out.is_empty());
    }

    #[test]
    fn test_skip_respects_preferences() {
        let settings = MotionSettings::new(MotionPreferences {
            skip_allowed: false,
            ..Default::default()
        });
        let mut cadence = WinCadenceSequencer::new(settings.clone());
        cadence.add_line(0, 1.0);
        cadence.add_line(1, 1.0);
        let mut out = Vec::new();
        let done = cadence.run(0.0, None, &mut out);

        assert!(!cadence.request_skip(100.0, &mut out));
        assert!(done.is_pending());

        settings.set_skip_allowed(true);
        assert!(cadence.request_skip(200.0, &mut out));
        cadence.tick(200.0 + 250.0, &mut out);
        let outcome = done.peek().unwrap();
        assert_eq!(outcome.status, CadenceStatus::Cancelled);
        assert_eq!(outcome.lines_presented, 1);
    }

    #[test]
    fn test_cancel_always_honoured() {
        let mut cadence = WinCadenceSequencer::new(MotionSettings::new(MotionPreferences {
            skip_allowed: false,
            ..Default::default()
        }));
        cadence.add_line(2, 1.0);
        let mut out = Vec::new();
        let done = cadence.run(0.0, None, &mut out);

        assert!(cadence.cancel(50.0, &mut out));
        assert_eq!(done.peek().unwrap().status, CadenceStatus::Cancelled);
        assert!(!cadence.is_running());
        assert!(!cadence.cancel(60.0, &mut out));
    }
}
