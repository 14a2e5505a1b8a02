//! Grid Coordinator — five columns, staggered stops, highlights and verification
//!
//! ## Architecture
//!
//! ```text
//! stop_all(result)
//!     │
//!     ├── column 0 ── request_stop ──► brake engages at t0
//!     ├── column 1 ── request_stop at t0 + stagger ──► brake at t1
//!     ├── ...
//!     └── column 4 ── request_stop at t3 + stagger
//!           │
//!           v
//!     all columns settled → StopAllOutcome
//! ```
//!
//! The stagger is measured from the moment the previous column commits to its
//! stop, and each column is given its left neighbour's landing time as a floor,
//! so columns always land left to right.

use rf_core::{
    CellPos, ColumnSymbols, Completion, DiagnosticKind, Diagnostics, REEL_COUNT, ROW_COUNT,
    Resolver, ResultGrid, RfResult, completion,
};
use rf_stage::{Stage, StageEvent};
use serde::{Deserialize, Serialize};

use crate::column::{ColumnController, ColumnState, StopOutcome};
use crate::config::PresenterConfig;
use crate::motion::MotionSettings;

/// Highlight state of one visible cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellMark {
    #[default]
    Normal,
    Highlighted,
    Dimmed,
}

/// Every column landed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopAllOutcome {
    pub columns: Vec<StopOutcome>,
    pub quick: bool,
}

impl StopAllOutcome {
    /// Landed window of every column
    pub fn grid(&self) -> Option<ResultGrid> {
        let columns: Vec<Vec<u32>> = self.columns.iter().map(|c| c.symbols.to_vec()).collect();
        ResultGrid::try_from(columns).ok()
    }

    pub fn any_forced(&self) -> bool {
        self.columns.iter().any(|c| c.forced)
    }
}

/// Result of comparing one column against the authoritative grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ColumnCheck {
    Match,
    /// Visible window equals the expected column upside down
    Reversed,
    Mismatch {
        expected: ColumnSymbols,
        actual: ColumnSymbols,
    },
    /// Column has not landed yet
    NotLanded,
}

/// Per-column correctness report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridVerification {
    pub checks: Vec<ColumnCheck>,
}

impl GridVerification {
    pub fn is_ok(&self) -> bool {
        self.checks.iter().all(|c| *c == ColumnCheck::Match)
    }

    /// Columns whose visible window differs from the result
    pub fn failed_columns(&self) -> Vec<usize> {
        self.checks
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, ColumnCheck::Reversed | ColumnCheck::Mismatch { .. }))
            .map(|(i, _)| i)
            .collect()
    }
}

struct StopSequence {
    target: ResultGrid,
    next_column: usize,
    handles: Vec<Completion<StopOutcome>>,
    resolver: Option<Resolver<StopAllOutcome>>,
    completion: Completion<StopAllOutcome>,
    /// Zero stagger for a quick-stop triggered sequence
    immediate: bool,
}

/// Owns the five column controllers
pub struct GridCoordinator {
    columns: Vec<ColumnController>,
    diagnostics: Diagnostics,
    motion: MotionSettings,
    marks: [[CellMark; ROW_COUNT]; REEL_COUNT],
    pending_result: Option<ResultGrid>,
    sequence: Option<StopSequence>,
    quick_stop: bool,
}

impl GridCoordinator {
    pub fn new(config: &PresenterConfig, motion: MotionSettings, diagnostics: Diagnostics) -> Self {
        let columns = (0..REEL_COUNT as u8)
            .map(|reel| ColumnController::new(reel, config, motion.clone(), diagnostics.clone()))
            .collect();
        Self {
            columns,
            diagnostics,
            motion,
            marks: [[CellMark::Normal; ROW_COUNT]; REEL_COUNT],
            pending_result: None,
            sequence: None,
            quick_stop: false,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // COMMANDS
    // ═══════════════════════════════════════════════════════════════════════

    /// Start every column; nothing starts unless all columns are Idle
    pub fn start_all(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) -> RfResult<()> {
        if let Some(busy) = self.columns.iter().find(|c| !c.is_idle()) {
            let message = format!("start_all while reel {} is {:?}", busy.reel_index(), busy.state());
            self.diagnostics
                .report(DiagnosticKind::InvalidTransition, None, message.clone(), now_ms);
            return Err(rf_core::RfError::InvalidTransition(message));
        }

        self.pending_result = None;
        self.sequence = None;
        self.quick_stop = false;
        self.clear_highlights();
        for column in &mut self.columns {
            column.start_spin(now_ms, out)?;
        }
        log::debug!("All reels started at {:.1}ms", now_ms);
        Ok(())
    }

    /// Hold the authoritative grid until a stop is issued
    pub fn set_pending_result(&mut self, grid: ResultGrid) {
        self.pending_result = Some(grid);
    }

    pub fn pending_result(&self) -> Option<&ResultGrid> {
        self.pending_result.as_ref()
    }

    /// Stop every column on the grid, left to right
    ///
    /// A second call while a sequence is active returns the same completion.
    pub fn stop_all(
        &mut self,
        grid: ResultGrid,
        now_ms: f64,
        out: &mut Vec<StageEvent>,
    ) -> Completion<StopAllOutcome> {
        self.begin_sequence(grid, false, now_ms, out)
    }

    /// Shorten all stops; stops immediately if a result is held but no stop issued
    pub fn request_quick_stop(
        &mut self,
        now_ms: f64,
        out: &mut Vec<StageEvent>,
    ) -> Option<Completion<StopAllOutcome>> {
        if self.is_idle() {
            return None;
        }
        if !self.quick_stop {
            self.quick_stop = true;
            out.push(StageEvent::new(Stage::QuickStop, now_ms));
            for column in &mut self.columns {
                column.request_quick_stop(now_ms);
            }
        }

        match (&self.sequence, self.pending_result) {
            (Some(sequence), _) => Some(sequence.completion.clone()),
            (None, Some(grid)) => Some(self.begin_sequence(grid, true, now_ms, out)),
            (None, None) => None,
        }
    }

    fn begin_sequence(
        &mut self,
        grid: ResultGrid,
        immediate: bool,
        now_ms: f64,
        out: &mut Vec<StageEvent>,
    ) -> Completion<StopAllOutcome> {
        if let Some(sequence) = &self.sequence {
            if sequence.target != grid {
                self.diagnostics.report(
                    DiagnosticKind::TargetChanged,
                    None,
                    "stop_all called with a different grid while stopping",
                    now_ms,
                );
            }
            return sequence.completion.clone();
        }

        let (resolver, completion) = completion();
        self.pending_result = Some(grid);
        self.sequence = Some(StopSequence {
            target: grid,
            next_column: 0,
            handles: Vec::with_capacity(REEL_COUNT),
            resolver: Some(resolver),
            completion: completion.clone(),
            immediate,
        });
        log::debug!("Stop sequence started at {:.1}ms (quick: {})", now_ms, self.quick_stop);

        self.advance_sequence(now_ms, out);
        self.finish_sequence_if_done(now_ms);
        completion
    }

    /// Highlight cells and dim the rest
    pub fn highlight_cells(&mut self, cells: &[CellPos]) {
        for column in self.marks.iter_mut() {
            column.fill(CellMark::Dimmed);
        }
        for cell in cells.iter().filter(|c| c.is_valid()) {
            self.marks[cell.column as usize][cell.row as usize] = CellMark::Highlighted;
        }
    }

    pub fn clear_highlights(&mut self) {
        self.marks = [[CellMark::Normal; ROW_COUNT]; REEL_COUNT];
    }

    /// Compare every landed column against the authoritative grid
    pub fn verify_correctness(&self, grid: &ResultGrid, now_ms: f64) -> GridVerification {
        let checks = self
            .columns
            .iter()
            .enumerate()
            .map(|(reel, column)| {
                let expected = *grid.column(reel);
                if !column.has_landed() {
                    return ColumnCheck::NotLanded;
                }
                let actual = column.visible();
                let mut reversed = expected;
                reversed.reverse();

                let check = if actual == expected {
                    ColumnCheck::Match
                } else if actual == reversed {
                    ColumnCheck::Reversed
                } else {
                    ColumnCheck::Mismatch { expected, actual }
                };

                match check {
                    ColumnCheck::Reversed => self.diagnostics.report(
                        DiagnosticKind::ReversedColumn,
                        Some(reel as u8),
                        format!("showing {:?} for {:?}", actual, expected),
                        now_ms,
                    ),
                    ColumnCheck::Mismatch { .. } => self.diagnostics.report(
                        DiagnosticKind::GridMismatch,
                        Some(reel as u8),
                        format!("showing {:?}, expected {:?}", actual, expected),
                        now_ms,
                    ),
                    _ => {}
                }
                check
            })
            .collect();

        GridVerification { checks }
    }

    /// Snap every failing column of a verification onto the grid
    pub fn repair(
        &mut self,
        grid: &ResultGrid,
        verification: &GridVerification,
        now_ms: f64,
        out: &mut Vec<StageEvent>,
    ) -> usize {
        let failed = verification.failed_columns();
        for reel in &failed {
            self.columns[*reel].force_snap(*grid.column(*reel), now_ms, out);
        }
        failed.len()
    }

    /// Snap every column onto a grid and settle any stop sequence
    pub fn force_snap_all(&mut self, grid: &ResultGrid, now_ms: f64, out: &mut Vec<StageEvent>) {
        for (reel, column) in self.columns.iter_mut().enumerate() {
            column.force_snap(*grid.column(reel), now_ms, out);
        }
        if let Some(sequence) = self.sequence.as_mut() {
            sequence.next_column = REEL_COUNT;
            sequence.handles = self
                .columns
                .iter()
                .map(|c| {
                    Completion::ready(StopOutcome {
                        reel_index: c.reel_index(),
                        symbols: c.visible(),
                        wrap_count: c.wrap_count(),
                        quick: c.is_quick_stop(),
                        forced: true,
                        landed_at_ms: now_ms,
                    })
                })
                .collect();
        }
        self.finish_sequence_if_done(now_ms);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FRAME UPDATE
    // ═══════════════════════════════════════════════════════════════════════

    /// Advance every column, then issue any stop that came due
    pub fn tick(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) {
        for column in &mut self.columns {
            column.tick(now_ms, out);
        }
        self.advance_sequence(now_ms, out);
        self.finish_sequence_if_done(now_ms);
    }

    fn advance_sequence(&mut self, now_ms: f64, out: &mut Vec<StageEvent>) {
        let profile = self.motion.profile();
        let Some(sequence) = self.sequence.as_mut() else {
            return;
        };

        while sequence.next_column < REEL_COUNT {
            let reel = sequence.next_column;
            let mut floor = None;

            if reel > 0 {
                let previous = &self.columns[reel - 1];
                let Some(committed) = previous.committed_at() else {
                    break;
                };
                let stagger = if sequence.immediate {
                    0.0
                } else {
                    profile.stop_stagger_for(self.quick_stop)
                };
                if now_ms < committed + stagger {
                    break;
                }
                // Land at least one stagger after the left neighbour
                floor = previous.landing_eta().map(|eta| eta + stagger);
            }

            let column = &mut self.columns[reel];
            column.set_landing_floor(floor);
            let handle = column.request_stop(*sequence.target.column(reel), now_ms, out);
            sequence.handles.push(handle);
            sequence.next_column += 1;
        }
    }

    fn finish_sequence_if_done(&mut self, now_ms: f64) {
        let done = match &self.sequence {
            Some(s) => s.next_column == REEL_COUNT && s.handles.iter().all(|h| h.is_resolved()),
            None => false,
        };
        if !done {
            return;
        }
        let Some(mut sequence) = self.sequence.take() else {
            return;
        };

        let columns = sequence.handles.iter().filter_map(|h| h.peek()).collect();
        let outcome = StopAllOutcome {
            columns,
            quick: self.quick_stop,
        };
        log::debug!("All reels settled at {:.1}ms", now_ms);
        self.pending_result = None;
        if let Some(resolver) = sequence.resolver.take() {
            resolver.resolve(outcome);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn columns(&self) -> &[ColumnController] {
        &self.columns
    }

    pub fn column(&self, reel: usize) -> Option<&ColumnController> {
        self.columns.get(reel)
    }

    /// Every column Idle
    pub fn is_idle(&self) -> bool {
        self.columns.iter().all(|c| c.is_idle())
    }

    pub fn is_stopping(&self) -> bool {
        self.sequence.is_some()
    }

    pub fn is_quick_stop(&self) -> bool {
        self.quick_stop
    }

    pub fn states(&self) -> Vec<ColumnState> {
        self.columns.iter().map(|c| c.state()).collect()
    }

    /// Visible symbols of every column
    pub fn visible_grid(&self) -> ResultGrid {
        let mut columns = [[0; ROW_COUNT]; REEL_COUNT];
        for (reel, column) in self.columns.iter().enumerate() {
            columns[reel] = column.visible();
        }
        ResultGrid::new(columns)
    }

    pub fn cell_mark(&self, cell: CellPos) -> CellMark {
        if !cell.is_valid() {
            return CellMark::Normal;
        }
        self.marks[cell.column as usize][cell.row as usize]
    }

    pub fn marks(&self) -> &[[CellMark; ROW_COUNT]; REEL_COUNT] {
        &self.marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionPreferences;

    const FRAME_MS: f64 = 16.0;

    fn grid() -> ResultGrid {
        ResultGrid::new([[1, 2, 3], [4, 5, 6], [7, 8, 9], [1, 3, 5], [2, 4, 6]])
    }

    fn coordinator(preferences: MotionPreferences) -> (GridCoordinator, Diagnostics) {
        let diagnostics = Diagnostics::new();
        let coordinator = GridCoordinator::new(
            &PresenterConfig::default(),
            MotionSettings::new(preferences),
            diagnostics.clone(),
        );
        (coordinator, diagnostics)
    }

    fn run(
        coordinator: &mut GridCoordinator,
        mut now: f64,
        done: &Completion<StopAllOutcome>,
        out: &mut Vec<StageEvent>,
    ) -> f64 {
        for _ in 0..2000 {
            if done.is_resolved() {
                return now;
            }
            now += FRAME_MS;
            coordinator.tick(now, out);
        }
        panic!("stop sequence never finished");
    }

    fn stop_times(out: &[StageEvent]) -> Vec<(u8, f64)> {
        out.iter()
            .filter_map(|e| match e.stage {
                Stage::ReelStop { reel_index, .. } => Some((reel_index, e.timestamp_ms)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_stop_all_lands_left_to_right() {
        let (mut grid_ctl, diagnostics) = coordinator(MotionPreferences::default());
        let mut out = Vec::new();
        grid_ctl.start_all(0.0, &mut out).unwrap();

        let mut now = 0.0;
        for _ in 0..50 {
            now += FRAME_MS;
            grid_ctl.tick(now, &mut out);
        }
        let done = grid_ctl.stop_all(grid(), now, &mut out);
        run(&mut grid_ctl, now, &done, &mut out);

        let stops = stop_times(&out);
        assert_eq!(stops.iter().map(|s| s.0).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(stops.windows(2).all(|w| w[0].1 < w[1].1), "{:?}", stops);

        assert_eq!(grid_ctl.visible_grid(), grid());
        assert!(grid_ctl.verify_correctness(&grid(), now).is_ok());
        assert!(diagnostics.is_empty());

        let outcome = done.peek().unwrap();
        assert_eq!(outcome.columns.len(), REEL_COUNT);
        assert_eq!(outcome.grid(), Some(grid()));
    }

    #[test]
    fn test_fast_mode_shortens_stagger() {
        let gap = |preferences| {
            let (mut grid_ctl, _) = coordinator(preferences);
            let mut out = Vec::new();
            grid_ctl.start_all(0.0, &mut out).unwrap();
            let done = grid_ctl.stop_all(grid(), 0.0, &mut out);
            run(&mut grid_ctl, 0.0, &done, &mut out);
            let stops = stop_times(&out);
            stops[4].1 - stops[0].1
        };
        let normal = gap(MotionPreferences::default());
        let fast = gap(MotionPreferences {
            fast_mode: true,
            ..Default::default()
        });
        assert!(fast < normal, "fast {} normal {}", fast, normal);
    }

    #[test]
    fn test_quick_stop_with_pending_result_stops_everything() {
        let (mut grid_ctl, _) = coordinator(MotionPreferences::default());
        let mut out = Vec::new();
        grid_ctl.start_all(0.0, &mut out).unwrap();
        grid_ctl.set_pending_result(grid());

        let done = grid_ctl.request_quick_stop(16.0, &mut out).unwrap();
        let end = run(&mut grid_ctl, 16.0, &done, &mut out);

        let stops = stop_times(&out);
        assert_eq!(stops.iter().map(|s| s.0).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(stops.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(done.peek().unwrap().quick);
        assert!(end < 1500.0);
        assert_eq!(out.iter().filter(|e| e.type_name() == "quick_stop").count(), 1);
    }

    #[test]
    fn test_quick_stop_without_result_only_flags() {
        let (mut grid_ctl, _) = coordinator(MotionPreferences::default());
        let mut out = Vec::new();
        assert!(grid_ctl.request_quick_stop(0.0, &mut out).is_none());

        grid_ctl.start_all(0.0, &mut out).unwrap();
        assert!(grid_ctl.request_quick_stop(10.0, &mut out).is_none());
        assert!(grid_ctl.is_quick_stop());
        assert!(grid_ctl.columns().iter().all(|c| c.is_quick_stop()));
    }

    #[test]
    fn test_stop_all_twice_returns_same_completion() {
        let (mut grid_ctl, diagnostics) = coordinator(MotionPreferences::default());
        let mut out = Vec::new();
        grid_ctl.start_all(0.0, &mut out).unwrap();
        let a = grid_ctl.stop_all(grid(), 0.0, &mut out);
        let b = grid_ctl.stop_all(grid(), 5.0, &mut out);
        assert!(a.same_as(&b));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_start_all_rejected_while_spinning() {
        let (mut grid_ctl, diagnostics) = coordinator(MotionPreferences::default());
        let mut out = Vec::new();
        grid_ctl.start_all(0.0, &mut out).unwrap();
        assert!(grid_ctl.start_all(10.0, &mut out).is_err());
        assert!(diagnostics.has(DiagnosticKind::InvalidTransition));
    }

    #[test]
    fn test_verification_detects_reversed_and_mismatch() {
        let (mut grid_ctl, diagnostics) = coordinator(MotionPreferences::default());
        let mut out = Vec::new();
        grid_ctl.force_snap_all(&grid(), 0.0, &mut out);

        let mut expected = grid().columns().to_owned();
        expected[1].reverse();
        expected[3] = [9, 9, 9];
        let expected = ResultGrid::new(expected);

        let verification = grid_ctl.verify_correctness(&expected, 1.0);
        assert!(!verification.is_ok());
        assert_eq!(verification.checks[1], ColumnCheck::Reversed);
        assert!(matches!(verification.checks[3], ColumnCheck::Mismatch { .. }));
        assert_eq!(verification.failed_columns(), vec![1, 3]);
        assert!(diagnostics.has(DiagnosticKind::ReversedColumn));
        assert!(diagnostics.has(DiagnosticKind::GridMismatch));

        assert_eq!(grid_ctl.repair(&expected, &verification, 2.0, &mut out), 2);
        assert!(grid_ctl.verify_correctness(&expected, 3.0).is_ok());
    }

    #[test]
    fn test_highlight_marks() {
        let (mut grid_ctl, _) = coordinator(MotionPreferences::default());
        grid_ctl.highlight_cells(&[CellPos::new(0, 1), CellPos::new(1, 1), CellPos::new(9, 9)]);
        assert_eq!(grid_ctl.cell_mark(CellPos::new(0, 1)), CellMark::Highlighted);
        assert_eq!(grid_ctl.cell_mark(CellPos::new(0, 0)), CellMark::Dimmed);

        grid_ctl.clear_highlights();
        assert!(grid_ctl.marks().iter().flatten().all(|m| *m == CellMark::Normal));
    }
}
