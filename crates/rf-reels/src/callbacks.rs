//! Render hooks installed by the presentation shell

use rf_core::{CellPos, Diagnostic, SymbolId};
use rf_stage::{CelebrationPhase, CelebrationTier, Stage, StageEvent};

pub type WrapCallback = Box<dyn FnMut(u8, SymbolId, u32)>;
pub type ReelStopCallback = Box<dyn FnMut(u8, &[SymbolId])>;
pub type LinePresentCallback = Box<dyn FnMut(u32, f64, &[CellPos])>;
pub type LineClearCallback = Box<dyn FnMut(u32)>;
pub type CelebrationPhaseCallback = Box<dyn FnMut(CelebrationTier, CelebrationPhase)>;
pub type LockCallback = Box<dyn FnMut(bool)>;
pub type DiagnosticCallback = Box<dyn FnMut(&Diagnostic)>;
pub type StageCallback = Box<dyn FnMut(&StageEvent)>;

/// Optional hooks, each invoked synchronously from the frame loop
#[derive(Default)]
pub struct PresenterCallbacks {
    pub on_wrap: Option<WrapCallback>,
    pub on_reel_stop: Option<ReelStopCallback>,
    pub on_line_present: Option<LinePresentCallback>,
    pub on_line_clear: Option<LineClearCallback>,
    pub on_celebration_phase: Option<CelebrationPhaseCallback>,
    pub on_lock_changed: Option<LockCallback>,
    pub on_diagnostic: Option<DiagnosticCallback>,
    /// Every stage event, after the typed hook
    pub on_stage: Option<StageCallback>,
}

impl PresenterCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_wrap(mut self, f: impl FnMut(u8, SymbolId, u32) + 'static) -> Self {
        self.on_wrap = Some(Box::new(f));
        self
    }

    pub fn on_reel_stop(mut self, f: impl FnMut(u8, &[SymbolId]) + 'static) -> Self {
        self.on_reel_stop = Some(Box::new(f));
        self
    }

    pub fn on_line_present(mut self, f: impl FnMut(u32, f64, &[CellPos]) + 'static) -> Self {
        self.on_line_present = Some(Box::new(f));
        self
    }

    pub fn on_line_clear(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.on_line_clear = Some(Box::new(f));
        self
    }

    pub fn on_celebration_phase(
        mut self,
        f: impl FnMut(CelebrationTier, CelebrationPhase) + 'static,
    ) -> Self {
        self.on_celebration_phase = Some(Box::new(f));
        self
    }

    pub fn on_lock_changed(mut self, f: impl FnMut(bool) + 'static) -> Self {
        self.on_lock_changed = Some(Box::new(f));
        self
    }

    pub fn on_diagnostic(mut self, f: impl FnMut(&Diagnostic) + 'static) -> Self {
        self.on_diagnostic = Some(Box::new(f));
        self
    }

    pub fn on_stage(mut self, f: impl FnMut(&StageEvent) + 'static) -> Self {
        self.on_stage = Some(Box::new(f));
        self
    }

    /// Route one event to its typed hook, then to the catch-all hook
    pub fn dispatch(&mut self, event: &StageEvent) {
        match &event.stage {
            Stage::ReelWrap {
                reel_index,
                symbol,
                wrap_count,
            } => {
                if let Some(f) = self.on_wrap.as_mut() {
                    f(*reel_index, *symbol, *wrap_count);
                }
            }
            Stage::ReelStop {
                reel_index,
                symbols,
                ..
            } => {
                if let Some(f) = self.on_reel_stop.as_mut() {
                    f(*reel_index, symbols);
                }
            }
            Stage::WinLineShow {
                line_id,
                line_amount,
                cells,
            } => {
                if let Some(f) = self.on_line_present.as_mut() {
                    f(*line_id, *line_amount, cells);
                }
            }
            Stage::WinLineClear { line_id } => {
                if let Some(f) = self.on_line_clear.as_mut() {
                    f(*line_id);
                }
            }
            Stage::CelebrationPhase { tier, phase } => {
                if let Some(f) = self.on_celebration_phase.as_mut() {
                    f(*tier, *phase);
                }
            }
            Stage::PresentationLock { locked } => {
                if let Some(f) = self.on_lock_changed.as_mut() {
                    f(*locked);
                }
            }
            _ => {}
        }

        if let Some(f) = self.on_stage.as_mut() {
            f(event);
        }
    }

    pub fn report(&mut self, diagnostic: &Diagnostic) {
        if let Some(f) = self.on_diagnostic.as_mut() {
            f(diagnostic);
        }
    }
}

impl std::fmt::Debug for PresenterCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenterCallbacks")
            .field("on_wrap", &self.on_wrap.is_some())
            .field("on_reel_stop", &self.on_reel_stop.is_some())
            .field("on_line_present", &self.on_line_present.is_some())
            .field("on_line_clear", &self.on_line_clear.is_some())
            .field("on_celebration_phase", &self.on_celebration_phase.is_some())
            .field("on_lock_changed", &self.on_lock_changed.is_some())
            .field("on_diagnostic", &self.on_diagnostic.is_some())
            .field("on_stage", &self.on_stage.is_some())
            .finish()
    }
}
