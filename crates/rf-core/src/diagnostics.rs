//! Diagnostic channel for invariant violations
//!
//! Invariant violations are never thrown across the frame loop. They are
//! recorded here, logged at error level, and forwarded by the presenter to the
//! shell's diagnostic hook. The channel is a cheap clonable handle so every
//! component can be given one at construction.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Kind of reported defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Operation called from a state that does not allow it
    InvalidTransition,
    /// Visible window differs from the authoritative column
    GridMismatch,
    /// Visible window equals the authoritative column reversed
    ReversedColumn,
    /// A different target arrived after target injection began
    TargetChanged,
    /// A stopping column exceeded the watchdog and was snapped
    StopWatchdog,
    /// Frame timestamps went backwards
    NonMonotonicClock,
}

impl DiagnosticKind {
    /// Whether this kind means the rendered state may desync from the authority
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            Self::GridMismatch | Self::ReversedColumn | Self::TargetChanged | Self::StopWatchdog
        )
    }
}

/// A single reported defect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Affected reel, when the defect is column-local
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u8>,
    pub message: String,
    /// Frame time at which the defect was observed (ms)
    pub timestamp_ms: f64,
}

/// Delivered entries kept for inspection; undelivered entries are never dropped
pub const MAX_DIAGNOSTIC_HISTORY: usize = 256;

#[derive(Debug, Default)]
struct Log {
    entries: Vec<Diagnostic>,
    delivered: usize,
}

/// Shared diagnostic sink
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    log: Arc<Mutex<Log>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a defect and log it loudly
    pub fn report(
        &self,
        kind: DiagnosticKind,
        column: Option<u8>,
        message: impl Into<String>,
        timestamp_ms: f64,
    ) {
        let message = message.into();
        match column {
            Some(reel) => log::error!("[{:?}] reel {}: {}", kind, reel, message),
            None => log::error!("[{:?}] {}", kind, message),
        }
        let mut log = self.log.lock();
        log.entries.push(Diagnostic {
            kind,
            column,
            message,
            timestamp_ms,
        });
        if log.entries.len() > MAX_DIAGNOSTIC_HISTORY {
            let excess = (log.entries.len() - MAX_DIAGNOSTIC_HISTORY).min(log.delivered);
            log.entries.drain(..excess);
            log.delivered -= excess;
        }
    }

    /// Entries reported since the previous call
    pub fn drain_new(&self) -> Vec<Diagnostic> {
        let mut log = self.log.lock();
        let fresh = log.entries[log.delivered..].to_vec();
        log.delivered = log.entries.len();
        fresh
    }

    /// Retained history, oldest first
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.log.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.log.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether any entry of a kind has been reported
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.log.lock().entries.iter().any(|d| d.kind == kind)
    }

    pub fn clear(&self) {
        let mut log = self.log.lock();
        log.entries.clear();
        log.delivered = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_and_drain() {
        let diagnostics = Diagnostics::new();
        let shared = diagnostics.clone();

        shared.report(DiagnosticKind::GridMismatch, Some(2), "expected [1,2,3]", 120.0);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.has(DiagnosticKind::GridMismatch));

        let fresh = diagnostics.drain_new();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].column, Some(2));
        assert!(diagnostics.drain_new().is_empty());

        shared.report(DiagnosticKind::InvalidTransition, None, "spin while spinning", 130.0);
        assert_eq!(diagnostics.drain_new().len(), 1);
        assert_eq!(diagnostics.entries().len(), 2);
    }

    #[test]
    fn test_history_is_capped_after_delivery() {
        let diagnostics = Diagnostics::new();
        let overflow = MAX_DIAGNOSTIC_HISTORY + 44;
        for i in 0..overflow {
            diagnostics.report(DiagnosticKind::StopWatchdog, Some(0), "snapped", i as f64);
        }
        // Nothing delivered yet, so nothing may be dropped
        assert_eq!(diagnostics.len(), overflow);
        assert_eq!(diagnostics.drain_new().len(), overflow);

        diagnostics.report(DiagnosticKind::GridMismatch, Some(1), "late", 9000.0);
        assert_eq!(diagnostics.len(), MAX_DIAGNOSTIC_HISTORY);

        let fresh = diagnostics.drain_new();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].kind, DiagnosticKind::GridMismatch);
        assert_eq!(diagnostics.entries().last().map(|d| d.timestamp_ms), Some(9000.0));
    }

    #[test]
    fn test_desync_kinds() {
        assert!(DiagnosticKind::ReversedColumn.is_desync());
        assert!(!DiagnosticKind::InvalidTransition.is_desync());
    }
}
