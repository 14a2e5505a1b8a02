//! StageTrace — The recorded sequence of stage events for one round
//!
//! A trace captures the full render timeline of a round and checks the
//! ordering guarantees the shell relies on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rf_core::REEL_COUNT;

use crate::event::StageEvent;
use crate::stage::{Stage, StageCategory};
use crate::taxonomy::CelebrationTier;

/// A complete trace of stage events for one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    /// Unique identifier for this trace
    pub trace_id: String,

    /// Authority round id, when known
    #[serde(default)]
    pub round_id: Option<String>,

    /// All events in emission order
    pub events: Vec<StageEvent>,

    /// When this trace was recorded
    pub recorded_at: DateTime<Utc>,

    /// Custom metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StageTrace {
    /// Create a new empty trace
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            round_id: None,
            events: Vec::new(),
            recorded_at: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Add an event to the trace
    pub fn push(&mut self, event: StageEvent) {
        self.events.push(event);
    }

    /// Set round ID
    pub fn with_round(mut self, round_id: impl Into<String>) -> Self {
        self.round_id = Some(round_id.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get total duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
            _ => 0.0,
        }
    }

    /// Get events by category
    pub fn events_by_category(&self, category: StageCategory) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.category() == category)
            .collect()
    }

    /// Get events by stage type name
    pub fn events_by_type(&self, type_name: &str) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.type_name() == type_name)
            .collect()
    }

    /// Find first event matching a predicate
    pub fn find_event<F>(&self, predicate: F) -> Option<&StageEvent>
    where
        F: Fn(&StageEvent) -> bool,
    {
        self.events.iter().find(|e| predicate(e))
    }

    /// Check if trace contains a specific stage type
    pub fn has_stage(&self, type_name: &str) -> bool {
        self.events.iter().any(|e| e.stage.type_name() == type_name)
    }

    /// Get all reel stop events
    pub fn reel_stops(&self) -> Vec<&StageEvent> {
        self.events_by_type("reel_stop")
    }

    /// Number of wrap events recorded for a reel
    pub fn wrap_count(&self, reel_index: u8) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.stage, Stage::ReelWrap { reel_index: r, .. } if r == reel_index))
            .count()
    }

    /// Line ids in the order they were highlighted
    pub fn lines_shown(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e.stage {
                Stage::WinLineShow { line_id, .. } => Some(line_id),
                _ => None,
            })
            .collect()
    }

    /// Highest celebration tier started in this trace
    pub fn max_celebration_tier(&self) -> CelebrationTier {
        self.events
            .iter()
            .filter_map(|e| match e.stage {
                Stage::CelebrationStart { tier, .. } => Some(tier),
                _ => None,
            })
            .max()
            .unwrap_or_default()
    }

    /// Validate the ordering guarantees of the trace
    pub fn validate(&self) -> TraceValidation {
        let stops = self.reel_stops();
        let stop_reels: Vec<u8> = stops.iter().filter_map(|e| e.stage.reel_index()).collect();

        let stops_in_order = stop_reels.windows(2).all(|w| w[0] < w[1]);
        let stops_strictly_increasing = stops
            .windows(2)
            .all(|w| w[0].timestamp_ms < w[1].timestamp_ms);
        let timestamps_monotonic = self
            .events
            .windows(2)
            .all(|w| w[0].timestamp_ms <= w[1].timestamp_ms);

        let shows = self.events_by_type("win_line_show").len();
        let clears = self.events_by_type("win_line_clear").len();

        TraceValidation {
            has_spin_start: self.has_stage("spin_start"),
            has_spin_end: self.has_stage("spin_end"),
            reel_stop_count: stops.len() as u8,
            has_all_reels: stops.len() == REEL_COUNT,
            stops_in_order,
            stops_strictly_increasing,
            timestamps_monotonic,
            lines_balanced: shows == clears,
        }
    }

    /// Get summary of trace
    pub fn summary(&self) -> TraceSummary {
        TraceSummary {
            trace_id: self.trace_id.clone(),
            event_count: self.events.len(),
            duration_ms: self.duration_ms(),
            lines_shown: self.lines_shown().len(),
            max_celebration_tier: self.max_celebration_tier(),
        }
    }
}

/// Validation result for a trace
#[derive(Debug, Clone, Default)]
pub struct TraceValidation {
    pub has_spin_start: bool,
    pub has_spin_end: bool,
    pub reel_stop_count: u8,
    pub has_all_reels: bool,
    /// Reels stopped left to right
    pub stops_in_order: bool,
    /// Stop timestamps strictly increase
    pub stops_strictly_increasing: bool,
    /// No event is earlier than its predecessor
    pub timestamps_monotonic: bool,
    /// Every highlighted line was cleared
    pub lines_balanced: bool,
}

impl TraceValidation {
    /// Check if trace is valid (has all required elements)
    pub fn is_valid(&self) -> bool {
        self.has_spin_start
            && self.has_spin_end
            && self.has_all_reels
            && self.stops_in_order
            && self.timestamps_monotonic
            && self.lines_balanced
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();

        if !self.has_spin_start {
            warnings.push("Missing SPIN_START event");
        }
        if !self.has_spin_end {
            warnings.push("Missing SPIN_END event");
        }
        if !self.has_all_reels {
            warnings.push("Not all reels have stop events");
        }
        if !self.stops_in_order {
            warnings.push("Reels did not stop left to right");
        }
        if !self.timestamps_monotonic {
            warnings.push("Event timestamps went backwards");
        }
        if !self.lines_balanced {
            warnings.push("Win line highlighted but never cleared");
        }

        warnings
    }
}

/// Summary of a trace for quick overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSummary {
    pub trace_id: String,
    pub event_count: usize,
    pub duration_ms: f64,
    pub lines_shown: usize,
    pub max_celebration_tier: CelebrationTier,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_basic_trace() -> StageTrace {
        let mut trace = StageTrace::new("test-001");

        trace.push(StageEvent::new(Stage::SpinStart, 0.0));
        for i in 0..5u8 {
            trace.push(StageEvent::new(
                Stage::ReelStop {
                    reel_index: i,
                    symbols: vec![1, 2, 3],
                    wrap_count: 8,
                },
                500.0 + (i as f64 * 150.0),
            ));
        }
        trace.push(StageEvent::new(
            Stage::WinLineShow {
                line_id: 4,
                line_amount: 2.0,
                cells: vec![],
            },
            1400.0,
        ));
        trace.push(StageEvent::new(Stage::WinLineClear { line_id: 4 }, 1700.0));
        trace.push(StageEvent::new(Stage::SpinEnd, 2000.0));

        trace
    }

    #[test]
    fn test_trace_duration() {
        let trace = create_basic_trace();
        assert_eq!(trace.duration_ms(), 2000.0);
        assert_eq!(trace.len(), 9);
    }

    #[test]
    fn test_trace_validation() {
        let trace = create_basic_trace();
        let validation = trace.validate();

        assert!(validation.has_spin_start);
        assert!(validation.has_spin_end);
        assert_eq!(validation.reel_stop_count, 5);
        assert!(validation.stops_strictly_increasing);
        assert!(validation.is_valid(), "{:?}", validation.warnings());
        assert_eq!(trace.lines_shown(), vec![4]);
    }

    #[test]
    fn test_out_of_order_stops_flagged() {
        let mut trace = StageTrace::new("test-002");
        trace.push(StageEvent::new(Stage::SpinStart, 0.0));
        for (i, reel) in [0u8, 2, 1, 3, 4].iter().enumerate() {
            trace.push(StageEvent::new(
                Stage::ReelStop {
                    reel_index: *reel,
                    symbols: vec![],
                    wrap_count: 4,
                },
                100.0 * (i as f64 + 1.0),
            ));
        }
        trace.push(StageEvent::new(Stage::SpinEnd, 900.0));

        let validation = trace.validate();
        assert!(!validation.stops_in_order);
        assert!(!validation.is_valid());
        assert!(validation.warnings().contains(&"Reels did not stop left to right"));
    }

    #[test]
    fn test_max_celebration_tier() {
        let mut trace = create_basic_trace();
        assert_eq!(trace.max_celebration_tier(), CelebrationTier::None);

        trace.push(StageEvent::new(
            Stage::CelebrationStart {
                tier: CelebrationTier::Mega,
                amount: 250.0,
            },
            2100.0,
        ));
        assert_eq!(trace.summary().max_celebration_tier, CelebrationTier::Mega);
    }

    #[test]
    fn test_trace_serialization() {
        let trace = create_basic_trace().with_round("r-1");
        let json = serde_json::to_string_pretty(&trace).unwrap();

        assert!(json.contains("spin_start"));

        let deserialized: StageTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.round_id.as_deref(), Some("r-1"));
        assert_eq!(deserialized.events.len(), trace.events.len());
    }
}
