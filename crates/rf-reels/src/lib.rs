//! # rf-reels — Reel Presentation Core for ReelForge
//!
//! Animates a 5×3 reel set onto results supplied by an external authority.
//! Nothing here decides outcomes: the core only makes the screen agree with
//! the authoritative grid, in order, on time.
//!
//! ## Features
//!
//! - **Column physics**: accelerate, cruise, brake and land exactly on target
//! - **Staggered stops**: strict left-to-right landing, with quick-stop
//! - **Win cadence**: one winning line at a time, capped and skippable
//! - **Celebration gate**: tiered overlays holding the presentation lock
//! - **Motion profiles**: Normal and Fast presets, reduced-motion resolution
//!
//! ## Architecture
//!
//! ```text
//! SlotPresenter::tick(now)
//!     │
//!     ├── GridCoordinator ──► ColumnController ×5 (SymbolStrip, BrakeCurve)
//!     ├── WinCadenceSequencer (PaylineTable)
//!     └── CelebrationGate (presentation lock)
//!           │
//!           v
//!     Vec<StageEvent> → PresenterCallbacks + StageTrace
//! ```
//!
//! All components read timing from a shared [`MotionSettings`] store every
//! frame, so preference changes apply without restarting animations.

pub mod cadence;
pub mod callbacks;
pub mod celebration;
pub mod column;
pub mod config;
pub mod curve;
pub mod grid;
pub mod motion;
pub mod paytable;
pub mod presenter;
pub mod symbols;

pub use cadence::*;
pub use callbacks::*;
pub use celebration::*;
pub use column::*;
pub use config::*;
pub use curve::*;
pub use grid::*;
pub use motion::*;
pub use paytable::*;
pub use presenter::*;
pub use symbols::*;
