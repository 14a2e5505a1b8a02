//! # rf-stage — ReelForge Presentation Stages
//!
//! Defines the render events the reel presentation core emits to the shell.
//! The shell never inspects column physics or sequencer state directly — it
//! reacts to STAGES.
//!
//! ## Philosophy
//!
//! Every round passes through the same semantic moments:
//! - Spin starts → Reels wrap → Reels brake and stop → Lines cycle → Celebration
//!
//! This crate defines these stages, the win-size taxonomy, and a trace
//! recorder used by diagnostics and tests.

pub mod stage;
pub mod event;
pub mod trace;
pub mod taxonomy;

pub use stage::*;
pub use event::*;
pub use trace::*;
pub use taxonomy::*;
