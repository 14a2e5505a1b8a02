//! rf-core: Shared types, traits, and utilities for ReelForge presentation
//!
//! This crate provides the foundational types used across the presentation crates:
//! the 5×3 result grid, win-line descriptors, the round payload delivered by the
//! result authority, one-shot completion handles, the diagnostic channel and the
//! frame clock.

mod completion;
mod diagnostics;
mod error;
mod grid;
mod time;
mod win;

pub use completion::*;
pub use diagnostics::*;
pub use error::*;
pub use grid::*;
pub use time::*;
pub use win::*;
