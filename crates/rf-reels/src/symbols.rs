//! Filler symbol source and the per-column symbol strip

use std::collections::VecDeque;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use rf_core::{ColumnSymbols, ROW_COUNT, SymbolId};

/// Slots in a strip: the visible window plus one buffer slot above and below
pub const STRIP_LEN: usize = ROW_COUNT + 2;

/// Deterministic stream of filler symbols for a spinning column
///
/// Seeded from `(base_seed, reel, spin_index)` so a replayed round scrolls
/// the same filler symbols.
#[derive(Debug, Clone)]
pub struct SymbolStream {
    rng: ChaCha8Rng,
    symbol_count: u32,
}

impl SymbolStream {
    pub fn new(base_seed: u64, reel: u8, spin_index: u64, symbol_count: u32) -> Self {
        let seed = base_seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ ((reel as u64) << 56)
            ^ spin_index.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            symbol_count: symbol_count.max(1),
        }
    }

    /// Next filler symbol
    pub fn next_symbol(&mut self) -> SymbolId {
        self.rng.random_range(0..self.symbol_count)
    }

    pub fn symbol_count(&self) -> u32 {
        self.symbol_count
    }
}

/// Ring of symbols backing one column
///
/// Slot 0 sits above the window, slots `1..=ROW_COUNT` are visible top to
/// bottom, the last slot sits below. The strip scrolls downwards: a wrap
/// drops the bottom slot and pushes the incoming symbol on top.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolStrip {
    slots: VecDeque<SymbolId>,
}

impl SymbolStrip {
    /// Fill a strip from a stream
    pub fn filled(stream: &mut SymbolStream) -> Self {
        Self {
            slots: (0..STRIP_LEN).map(|_| stream.next_symbol()).collect(),
        }
    }

    /// Strip showing `visible`, with the same symbols repeated in the buffers
    pub fn showing(visible: &ColumnSymbols) -> Self {
        let mut strip = Self {
            slots: VecDeque::from(vec![visible[0]; STRIP_LEN]),
        };
        strip.set_visible(visible);
        strip.slots[STRIP_LEN - 1] = visible[ROW_COUNT - 1];
        strip
    }

    /// Scroll one slot downwards; returns the symbol that left the strip
    pub fn wrap(&mut self, incoming: SymbolId) -> Option<SymbolId> {
        let dropped = self.slots.pop_back();
        self.slots.push_front(incoming);
        dropped
    }

    /// Visible window, top to bottom
    pub fn visible(&self) -> ColumnSymbols {
        let mut window = [0; ROW_COUNT];
        for (row, symbol) in window.iter_mut().enumerate() {
            *symbol = self.slots[row + 1];
        }
        window
    }

    /// Overwrite the visible window and the slot above it
    pub fn set_visible(&mut self, target: &ColumnSymbols) {
        for (row, symbol) in target.iter().enumerate() {
            self.slots[row + 1] = *symbol;
        }
        self.slots[0] = target[0];
    }

    /// Symbol in a strip slot (0 = above the window)
    pub fn slot(&self, index: usize) -> Option<SymbolId> {
        self.slots.get(index).copied()
    }

    pub fn to_vec(&self) -> Vec<SymbolId> {
        self.slots.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
