use serde::{Deserialize, Serialize};

use crate::engine::levels::Mode;

/// Card faces in unlock order. The first `BASE_SYMBOLS` are always available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Star,
    Heart,
    Moon,
    Sun,
    Cloud,
    Bolt,
    Flower,
    Gem,
}

pub const UNLOCK_ORDER: &[Symbol] = &[
    Symbol::Star,
    Symbol::Heart,
    Symbol::Moon,
    Symbol::Sun,
    Symbol::Cloud,
    Symbol::Bolt,
    Symbol::Flower,
    Symbol::Gem,
];

const BASE_SYMBOLS: usize = 5;

/// Each threshold reached unlocks the next symbol after the base set.
const UNLOCK_THRESHOLDS: &[u32] = &[3, 4, 5];

const BASE_PAIRS: usize = 4;

impl Symbol {
    /// Asset key handed to the rendering layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::Star => "star",
            Symbol::Heart => "heart",
            Symbol::Moon => "moon",
            Symbol::Sun => "sun",
            Symbol::Cloud => "cloud",
            Symbol::Bolt => "bolt",
            Symbol::Flower => "flower",
            Symbol::Gem => "gem",
        }
    }
}

pub fn available_symbols(mode: Mode) -> &'static [Symbol] {
    let unlocked = match mode {
        Mode::Level(level) => UNLOCK_THRESHOLDS
            .iter()
            .filter(|&&threshold| level >= threshold)
            .count(),
        Mode::Endless | Mode::KnowledgeTest => UNLOCK_THRESHOLDS.len(),
    };
    &UNLOCK_ORDER[..BASE_SYMBOLS + unlocked]
}

pub fn pair_count(mode: Mode) -> usize {
    let available = available_symbols(mode).len();
    match mode {
        Mode::Level(level) => {
            (BASE_PAIRS + level.saturating_sub(1) as usize).min(available)
        }
        Mode::Endless | Mode::KnowledgeTest => available,
    }
}
