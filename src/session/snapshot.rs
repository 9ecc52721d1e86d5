use serde::Serialize;

use crate::engine::levels::{LevelConfig, Mode};
use crate::generator::deck::Card;
use crate::session::game::Phase;
use crate::session::result::QuizSummary;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub text: String,
    pub options: Vec<String>,
    pub seconds_left: u32,
    /// Zero-based position within the quiz; always 0 for an interstitial.
    pub index: usize,
    pub total: usize,
    pub correct_so_far: usize,
}

/// Read-only copy of the session handed to the rendering layer.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub epoch: u32,
    pub mode: Mode,
    pub phase: Phase,
    pub level: Option<LevelConfig>,
    pub cards: Vec<Card>,
    pub selection: Vec<u32>,
    pub matched_count: usize,
    /// `None` means the clock is disabled (endless, knowledge test).
    pub time_left: Option<u32>,
    pub score: u32,
    pub pairs_matched: u32,
    pub retries_left: u32,
    pub topic: Option<String>,
    pub topics_offered: Vec<String>,
    pub interstitial: Option<QuestionView>,
    pub boss_quiz: Option<QuestionView>,
    pub last_result: Option<QuizSummary>,
    pub sound_enabled: bool,
    pub now_ms: u64,
}

impl SessionSnapshot {
    pub fn face_up_unmatched(&self) -> usize {
        self.cards.iter().filter(|c| c.flipped && !c.matched).count()
    }

    pub fn all_matched(&self) -> bool {
        !self.cards.is_empty() && self.matched_count == self.cards.len()
    }
}
