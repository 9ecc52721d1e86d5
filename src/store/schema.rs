use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const HIGHEST_LEVEL_UNLOCKED: &str = "HIGHEST_LEVEL_UNLOCKED";
pub const KNOWLEDGE_TEST_CORRECT: &str = "KNOWLEDGE_TEST_CORRECT";
pub const SOUND_ENABLED: &str = "SOUND_ENABLED";

pub const ALL_KEYS: &[&str] = &[HIGHEST_LEVEL_UNLOCKED, KNOWLEDGE_TEST_CORRECT, SOUND_ENABLED];

/// Everything the progress keys hold, decoded with defaults applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressData {
    pub highest_level_unlocked: u32,
    pub mastered_questions: BTreeSet<String>,
    pub sound_enabled: bool,
}

impl Default for ProgressData {
    fn default() -> Self {
        Self {
            highest_level_unlocked: 1,
            mastered_questions: BTreeSet::new(),
            sound_enabled: true,
        }
    }
}
