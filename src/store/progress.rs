use std::collections::BTreeSet;

use crate::engine::levels::MAX_LEVEL;
use crate::store::schema::{
    ALL_KEYS, HIGHEST_LEVEL_UNLOCKED, KNOWLEDGE_TEST_CORRECT, ProgressData, SOUND_ENABLED,
};
use crate::store::{KvStore, StoreError};

/// Typed view over the progress keys. Reads never fail: absent or malformed
/// values decode to their defaults.
pub struct ProgressStore<S: KvStore> {
    backend: S,
}

impl<S: KvStore> ProgressStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn highest_level_unlocked(&self) -> u32 {
        self.backend
            .get(HIGHEST_LEVEL_UNLOCKED)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|&level| level >= 1)
            .map_or(1, |level| level.min(MAX_LEVEL))
    }

    /// Raise the high-water mark to `level`; never lowers it.
    pub fn unlock_level(&mut self, level: u32) -> Result<u32, StoreError> {
        let current = self.highest_level_unlocked();
        let next = current.max(level.min(MAX_LEVEL));
        if next != current || self.backend.get(HIGHEST_LEVEL_UNLOCKED).is_none() {
            self.backend.set(HIGHEST_LEVEL_UNLOCKED, &next.to_string())?;
        }
        Ok(next)
    }

    pub fn is_level_unlocked(&self, level: u32) -> bool {
        level >= 1 && level <= self.highest_level_unlocked()
    }

    pub fn mastered_questions(&self) -> BTreeSet<String> {
        self.backend
            .get(KNOWLEDGE_TEST_CORRECT)
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .map(|texts| texts.into_iter().collect())
            .unwrap_or_default()
    }

    /// Idempotent: returns `false` when the question was already recorded.
    pub fn add_mastered(&mut self, question_text: &str) -> Result<bool, StoreError> {
        let mut mastered = self.mastered_questions();
        if !mastered.insert(question_text.to_string()) {
            return Ok(false);
        }
        let texts: Vec<&String> = mastered.iter().collect();
        self.backend
            .set(KNOWLEDGE_TEST_CORRECT, &serde_json::to_string(&texts)?)?;
        Ok(true)
    }

    pub fn sound_enabled(&self) -> bool {
        self.backend
            .get(SOUND_ENABLED)
            .and_then(|raw| serde_json::from_str::<bool>(&raw).ok())
            .unwrap_or(true)
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.backend
            .set(SOUND_ENABLED, &serde_json::to_string(&enabled)?)
    }

    pub fn toggle_sound(&mut self) -> Result<bool, StoreError> {
        let enabled = !self.sound_enabled();
        self.set_sound_enabled(enabled)?;
        Ok(enabled)
    }

    pub fn snapshot(&self) -> ProgressData {
        ProgressData {
            highest_level_unlocked: self.highest_level_unlocked(),
            mastered_questions: self.mastered_questions(),
            sound_enabled: self.sound_enabled(),
        }
    }

    pub fn reset(&mut self) -> Result<(), StoreError> {
        for key in ALL_KEYS {
            self.backend.remove(key)?;
        }
        Ok(())
    }
}
