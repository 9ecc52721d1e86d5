use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::boss_quiz::{AnswerRecord, BossQuiz, QuizKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizVerdict {
    Passed,
    Failed,
    /// Knowledge tests only report completion.
    Complete,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizSummary {
    pub kind: QuizKind,
    pub correct: usize,
    pub total: usize,
    pub verdict: QuizVerdict,
    /// Quiz retries remaining for the current level attempt.
    pub retries_left: u32,
    pub answers: Vec<AnswerRecord>,
    #[serde(default)]
    pub newly_mastered: usize,
    pub finished_at: DateTime<Utc>,
}

impl QuizSummary {
    pub fn from_quiz(
        quiz: &BossQuiz,
        verdict: QuizVerdict,
        retries_left: u32,
        newly_mastered: usize,
    ) -> Self {
        Self {
            kind: quiz.kind().clone(),
            correct: quiz.correct_count(),
            total: quiz.total(),
            verdict,
            retries_left,
            answers: quiz.answers().to_vec(),
            newly_mastered,
            finished_at: Utc::now(),
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == QuizVerdict::Passed
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.correct as f64 / self.total as f64 * 100.0).clamp(0.0, 100.0)
    }
}
