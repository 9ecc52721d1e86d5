use serde::{Deserialize, Serialize};

use crate::generator::quiz_bank::{QuizQuestion, QuizTopic};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizKind {
    /// Level-completion challenge on one topic (or mixed).
    Boss(QuizTopic),
    /// Whole-bank mastery run; never pass/fail.
    KnowledgeTest,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_index: usize,
    /// `None` when the countdown ran out.
    pub answer: Option<usize>,
    pub correct: bool,
}

/// One question after another, each with its own countdown. Every question
/// produces exactly one `AnswerRecord`, by answer or by timeout.
#[derive(Clone, Debug)]
pub struct BossQuiz {
    kind: QuizKind,
    questions: Vec<QuizQuestion>,
    index: usize,
    correct: usize,
    answers: Vec<AnswerRecord>,
    seconds_per_question: u32,
    seconds_left: u32,
}

impl BossQuiz {
    pub fn new(kind: QuizKind, questions: Vec<QuizQuestion>, seconds_per_question: u32) -> Self {
        let seconds_per_question = seconds_per_question.max(1);
        Self {
            kind,
            questions,
            index: 0,
            correct: 0,
            answers: Vec::new(),
            seconds_per_question,
            seconds_left: seconds_per_question,
        }
    }

    pub fn kind(&self) -> &QuizKind {
        &self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.questions.len()
    }

    pub fn current(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn correct_count(&self) -> usize {
        self.correct
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn seconds_per_question(&self) -> u32 {
        self.seconds_per_question
    }

    /// Score the current question and move on. Returns the scored question
    /// with its record, or `None` once the quiz is over.
    pub fn submit(&mut self, answer: Option<usize>) -> Option<(QuizQuestion, AnswerRecord)> {
        let question = self.questions.get(self.index)?.clone();
        let correct = question.is_correct(answer);
        if correct {
            self.correct += 1;
        }
        let record = AnswerRecord {
            question_index: self.index,
            answer,
            correct,
        };
        self.answers.push(record.clone());
        self.index += 1;
        self.seconds_left = self.seconds_per_question;
        Some((question, record))
    }

    /// One second of countdown; expiry counts as an unanswered submission.
    pub fn tick(&mut self) -> Option<(QuizQuestion, AnswerRecord)> {
        if self.is_finished() {
            return None;
        }
        self.seconds_left = self.seconds_left.saturating_sub(1);
        if self.seconds_left == 0 {
            self.submit(None)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: usize) -> Vec<QuizQuestion> {
        (0..n)
            .map(|i| QuizQuestion {
                text: format!("q{i}"),
                options: vec!["a".to_string(), "b".to_string()],
                correct_index: i % 2,
            })
            .collect()
    }

    fn boss(n: usize, secs: u32) -> BossQuiz {
        BossQuiz::new(QuizKind::Boss(QuizTopic::Mixed), questions(n), secs)
    }

    #[test]
    fn test_correct_answers_score() {
        let mut quiz = boss(3, 10);
        quiz.submit(Some(0));
        quiz.submit(Some(0));
        quiz.submit(Some(0));
        assert!(quiz.is_finished());
        assert_eq!(quiz.correct_count(), 2);
        assert_eq!(quiz.answers().len(), 3);
    }

    #[test]
    fn test_no_scoring_after_finish() {
        let mut quiz = boss(1, 10);
        assert!(quiz.submit(Some(0)).is_some());
        assert!(quiz.submit(Some(0)).is_none());
        assert!(quiz.tick().is_none());
        assert_eq!(quiz.correct_count(), 1);
        assert_eq!(quiz.answers().len(), 1);
    }

    #[test]
    fn test_timeout_counts_as_wrong_and_advances() {
        let mut quiz = boss(2, 3);
        assert!(quiz.tick().is_none());
        assert!(quiz.tick().is_none());
        let (_, record) = quiz.tick().unwrap();
        assert_eq!(record.answer, None);
        assert!(!record.correct);
        assert_eq!(quiz.index(), 1);
        assert_eq!(quiz.seconds_left(), 3);
    }

    #[test]
    fn test_answer_resets_countdown() {
        let mut quiz = boss(2, 10);
        quiz.tick();
        quiz.tick();
        assert_eq!(quiz.seconds_left(), 8);
        quiz.submit(Some(1));
        assert_eq!(quiz.seconds_left(), 10);
    }

    #[test]
    fn test_out_of_range_answer_is_wrong() {
        let mut quiz = boss(1, 10);
        let (_, record) = quiz.submit(Some(42)).unwrap();
        assert!(!record.correct);
        assert_eq!(quiz.correct_count(), 0);
    }

    #[test]
    fn test_exactly_one_event_per_question_mixed_paths() {
        let n = 6;
        let mut quiz = boss(n, 2);
        let mut events = 0;
        while !quiz.is_finished() {
            if quiz.index() % 2 == 0 {
                if quiz.submit(Some(0)).is_some() {
                    events += 1;
                }
            } else if quiz.tick().is_some() {
                events += 1;
            }
        }
        assert_eq!(events, n);
        assert_eq!(quiz.answers().len(), n);
        assert!(quiz.correct_count() <= n);
    }

    #[test]
    fn test_empty_quiz_is_finished() {
        let quiz = boss(0, 10);
        assert!(quiz.is_finished());
        assert!(quiz.current().is_none());
    }
}
