use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::engine::levels::{self, MAX_LEVEL, Mode, RouteParams};
use crate::engine::scoring;
use crate::generator::deck::{Deck, build_deck};
use crate::generator::quiz_bank::{MIXED_TOPIC, QuizBank, QuizQuestion, QuizTopic};
use crate::session::boss_quiz::{AnswerRecord, BossQuiz, QuizKind};
use crate::session::input::{self, GameEvent};
use crate::session::result::{QuizSummary, QuizVerdict};
use crate::session::snapshot::{QuestionView, SessionSnapshot};
use crate::session::timer::{Timer, TimerKind, TimerQueue};
use crate::store::{KvStore, ProgressStore};

const TICK_MS: u64 = 1000;
const MAX_INTERSTITIALS_PER_ATTEMPT: u32 = 1;

/// Single source of truth for what the game screen shows. Modal states are
/// phases, so two modals can never be up at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Building,
    Playing,
    QuizInterstitial,
    Lost,
    TopicSelect,
    BossQuiz,
    BossResult,
    Finished,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Building => "building",
            Phase::Playing => "playing",
            Phase::QuizInterstitial => "quiz-interstitial",
            Phase::Lost => "lost",
            Phase::TopicSelect => "topic-select",
            Phase::BossQuiz => "boss-quiz",
            Phase::BossResult => "boss-result",
            Phase::Finished => "finished",
        }
    }
}

#[derive(Clone, Debug)]
struct Interstitial {
    question: QuizQuestion,
    seconds_left: u32,
}

/// One game-screen visit: a level attempt (and its boss quiz), an endless run
/// or a knowledge test. Time only moves through [`GameSession::advance_time`].
pub struct GameSession<S: KvStore> {
    config: Config,
    progress: ProgressStore<S>,
    bank: Arc<QuizBank>,
    rng: SmallRng,
    mode: Mode,
    preset_topic: Option<QuizTopic>,
    phase: Phase,
    deck: Deck,
    selection: Vec<u32>,
    pending_mismatch: Option<(u32, u32)>,
    time_left: Option<u32>,
    score: u32,
    pairs_matched: u32,
    interstitial: Option<Interstitial>,
    interstitials_shown: u32,
    boss_quiz: Option<BossQuiz>,
    quiz_topic: Option<QuizTopic>,
    newly_mastered: usize,
    last_result: Option<QuizSummary>,
    retries_left: u32,
    /// Bumped on every `Building` transition; timers from older epochs are dropped.
    epoch: u32,
    timers: TimerQueue,
}

impl<S: KvStore> GameSession<S> {
    pub fn new(
        params: &RouteParams,
        config: Config,
        progress: ProgressStore<S>,
        bank: Arc<QuizBank>,
    ) -> Self {
        Self::with_rng(params, config, progress, bank, SmallRng::from_entropy())
    }

    pub fn with_rng(
        params: &RouteParams,
        config: Config,
        progress: ProgressStore<S>,
        bank: Arc<QuizBank>,
        rng: SmallRng,
    ) -> Self {
        let preset_topic = params
            .topic
            .as_deref()
            .map(QuizTopic::parse)
            .filter(|topic| bank.has_topic(topic));
        let retries_left = config.boss_retries;
        let mut session = Self {
            config,
            progress,
            bank,
            rng,
            mode: params.mode(),
            preset_topic,
            phase: Phase::Building,
            deck: Deck::default(),
            selection: Vec::with_capacity(2),
            pending_mismatch: None,
            time_left: None,
            score: 0,
            pairs_matched: 0,
            interstitial: None,
            interstitials_shown: 0,
            boss_quiz: None,
            quiz_topic: None,
            newly_mastered: 0,
            last_result: None,
            retries_left,
            epoch: 0,
            timers: TimerQueue::new(),
        };
        session.start_attempt();
        session
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn selection(&self) -> &[u32] {
        &self.selection
    }

    pub fn matched_count(&self) -> usize {
        self.deck.matched_count()
    }

    pub fn time_left(&self) -> Option<u32> {
        self.time_left
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn retries_left(&self) -> u32 {
        self.retries_left
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn boss_quiz(&self) -> Option<&BossQuiz> {
        self.boss_quiz.as_ref()
    }

    pub fn last_result(&self) -> Option<&QuizSummary> {
        self.last_result.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn progress(&self) -> &ProgressStore<S> {
        &self.progress
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_scheduled(kind)
    }

    pub fn handle(&mut self, event: GameEvent) -> bool {
        input::apply(self, event)
    }

    // --- Building -------------------------------------------------------

    fn start_attempt(&mut self) {
        self.timers.cancel_all();
        self.epoch = self.epoch.wrapping_add(1);
        self.phase = Phase::Building;
        self.selection.clear();
        self.pending_mismatch = None;
        self.score = 0;
        self.pairs_matched = 0;
        self.interstitial = None;
        self.interstitials_shown = 0;
        self.boss_quiz = None;
        self.quiz_topic = None;
        self.last_result = None;
        self.retries_left = self.config.boss_retries;

        match self.mode {
            Mode::KnowledgeTest => {
                self.deck = Deck::default();
                self.time_left = None;
                let questions = self.bank.full_test(&mut self.rng);
                log::info!("knowledge test started with {} questions", questions.len());
                self.enter_quiz(
                    QuizKind::KnowledgeTest,
                    questions,
                    self.config.knowledge_question_secs,
                );
            }
            mode => {
                self.deck = build_deck(mode, &mut self.rng);
                self.time_left = mode
                    .level()
                    .map(|level| scoring::level_time_secs(level, &self.config));
                self.phase = Phase::Playing;
                if self.time_left.is_some() {
                    self.timers.schedule(TimerKind::Countdown, TICK_MS, self.epoch);
                }
                self.arm_reshuffle();
                log::info!(
                    "{} session started (epoch {}, {} cards, {:?}s)",
                    mode.as_str(),
                    self.epoch,
                    self.deck.len(),
                    self.time_left
                );
            }
        }
    }

    fn arm_reshuffle(&mut self) {
        if let Some(level) = self.mode.level()
            && self.config.reshuffle_enabled
        {
            let interval = scoring::reshuffle_interval_secs(level, &self.config) as u64 * 1000;
            self.timers.cancel(TimerKind::Reshuffle);
            self.timers.schedule(TimerKind::Reshuffle, interval, self.epoch);
        }
    }

    // --- Playing --------------------------------------------------------

    /// Flip a face-down card. Ignored outside `Playing`, for unknown, face-up
    /// or matched cards, and while a mismatched pair waits to turn back.
    pub fn press_card(&mut self, id: u32) -> bool {
        if self.phase != Phase::Playing || self.selection.len() >= 2 {
            return false;
        }
        let Some(card) = self.deck.card_mut(id) else {
            return false;
        };
        if card.flipped || card.matched {
            return false;
        }
        card.flipped = true;
        self.selection.push(id);
        if self.selection.len() == 2 {
            self.resolve_selection();
        }
        true
    }

    fn resolve_selection(&mut self) {
        let (a, b) = (self.selection[0], self.selection[1]);
        let pair_a = self.deck.card(a).map(|c| c.pair_id);
        let pair_b = self.deck.card(b).map(|c| c.pair_id);

        match (pair_a, pair_b) {
            (Some(pa), Some(pb)) if pa == pb => {
                for id in [a, b] {
                    if let Some(card) = self.deck.card_mut(id) {
                        card.matched = true;
                    }
                }
                self.selection.clear();
                self.pairs_matched += 1;
                if self.mode == Mode::Endless {
                    self.replace_endless_pair(pa);
                } else if self.deck.all_matched() {
                    self.win();
                }
            }
            _ => {
                self.pending_mismatch = Some((a, b));
                self.timers.schedule(
                    TimerKind::MismatchReset,
                    self.config.mismatch_delay_ms,
                    self.epoch,
                );
            }
        }
    }

    fn replace_endless_pair(&mut self, pair_id: u32) {
        self.score += self.config.endless_match_reward;
        self.deck.remove_pair(pair_id);
        self.deck.insert_pair(&mut self.rng);
        self.deck.shuffle(&mut self.rng);
    }

    /// Turn a pending mismatched pair back over right away.
    fn settle_mismatch(&mut self) {
        self.timers.cancel(TimerKind::MismatchReset);
        if let Some((a, b)) = self.pending_mismatch.take() {
            for id in [a, b] {
                if let Some(card) = self.deck.card_mut(id)
                    && !card.matched
                {
                    card.flipped = false;
                }
            }
            self.selection.clear();
        }
    }

    /// Board cleared: straight on to the route's boss topic, or to topic selection.
    fn win(&mut self) {
        self.timers.cancel_all();
        log::info!(
            "level cleared with {:?}s left after {} pairs",
            self.time_left,
            self.pairs_matched
        );
        match self.preset_topic.clone() {
            Some(topic) => self.start_boss_quiz(topic),
            None => self.phase = Phase::TopicSelect,
        }
    }

    fn lose(&mut self) {
        self.settle_mismatch();
        self.timers.cancel_all();
        self.interstitial = None;
        self.phase = Phase::Lost;
        log::info!("out of time with {}/{} cards matched", self.matched_count(), self.deck.len());
    }

    // --- Timers ---------------------------------------------------------

    /// Move the session clock forward, firing every timer that falls due.
    pub fn advance_time(&mut self, elapsed_ms: u64) {
        let until = self.timers.now_ms().saturating_add(elapsed_ms);
        while let Some(timer) = self.timers.pop_due(until, self.epoch) {
            self.fire(timer);
        }
        self.timers.set_now(until);
    }

    fn fire(&mut self, timer: Timer) {
        log::trace!("{:?} fired at {}ms", timer.kind, timer.due_ms);
        match timer.kind {
            TimerKind::Countdown => self.on_countdown(),
            TimerKind::Reshuffle => self.on_reshuffle(),
            TimerKind::MismatchReset => self.settle_mismatch(),
            TimerKind::InterstitialCountdown => self.on_interstitial_tick(),
            TimerKind::QuizCountdown => self.on_quiz_tick(),
        }
    }

    fn on_countdown(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        let Some(time_left) = self.time_left else {
            return;
        };
        let time_left = time_left.saturating_sub(1);
        self.time_left = Some(time_left);

        if time_left == 0 {
            self.lose();
            return;
        }
        if self.config.interstitial_enabled
            && self.interstitials_shown < MAX_INTERSTITIALS_PER_ATTEMPT
            && time_left == self.config.interstitial_trigger_secs
            && let Some(question) = self.bank.random_question(&mut self.rng)
        {
            self.enter_interstitial(question);
            return;
        }
        self.timers.schedule(TimerKind::Countdown, TICK_MS, self.epoch);
    }

    fn on_reshuffle(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        self.settle_mismatch();
        self.deck.flip_back_unmatched();
        self.selection.clear();
        self.deck.shuffle(&mut self.rng);
        log::debug!("deck reshuffled");
        self.arm_reshuffle();
    }

    // --- Interstitial ---------------------------------------------------

    fn enter_interstitial(&mut self, question: QuizQuestion) {
        self.settle_mismatch();
        self.timers.cancel(TimerKind::Countdown);
        self.timers.cancel(TimerKind::Reshuffle);
        self.interstitials_shown += 1;
        self.interstitial = Some(Interstitial {
            question,
            seconds_left: self.config.interstitial_time_secs,
        });
        self.phase = Phase::QuizInterstitial;
        self.timers
            .schedule(TimerKind::InterstitialCountdown, TICK_MS, self.epoch);
        log::info!("interstitial quiz at {:?}s left", self.time_left);
    }

    fn on_interstitial_tick(&mut self) {
        if self.phase != Phase::QuizInterstitial {
            return;
        }
        let Some(interstitial) = self.interstitial.as_mut() else {
            return;
        };
        interstitial.seconds_left = interstitial.seconds_left.saturating_sub(1);
        if interstitial.seconds_left == 0 {
            self.finish_interstitial(None);
        } else {
            self.timers
                .schedule(TimerKind::InterstitialCountdown, TICK_MS, self.epoch);
        }
    }

    fn finish_interstitial(&mut self, answer: Option<usize>) -> bool {
        self.timers.cancel(TimerKind::InterstitialCountdown);
        let Some(interstitial) = self.interstitial.take() else {
            return false;
        };
        let correct = interstitial.question.is_correct(answer);
        let time_left = scoring::apply_interstitial_result(
            self.time_left.unwrap_or(0),
            correct,
            self.config.interstitial_bonus_secs,
        );
        self.time_left = Some(time_left);
        log::debug!("interstitial answered correct={correct}, {time_left}s left");

        if time_left == 0 {
            self.lose();
            return true;
        }
        self.phase = Phase::Playing;
        self.timers.schedule(TimerKind::Countdown, TICK_MS, self.epoch);
        self.arm_reshuffle();
        true
    }

    // --- Boss quiz ------------------------------------------------------

    fn start_boss_quiz(&mut self, topic: QuizTopic) {
        let level = self.mode.level().unwrap_or(1);
        let count = scoring::boss_question_count(level, &self.config);
        let questions = self.bank.questions_for_topic(&topic, count, &mut self.rng);
        log::info!(
            "boss quiz on {} with {} questions ({} retries left)",
            topic.as_str(),
            questions.len(),
            self.retries_left
        );
        self.quiz_topic = Some(topic.clone());
        self.enter_quiz(QuizKind::Boss(topic), questions, self.config.boss_question_secs);
    }

    fn enter_quiz(&mut self, kind: QuizKind, questions: Vec<QuizQuestion>, seconds: u32) {
        self.timers.cancel_all();
        self.newly_mastered = 0;
        let quiz = BossQuiz::new(kind, questions, seconds);
        let finished = quiz.is_finished();
        self.boss_quiz = Some(quiz);
        self.phase = Phase::BossQuiz;
        if finished {
            self.finish_boss_quiz();
        } else {
            self.timers.schedule(TimerKind::QuizCountdown, TICK_MS, self.epoch);
        }
    }

    fn on_quiz_tick(&mut self) {
        if self.phase != Phase::BossQuiz {
            return;
        }
        let Some(quiz) = self.boss_quiz.as_mut() else {
            return;
        };
        match quiz.tick() {
            Some((question, record)) => self.after_quiz_answer(&question, &record),
            None => {
                self.timers.schedule(TimerKind::QuizCountdown, TICK_MS, self.epoch);
            }
        }
    }

    fn answer_quiz(&mut self, answer: Option<usize>) -> bool {
        let Some(quiz) = self.boss_quiz.as_mut() else {
            return false;
        };
        let Some((question, record)) = quiz.submit(answer) else {
            return false;
        };
        self.after_quiz_answer(&question, &record);
        true
    }

    fn after_quiz_answer(&mut self, question: &QuizQuestion, record: &AnswerRecord) {
        if record.correct && self.mode == Mode::KnowledgeTest {
            match self.progress.add_mastered(&question.text) {
                Ok(true) => self.newly_mastered += 1,
                Ok(false) => {}
                Err(e) => log::warn!("could not record mastered question: {e}"),
            }
        }
        self.timers.cancel(TimerKind::QuizCountdown);
        if self.boss_quiz.as_ref().is_none_or(BossQuiz::is_finished) {
            self.finish_boss_quiz();
        } else {
            self.timers.schedule(TimerKind::QuizCountdown, TICK_MS, self.epoch);
        }
    }

    fn finish_boss_quiz(&mut self) {
        self.timers.cancel_all();
        let Some(quiz) = self.boss_quiz.take() else {
            return;
        };
        let verdict = match quiz.kind() {
            QuizKind::KnowledgeTest => QuizVerdict::Complete,
            QuizKind::Boss(_) => {
                if scoring::quiz_passed(quiz.correct_count(), quiz.total(), self.config.pass_ratio)
                {
                    QuizVerdict::Passed
                } else {
                    QuizVerdict::Failed
                }
            }
        };
        match verdict {
            QuizVerdict::Passed => {
                if let Some(level) = self.mode.level()
                    && let Err(e) = self.progress.unlock_level(level + 1)
                {
                    log::warn!("could not persist unlock of level {}: {e}", level + 1);
                }
            }
            QuizVerdict::Failed => self.retries_left = self.retries_left.saturating_sub(1),
            QuizVerdict::Complete => {}
        }
        log::info!(
            "quiz finished {}/{} ({verdict:?})",
            quiz.correct_count(),
            quiz.total()
        );
        self.last_result = Some(QuizSummary::from_quiz(
            &quiz,
            verdict,
            self.retries_left,
            self.newly_mastered,
        ));
        self.phase = Phase::BossResult;
    }

    // --- Events ---------------------------------------------------------

    /// Answer the interstitial or the current boss-quiz question.
    pub fn submit_answer(&mut self, index: usize) -> bool {
        match self.phase {
            Phase::QuizInterstitial => self.finish_interstitial(Some(index)),
            Phase::BossQuiz => self.answer_quiz(Some(index)),
            _ => false,
        }
    }

    pub fn select_topic(&mut self, name: &str) -> bool {
        if self.phase != Phase::TopicSelect || self.mode.level().is_none() {
            return false;
        }
        let topic = QuizTopic::parse(name);
        if !self.bank.has_topic(&topic) {
            return false;
        }
        self.start_boss_quiz(topic);
        true
    }

    pub fn retry(&mut self) -> bool {
        match self.phase {
            Phase::Playing | Phase::QuizInterstitial | Phase::Lost => {
                self.start_attempt();
                true
            }
            Phase::BossResult => {
                let failed = self
                    .last_result
                    .as_ref()
                    .is_some_and(|r| r.verdict == QuizVerdict::Failed);
                match self.quiz_topic.clone() {
                    Some(topic) if failed && self.retries_left > 0 => self.start_boss_quiz(topic),
                    _ => self.start_attempt(),
                }
                true
            }
            _ => false,
        }
    }

    pub fn advance(&mut self) -> bool {
        match self.phase {
            Phase::BossResult => {
                let passed = self.last_result.as_ref().is_some_and(QuizSummary::passed);
                let Some(level) = self.mode.level() else {
                    return false;
                };
                if !passed {
                    return false;
                }
                if level >= MAX_LEVEL {
                    self.finish();
                } else {
                    self.mode = Mode::Level(level + 1);
                    self.start_attempt();
                }
                true
            }
            _ => false,
        }
    }

    pub fn abandon(&mut self) -> bool {
        if self.phase == Phase::Finished {
            return false;
        }
        self.finish();
        true
    }

    fn finish(&mut self) {
        self.settle_mismatch();
        self.timers.cancel_all();
        self.interstitial = None;
        self.boss_quiz = None;
        self.phase = Phase::Finished;
        log::info!("session finished ({} pairs matched, score {})", self.pairs_matched, self.score);
    }

    // --- Rendering ------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        let topics_offered = if self.phase == Phase::TopicSelect {
            self.bank
                .topics()
                .into_iter()
                .map(str::to_string)
                .chain(std::iter::once(MIXED_TOPIC.to_string()))
                .collect()
        } else {
            Vec::new()
        };

        SessionSnapshot {
            epoch: self.epoch,
            mode: self.mode,
            phase: self.phase,
            level: self
                .mode
                .level()
                .and_then(|level| levels::level_config(level, &self.config)),
            cards: self.deck.cards().to_vec(),
            selection: self.selection.clone(),
            matched_count: self.deck.matched_count(),
            time_left: self.time_left,
            score: self.score,
            pairs_matched: self.pairs_matched,
            retries_left: self.retries_left,
            topic: self
                .quiz_topic
                .as_ref()
                .or(self.preset_topic.as_ref())
                .map(|t| t.as_str().to_string()),
            topics_offered,
            interstitial: self.interstitial.as_ref().map(|i| QuestionView {
                text: i.question.text.clone(),
                options: i.question.options.clone(),
                seconds_left: i.seconds_left,
                index: 0,
                total: 1,
                correct_so_far: 0,
            }),
            boss_quiz: self.boss_quiz.as_ref().and_then(|quiz| {
                quiz.current().map(|q| QuestionView {
                    text: q.text.clone(),
                    options: q.options.clone(),
                    seconds_left: quiz.seconds_left(),
                    index: quiz.index(),
                    total: quiz.total(),
                    correct_so_far: quiz.correct_count(),
                })
            }),
            last_result: self.last_result.clone(),
            sound_enabled: self.progress.sound_enabled(),
            now_ms: self.timers.now_ms(),
        }
    }
}

impl<S: KvStore> Drop for GameSession<S> {
    fn drop(&mut self) {
        if self.phase != Phase::Finished {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::{BTreeMap, HashMap};

    fn bank() -> Arc<QuizBank> {
        let questions = (0..12)
            .map(|i| QuizQuestion {
                text: format!("science {i}"),
                options: vec!["right".to_string(), "wrong".to_string()],
                correct_index: 0,
            })
            .collect();
        let mut topics = BTreeMap::new();
        topics.insert("science".to_string(), questions);
        Arc::new(QuizBank::from_topics(topics))
    }

    fn quiet_config() -> Config {
        Config {
            interstitial_enabled: false,
            reshuffle_enabled: false,
            ..Config::default()
        }
    }

    fn session_with(params: RouteParams, config: Config) -> GameSession<MemoryStore> {
        GameSession::with_rng(
            &params,
            config,
            ProgressStore::new(MemoryStore::new()),
            bank(),
            SmallRng::seed_from_u64(7),
        )
    }

    fn level_session(level: u32) -> GameSession<MemoryStore> {
        session_with(RouteParams::new(Mode::Level(level)), quiet_config())
    }

    fn open_pairs<S: KvStore>(session: &GameSession<S>) -> Vec<(u32, u32)> {
        let mut by_pair: HashMap<u32, Vec<u32>> = HashMap::new();
        for card in session.deck().cards().iter().filter(|c| !c.matched) {
            by_pair.entry(card.pair_id).or_default().push(card.id);
        }
        let mut pairs: Vec<(u32, u32)> = by_pair.into_values().map(|ids| (ids[0], ids[1])).collect();
        pairs.sort();
        pairs
    }

    fn clear_board<S: KvStore>(session: &mut GameSession<S>) {
        for (a, b) in open_pairs(session) {
            assert!(session.press_card(a));
            assert!(session.press_card(b));
        }
    }

    fn answer_all<S: KvStore>(session: &mut GameSession<S>, index: usize) {
        while session.phase() == Phase::BossQuiz {
            assert!(session.submit_answer(index));
        }
    }

    #[test]
    fn test_level_starts_playing_with_clock() {
        let session = level_session(1);
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.deck().len(), 8);
        assert_eq!(session.time_left(), Some(60));
        assert!(session.is_timer_armed(TimerKind::Countdown));
        assert_eq!(session.epoch(), 1);
    }

    #[test]
    fn test_matching_pair_stays_face_up() {
        let mut session = level_session(1);
        let (a, b) = open_pairs(&session)[0];
        session.press_card(a);
        session.press_card(b);
        assert_eq!(session.matched_count(), 2);
        assert!(session.selection().is_empty());
        assert!(!session.press_card(a));
    }

    #[test]
    fn test_mismatch_turns_back_after_delay() {
        let mut session = level_session(1);
        let pairs = open_pairs(&session);
        let (a, c) = (pairs[0].0, pairs[1].0);
        session.press_card(a);
        session.press_card(c);
        assert_eq!(session.selection().len(), 2);

        // No third card while the pair waits to turn back.
        assert!(!session.press_card(pairs[2].0));

        session.advance_time(799);
        assert!(session.deck().card(a).unwrap().flipped);
        session.advance_time(1);
        assert!(!session.deck().card(a).unwrap().flipped);
        assert!(!session.deck().card(c).unwrap().flipped);
        assert!(session.selection().is_empty());
        assert!(session.press_card(a));
    }

    #[test]
    fn test_clearing_board_opens_topic_select() {
        let mut session = level_session(1);
        session.advance_time(5_000);
        clear_board(&mut session);
        assert_eq!(session.phase(), Phase::TopicSelect);
        assert_eq!(session.pending_timers(), 0);
        assert_eq!(session.time_left(), Some(55));
        session.advance_time(60_000);
        assert_eq!(session.phase(), Phase::TopicSelect);
        assert_eq!(session.time_left(), Some(55));
    }

    #[test]
    fn test_retry_during_mismatch_leaves_new_deck_alone() {
        let mut session = level_session(1);
        let pairs = open_pairs(&session);
        session.press_card(pairs[0].0);
        session.press_card(pairs[1].0);
        assert!(session.is_timer_armed(TimerKind::MismatchReset));

        assert!(session.retry());
        assert!(!session.is_timer_armed(TimerKind::MismatchReset));
        let fresh = open_pairs(&session)[0].0;
        assert!(session.press_card(fresh));

        session.advance_time(900);
        assert!(session.deck().card(fresh).unwrap().flipped);
        assert_eq!(session.selection(), &[fresh]);
        assert_eq!(
            session.deck().cards().iter().filter(|c| c.flipped).count(),
            1
        );
    }

    #[test]
    fn test_clock_running_out_loses() {
        let mut session = level_session(1);
        session.advance_time(59_999);
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.time_left(), Some(1));
        session.advance_time(1);
        assert_eq!(session.phase(), Phase::Lost);
        assert_eq!(session.pending_timers(), 0);
        assert!(!session.press_card(0));
    }

    #[test]
    fn test_interstitial_correct_answer_adds_time() {
        let config = Config {
            reshuffle_enabled: false,
            ..Config::default()
        };
        let mut session = session_with(RouteParams::new(Mode::Level(1)), config);
        session.advance_time(49_000);
        assert_eq!(session.phase(), Phase::QuizInterstitial);
        assert!(session.snapshot().interstitial.is_some());
        assert_eq!(session.time_left(), Some(11));
        assert!(!session.is_timer_armed(TimerKind::Countdown));

        // Clock is frozen while the question is up.
        session.advance_time(5_000);
        assert_eq!(session.time_left(), Some(11));

        assert!(session.submit_answer(0));
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.time_left(), Some(21));

        // Only one interstitial per attempt.
        session.advance_time(10_000);
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.time_left(), Some(11));
    }

    #[test]
    fn test_interstitial_timeout_costs_time() {
        let config = Config {
            reshuffle_enabled: false,
            ..Config::default()
        };
        let mut session = session_with(RouteParams::new(Mode::Level(1)), config);
        session.advance_time(49_000);
        session.advance_time(15_000);
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.time_left(), Some(1));
        session.advance_time(1_000);
        assert_eq!(session.phase(), Phase::Lost);
    }

    #[test]
    fn test_reshuffle_turns_face_up_cards_back() {
        let config = Config {
            interstitial_enabled: false,
            ..Config::default()
        };
        let mut session = session_with(RouteParams::new(Mode::Level(1)), config);
        let (a, b) = open_pairs(&session)[0];
        session.press_card(a);
        session.press_card(b);
        let (c, _) = open_pairs(&session)[0];
        session.press_card(c);

        session.advance_time(20_000);
        assert!(session.selection().is_empty());
        assert!(!session.deck().card(c).unwrap().flipped);
        assert_eq!(session.matched_count(), 2);
        assert!(session.is_timer_armed(TimerKind::Reshuffle));
    }

    #[test]
    fn test_boss_pass_unlocks_next_level() {
        let mut session = level_session(1);
        clear_board(&mut session);
        assert_eq!(session.phase(), Phase::TopicSelect);
        assert!(session.snapshot().topics_offered.contains(&"mixed".to_string()));
        assert!(!session.advance());
        assert!(!session.select_topic("geography"));
        assert!(session.select_topic("science"));
        assert_eq!(session.boss_quiz().unwrap().total(), 10);

        answer_all(&mut session, 0);
        assert_eq!(session.phase(), Phase::BossResult);
        assert!(session.last_result().unwrap().passed());
        assert_eq!(session.progress().highest_level_unlocked(), 2);

        assert!(session.advance());
        assert_eq!(session.mode(), Mode::Level(2));
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.time_left(), Some(70));
    }

    #[test]
    fn test_boss_fail_spends_retries() {
        let mut session = level_session(1);
        clear_board(&mut session);
        session.select_topic("science");
        answer_all(&mut session, 1);
        assert_eq!(session.last_result().unwrap().verdict, QuizVerdict::Failed);
        assert_eq!(session.retries_left(), 2);
        assert!(!session.advance());

        for expected in [1, 0] {
            assert!(session.retry());
            assert_eq!(session.phase(), Phase::BossQuiz);
            answer_all(&mut session, 1);
            assert_eq!(session.retries_left(), expected);
        }

        // Out of retries: replay the level from scratch.
        assert!(session.retry());
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.retries_left(), 3);
        assert_eq!(session.progress().highest_level_unlocked(), 1);
    }

    #[test]
    fn test_boss_timeout_counts_wrong() {
        let mut session = level_session(1);
        clear_board(&mut session);
        session.select_topic("mixed");
        session.advance_time(10_000 * 10);
        let result = session.last_result().unwrap();
        assert_eq!(result.correct, 0);
        assert_eq!(result.answers.len(), 10);
        assert!(result.answers.iter().all(|a| a.answer.is_none()));
    }

    #[test]
    fn test_route_topic_skips_selection() {
        let params = RouteParams::new(Mode::Level(1)).with_topic("science");
        let mut session = session_with(params, quiet_config());
        clear_board(&mut session);
        assert_eq!(session.phase(), Phase::BossQuiz);
        assert_eq!(session.snapshot().topic.as_deref(), Some("science"));
    }

    #[test]
    fn test_last_level_pass_finishes() {
        let mut session = level_session(MAX_LEVEL);
        clear_board(&mut session);
        session.select_topic("science");
        answer_all(&mut session, 0);
        assert!(session.advance());
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(session.progress().highest_level_unlocked(), MAX_LEVEL);
    }

    #[test]
    fn test_endless_replaces_matched_pair() {
        let mut session = session_with(RouteParams::new(Mode::Endless), quiet_config());
        assert_eq!(session.time_left(), None);
        let size = session.deck().len();
        let (a, b) = open_pairs(&session)[0];
        session.press_card(a);
        session.press_card(b);
        assert_eq!(session.score(), 10);
        assert_eq!(session.deck().len(), size);
        assert_eq!(session.matched_count(), 0);
        assert!(session.deck().pairing_is_valid());
        assert!(session.deck().faces_are_unique());
        assert!(session.deck().card(a).is_none());

        session.advance_time(600_000);
        assert_eq!(session.phase(), Phase::Playing);
    }

    #[test]
    fn test_knowledge_test_records_mastery() {
        let mut session = session_with(RouteParams::new(Mode::KnowledgeTest), quiet_config());
        assert_eq!(session.phase(), Phase::BossQuiz);
        assert!(session.deck().is_empty());
        answer_all(&mut session, 0);

        let result = session.last_result().unwrap();
        assert_eq!(result.verdict, QuizVerdict::Complete);
        assert_eq!(result.newly_mastered, 12);
        assert_eq!(session.progress().mastered_questions().len(), 12);

        // A second pass masters nothing new.
        assert!(session.retry());
        answer_all(&mut session, 0);
        assert_eq!(session.last_result().unwrap().newly_mastered, 0);
    }

    #[test]
    fn test_retry_starts_new_epoch() {
        let mut session = level_session(1);
        session.advance_time(30_000);
        let (a, _) = open_pairs(&session)[0];
        session.press_card(a);
        assert!(session.retry());
        assert_eq!(session.epoch(), 2);
        assert_eq!(session.time_left(), Some(60));
        assert!(session.selection().is_empty());
        assert_eq!(session.deck().cards().iter().filter(|c| c.flipped).count(), 0);
    }

    #[test]
    fn test_abandon_cancels_everything() {
        let mut session = level_session(1);
        let pairs = open_pairs(&session);
        session.press_card(pairs[0].0);
        session.press_card(pairs[1].0);
        assert!(session.handle(GameEvent::AbandonRequested));
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(session.pending_timers(), 0);
        assert!(!session.abandon());
        assert!(!session.handle(GameEvent::CardPressed(pairs[2].0)));
    }

    #[test]
    fn test_events_ignored_in_wrong_phase() {
        let mut session = level_session(1);
        assert!(!session.submit_answer(0));
        assert!(!session.advance());
        assert!(!session.select_topic("science"));
        assert!(!session.press_card(999));
    }

    struct ReadOnlyStore;

    impl KvStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), crate::store::StoreError> {
            Err(std::io::Error::other("read-only").into())
        }

        fn remove(&mut self, _key: &str) -> Result<(), crate::store::StoreError> {
            Err(std::io::Error::other("read-only").into())
        }
    }

    #[test]
    fn test_store_failures_do_not_stall_the_game() {
        let mut session = GameSession::with_rng(
            &RouteParams::new(Mode::Level(1)),
            quiet_config(),
            ProgressStore::new(ReadOnlyStore),
            bank(),
            SmallRng::seed_from_u64(11),
        );
        clear_board(&mut session);
        session.select_topic("science");
        answer_all(&mut session, 0);
        assert_eq!(session.phase(), Phase::BossResult);
        assert!(session.last_result().unwrap().passed());
        assert!(session.advance());
        assert_eq!(session.mode(), Mode::Level(2));
    }
}
