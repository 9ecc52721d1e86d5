use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::Rng;
use rust_embed::Embed;
use serde::{Deserialize, Serialize};

use crate::generator::fisher_yates;

#[derive(Embed)]
#[folder = "assets/quiz/"]
struct QuizAssets;

pub const MIXED_TOPIC: &str = "mixed";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl QuizQuestion {
    pub fn is_well_formed(&self) -> bool {
        self.options.len() >= 2 && self.correct_index < self.options.len()
    }

    /// `None` (timeout) and out-of-range indices are both wrong answers.
    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct_index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizTopic {
    Named(String),
    Mixed,
}

impl QuizTopic {
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case(MIXED_TOPIC) {
            QuizTopic::Mixed
        } else {
            QuizTopic::Named(name.to_lowercase())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            QuizTopic::Named(name) => name,
            QuizTopic::Mixed => MIXED_TOPIC,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct QuizBank {
    topics: BTreeMap<String, Vec<QuizQuestion>>,
}

impl QuizBank {
    /// Topic packs compiled into the binary.
    pub fn bundled() -> Self {
        let mut topics = BTreeMap::new();
        for file in QuizAssets::iter() {
            let Some(topic) = file.strip_suffix(".json") else {
                continue;
            };
            let Some(asset) = QuizAssets::get(&file) else {
                continue;
            };
            match std::str::from_utf8(asset.data.as_ref()).map(Self::parse_pack) {
                Ok(Ok(questions)) => {
                    topics.insert(topic.to_lowercase(), questions);
                }
                _ => log::warn!("skipping unreadable bundled quiz pack {file}"),
            }
        }
        Self::from_topics(topics)
    }

    /// Bundled packs, overridden or extended by `<topic>.json` files in `user_dir`.
    pub fn load(user_dir: Option<&Path>) -> Self {
        let mut bank = Self::bundled();
        let Some(dir) = user_dir else {
            return bank;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return bank;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(topic) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|content| Self::parse_pack(&content).map_err(|e| e.to_string()));
            match parsed {
                Ok(questions) => bank.insert_topic(topic, questions),
                Err(e) => log::warn!("skipping quiz pack {}: {e}", path.display()),
            }
        }
        bank
    }

    pub fn from_topics(topics: BTreeMap<String, Vec<QuizQuestion>>) -> Self {
        let mut bank = Self::default();
        for (topic, questions) in topics {
            bank.insert_topic(&topic, questions);
        }
        bank
    }

    pub fn parse_pack(json: &str) -> serde_json::Result<Vec<QuizQuestion>> {
        serde_json::from_str(json)
    }

    fn insert_topic(&mut self, topic: &str, questions: Vec<QuizQuestion>) {
        let topic = topic.trim().to_lowercase();
        if topic.is_empty() || topic == MIXED_TOPIC {
            log::warn!("quiz topic name {topic:?} is reserved");
            return;
        }
        let total = questions.len();
        let questions: Vec<QuizQuestion> =
            questions.into_iter().filter(QuizQuestion::is_well_formed).collect();
        if questions.len() < total {
            log::warn!(
                "dropped {} malformed question(s) from topic {topic}",
                total - questions.len()
            );
        }
        if questions.is_empty() {
            return;
        }
        self.topics.insert(topic, questions);
    }

    pub fn topics(&self) -> Vec<&str> {
        self.topics.keys().map(String::as_str).collect()
    }

    pub fn has_topic(&self, topic: &QuizTopic) -> bool {
        self.topic_len(topic) > 0
    }

    pub fn topic_len(&self, topic: &QuizTopic) -> usize {
        match topic {
            QuizTopic::Named(name) => self.topics.get(name).map_or(0, Vec::len),
            QuizTopic::Mixed => self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.topics.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Every question of every topic, in topic order.
    pub fn all_questions(&self) -> Vec<&QuizQuestion> {
        self.topics.values().flatten().collect()
    }

    fn pool(&self, topic: &QuizTopic) -> Vec<QuizQuestion> {
        match topic {
            QuizTopic::Named(name) => self.topics.get(name).cloned().unwrap_or_default(),
            QuizTopic::Mixed => self.all_questions().into_iter().cloned().collect(),
        }
    }

    /// Shuffled copy of the topic's questions, truncated to `count`.
    pub fn questions_for_topic<R: Rng + ?Sized>(
        &self,
        topic: &QuizTopic,
        count: usize,
        rng: &mut R,
    ) -> Vec<QuizQuestion> {
        let mut pool = self.pool(topic);
        fisher_yates(&mut pool, rng);
        pool.truncate(count);
        pool
    }

    /// The whole bank, shuffled.
    pub fn full_test<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<QuizQuestion> {
        self.questions_for_topic(&QuizTopic::Mixed, usize::MAX, rng)
    }

    pub fn random_question<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<QuizQuestion> {
        let all = self.all_questions();
        if all.is_empty() {
            return None;
        }
        Some(all[rng.gen_range(0..all.len())].clone())
    }
}
