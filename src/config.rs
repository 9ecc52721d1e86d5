use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_mismatch_delay_ms")]
    pub mismatch_delay_ms: u64,
    #[serde(default = "default_base_time_secs")]
    pub base_time_secs: u32,
    #[serde(default = "default_time_increase_per_level_secs")]
    pub time_increase_per_level_secs: u32,
    #[serde(default = "default_reshuffle_enabled")]
    pub reshuffle_enabled: bool,
    #[serde(default = "default_reshuffle_base_secs")]
    pub reshuffle_base_secs: u32,
    #[serde(default = "default_reshuffle_step_secs")]
    pub reshuffle_step_secs: u32,
    #[serde(default = "default_reshuffle_min_secs")]
    pub reshuffle_min_secs: u32,
    #[serde(default = "default_interstitial_enabled")]
    pub interstitial_enabled: bool,
    #[serde(default = "default_interstitial_trigger_secs")]
    pub interstitial_trigger_secs: u32,
    #[serde(default = "default_interstitial_time_secs")]
    pub interstitial_time_secs: u32,
    #[serde(default = "default_interstitial_bonus_secs")]
    pub interstitial_bonus_secs: u32,
    #[serde(default = "default_boss_question_secs")]
    pub boss_question_secs: u32,
    #[serde(default = "default_knowledge_question_secs")]
    pub knowledge_question_secs: u32,
    #[serde(default = "default_boss_base_questions")]
    pub boss_base_questions: usize,
    #[serde(default = "default_boss_max_questions")]
    pub boss_max_questions: usize,
    #[serde(default = "default_pass_ratio")]
    pub pass_ratio: f64,
    #[serde(default = "default_boss_retries")]
    pub boss_retries: u32,
    #[serde(default = "default_endless_match_reward")]
    pub endless_match_reward: u32,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_mismatch_delay_ms() -> u64 {
    800
}
fn default_base_time_secs() -> u32 {
    60
}
fn default_time_increase_per_level_secs() -> u32 {
    10
}
fn default_reshuffle_enabled() -> bool {
    true
}
fn default_reshuffle_base_secs() -> u32 {
    20
}
fn default_reshuffle_step_secs() -> u32 {
    2
}
fn default_reshuffle_min_secs() -> u32 {
    8
}
fn default_interstitial_enabled() -> bool {
    true
}
fn default_interstitial_trigger_secs() -> u32 {
    11
}
fn default_interstitial_time_secs() -> u32 {
    15
}
fn default_interstitial_bonus_secs() -> u32 {
    10
}
fn default_boss_question_secs() -> u32 {
    10
}
fn default_knowledge_question_secs() -> u32 {
    15
}
fn default_boss_base_questions() -> usize {
    10
}
fn default_boss_max_questions() -> usize {
    20
}
fn default_pass_ratio() -> f64 {
    0.8
}
fn default_boss_retries() -> u32 {
    3
}
fn default_endless_match_reward() -> u32 {
    10
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fliprush")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mismatch_delay_ms: default_mismatch_delay_ms(),
            base_time_secs: default_base_time_secs(),
            time_increase_per_level_secs: default_time_increase_per_level_secs(),
            reshuffle_enabled: default_reshuffle_enabled(),
            reshuffle_base_secs: default_reshuffle_base_secs(),
            reshuffle_step_secs: default_reshuffle_step_secs(),
            reshuffle_min_secs: default_reshuffle_min_secs(),
            interstitial_enabled: default_interstitial_enabled(),
            interstitial_trigger_secs: default_interstitial_trigger_secs(),
            interstitial_time_secs: default_interstitial_time_secs(),
            interstitial_bonus_secs: default_interstitial_bonus_secs(),
            boss_question_secs: default_boss_question_secs(),
            knowledge_question_secs: default_knowledge_question_secs(),
            boss_base_questions: default_boss_base_questions(),
            boss_max_questions: default_boss_max_questions(),
            pass_ratio: default_pass_ratio(),
            boss_retries: default_boss_retries(),
            endless_match_reward: default_endless_match_reward(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fliprush")
            .join("config.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Clamp values a hand-edited config file could push out of a playable range.
    pub fn validate(&mut self) {
        self.mismatch_delay_ms = self.mismatch_delay_ms.clamp(100, 5_000);
        self.base_time_secs = self.base_time_secs.clamp(10, 600);
        self.time_increase_per_level_secs = self.time_increase_per_level_secs.min(120);
        self.reshuffle_min_secs = self.reshuffle_min_secs.max(1);
        self.reshuffle_base_secs = self.reshuffle_base_secs.max(self.reshuffle_min_secs);
        self.interstitial_time_secs = self.interstitial_time_secs.max(1);
        self.boss_question_secs = self.boss_question_secs.max(1);
        self.knowledge_question_secs = self.knowledge_question_secs.max(1);
        self.boss_base_questions = self.boss_base_questions.max(1);
        self.boss_max_questions = self.boss_max_questions.max(self.boss_base_questions);
        if !self.pass_ratio.is_finite() {
            self.pass_ratio = default_pass_ratio();
        }
        self.pass_ratio = self.pass_ratio.clamp(0.0, 1.0);
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.mismatch_delay_ms, 800);
        assert_eq!(config.interstitial_trigger_secs, 11);
        assert_eq!(config.boss_retries, 3);
        assert!(config.reshuffle_enabled);
        assert!(!config.data_dir.is_empty());
        assert!(config.data_dir.contains("fliprush"));
    }

    #[test]
    fn test_config_serde_partial_file_keeps_other_defaults() {
        let toml_str = r#"
base_time_secs = 90
reshuffle_enabled = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.base_time_secs, 90);
        assert!(!config.reshuffle_enabled);
        assert_eq!(config.time_increase_per_level_secs, 10);
        assert_eq!(config.endless_match_reward, 10);
        assert!((config.pass_ratio - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.boss_question_secs, deserialized.boss_question_secs);
        assert_eq!(config.knowledge_question_secs, deserialized.knowledge_question_secs);
        assert_eq!(config.data_dir, deserialized.data_dir);
    }

    #[test]
    fn test_config_validate_clamps_values() {
        let mut config = Config::default();
        config.mismatch_delay_ms = 0;
        config.pass_ratio = 3.5;
        config.reshuffle_min_secs = 0;
        config.reshuffle_base_secs = 0;
        config.boss_base_questions = 0;
        config.boss_max_questions = 0;
        config.data_dir = "  ".to_string();
        config.validate();

        assert_eq!(config.mismatch_delay_ms, 100);
        assert!((config.pass_ratio - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.reshuffle_min_secs, 1);
        assert_eq!(config.reshuffle_base_secs, 1);
        assert_eq!(config.boss_base_questions, 1);
        assert_eq!(config.boss_max_questions, 1);
        assert!(config.data_dir.contains("fliprush"));
    }

    #[test]
    fn test_config_validate_replaces_nan_ratio() {
        let mut config = Config::default();
        config.pass_ratio = f64::NAN;
        config.validate();
        assert!((config.pass_ratio - 0.8).abs() < f64::EPSILON);
    }
}
