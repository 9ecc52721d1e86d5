use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::engine::scoring;

pub const MAX_LEVEL: u32 = 10;

/// Route sentinels understood by the level-select screen.
pub const ENDLESS_ROUTE_LEVEL: u32 = 9999;
pub const KNOWLEDGE_TEST_ROUTE_LEVEL: u32 = 8888;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Level(u32),
    Endless,
    KnowledgeTest,
}

impl Mode {
    /// Translate a navigation `level` parameter. Unknown numbers clamp into
    /// the playable level range instead of failing.
    pub fn from_route_level(level: u32) -> Self {
        match level {
            ENDLESS_ROUTE_LEVEL => Mode::Endless,
            KNOWLEDGE_TEST_ROUTE_LEVEL => Mode::KnowledgeTest,
            n => Mode::Level(n.clamp(1, MAX_LEVEL)),
        }
    }

    pub fn route_level(self) -> u32 {
        match self {
            Mode::Level(n) => n,
            Mode::Endless => ENDLESS_ROUTE_LEVEL,
            Mode::KnowledgeTest => KNOWLEDGE_TEST_ROUTE_LEVEL,
        }
    }

    pub fn level(self) -> Option<u32> {
        match self {
            Mode::Level(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Level(_) => "level",
            Mode::Endless => "endless",
            Mode::KnowledgeTest => "knowledge-test",
        }
    }
}

/// Parameters carried by a navigation request into the game screen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteParams {
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl RouteParams {
    pub fn new(mode: Mode) -> Self {
        Self {
            level: mode.route_level(),
            topic: None,
        }
    }

    pub fn with_topic(mut self, topic: &str) -> Self {
        self.topic = Some(topic.to_string());
        self
    }

    pub fn mode(&self) -> Mode {
        Mode::from_route_level(self.level)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub id: u32,
    pub rows: u32,
    pub cols: u32,
    pub time_seconds: u32,
}

/// Grid layout per level, sized to the pair count the deck builder produces.
const LEVEL_LAYOUTS: [(u32, u32, u32); MAX_LEVEL as usize] = [
    (1, 2, 4),
    (2, 2, 5),
    (3, 3, 4),
    (4, 2, 7),
    (5, 4, 4),
    (6, 4, 4),
    (7, 4, 4),
    (8, 4, 4),
    (9, 4, 4),
    (10, 4, 4),
];

pub fn level_config(id: u32, config: &Config) -> Option<LevelConfig> {
    LEVEL_LAYOUTS
        .iter()
        .find(|(level, _, _)| *level == id)
        .map(|&(id, rows, cols)| LevelConfig {
            id,
            rows,
            cols,
            time_seconds: scoring::level_time_secs(id, config),
        })
}

pub fn all_levels(config: &Config) -> Vec<LevelConfig> {
    (1..=MAX_LEVEL)
        .filter_map(|id| level_config(id, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_sentinels_map_to_modes() {
        assert_eq!(Mode::from_route_level(9999), Mode::Endless);
        assert_eq!(Mode::from_route_level(8888), Mode::KnowledgeTest);
        assert_eq!(Mode::from_route_level(4), Mode::Level(4));
    }

    #[test]
    fn test_out_of_range_route_level_clamps() {
        assert_eq!(Mode::from_route_level(0), Mode::Level(1));
        assert_eq!(Mode::from_route_level(42), Mode::Level(MAX_LEVEL));
    }

    #[test]
    fn test_route_params_round_trip_through_mode() {
        for mode in [Mode::Level(3), Mode::Endless, Mode::KnowledgeTest] {
            assert_eq!(RouteParams::new(mode).mode(), mode);
        }
        let params = RouteParams::new(Mode::Level(2)).with_topic("science");
        assert_eq!(params.topic.as_deref(), Some("science"));
    }

    #[test]
    fn test_level_table_matches_time_formula() {
        let config = Config::default();
        let levels = all_levels(&config);
        assert_eq!(levels.len(), MAX_LEVEL as usize);
        assert_eq!(levels[0].time_seconds, 60);
        assert_eq!(levels[2].time_seconds, 80);
        assert!(level_config(11, &config).is_none());
    }

    #[test]
    fn test_layouts_hold_every_card() {
        let config = Config::default();
        for level in all_levels(&config) {
            let pairs = crate::engine::symbol_unlock::pair_count(Mode::Level(level.id));
            assert_eq!((level.rows * level.cols) as usize, pairs * 2, "level {}", level.id);
        }
    }
}
