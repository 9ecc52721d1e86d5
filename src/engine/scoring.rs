use crate::config::Config;

pub fn level_time_secs(level: u32, config: &Config) -> u32 {
    config.base_time_secs + level.saturating_sub(1) * config.time_increase_per_level_secs
}

/// Mid-match reshuffle period; shrinks with level down to the configured floor.
pub fn reshuffle_interval_secs(level: u32, config: &Config) -> u32 {
    config
        .reshuffle_base_secs
        .saturating_sub(level.saturating_sub(1) * config.reshuffle_step_secs)
        .max(config.reshuffle_min_secs)
}

pub fn boss_question_count(level: u32, config: &Config) -> usize {
    (config.boss_base_questions + level.saturating_sub(1) as usize).min(config.boss_max_questions)
}

pub fn quiz_passed(correct: usize, total: usize, pass_ratio: f64) -> bool {
    if total == 0 {
        return false;
    }
    correct as f64 / total as f64 >= pass_ratio
}

/// Interstitial outcome: bonus on a correct answer, penalty floored at zero otherwise.
pub fn apply_interstitial_result(time_left: u32, correct: bool, bonus_secs: u32) -> u32 {
    if correct {
        time_left.saturating_add(bonus_secs)
    } else {
        time_left.saturating_sub(bonus_secs)
    }
}
