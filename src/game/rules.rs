use serde::{Deserialize, Serialize};

use crate::game::errors::GameError;
use crate::game::types::QuestPeriod;

/// Tunable numbers the engine depends on. Loaded from the `[game]` config section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameRules {
    pub exp_per_level: u64,
    pub base_gold_min: u64,
    pub base_gold_max: u64,
    pub base_exp_min: u64,
    pub base_exp_max: u64,
    pub max_resource_amount: u64,
    pub gold_per_click_power: u64,
    pub crit_percent_per_level: f64,
    /// Drop multiplier step per tool power above 1.
    pub tool_drop_step: f64,
    pub daily_quest_count: usize,
    pub weekly_quest_count: usize,
    pub boss_reset_interval_hours: i64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            exp_per_level: 100,
            base_gold_min: 3,
            base_gold_max: 9,
            base_exp_min: 1,
            base_exp_max: 3,
            max_resource_amount: 2_000_000_000,
            gold_per_click_power: 2,
            crit_percent_per_level: 2.0,
            tool_drop_step: 0.2,
            daily_quest_count: 4,
            weekly_quest_count: 4,
            boss_reset_interval_hours: 6,
        }
    }
}

impl GameRules {
    pub fn quest_count(&self, period: QuestPeriod) -> usize {
        match period {
            QuestPeriod::Daily => self.daily_quest_count,
            QuestPeriod::Weekly => self.weekly_quest_count,
        }
    }

    pub fn validate(&self) -> Result<(), GameError> {
        let bad = |msg: &str| Err(GameError::InvalidAction(format!("game rules: {}", msg)));
        if self.exp_per_level == 0 {
            return bad("exp_per_level must be positive");
        }
        if self.base_gold_min > self.base_gold_max {
            return bad("base gold range is inverted");
        }
        if self.base_exp_min > self.base_exp_max {
            return bad("base exp range is inverted");
        }
        if self.max_resource_amount == 0 {
            return bad("max_resource_amount must be positive");
        }
        if self.crit_percent_per_level < 0.0 || self.tool_drop_step < 0.0 {
            return bad("percentages must not be negative");
        }
        if self.boss_reset_interval_hours <= 0 {
            return bad("boss_reset_interval_hours must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        GameRules::default().validate().expect("defaults validate");
    }

    #[test]
    fn zero_exp_per_level_is_rejected() {
        let rules = GameRules {
            exp_per_level: 0,
            ..GameRules::default()
        };
        assert!(rules.validate().is_err());
    }
}
