use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

pub const PLAYER_SCHEMA_VERSION: u8 = 1;

/// Stable id handed to us by the chat platform.
pub type PlayerId = i64;

// ============================================================================
// Persisted records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub username: Option<String>,
    pub level: u32,
    /// Always below `exp_per_level` once an operation commits.
    pub exp: u64,
    pub gold: u64,
    pub total_clicks: u64,
    pub total_gold_earned: u64,
    pub total_crits: u64,
    pub current_crit_streak: u32,
    pub max_crit_streak: u32,
    /// Permanent modifiers granted by crafted upgrades
    pub tool_power_bonus: u32,
    pub crit_bonus: u32,
    pub active_tool: String,
    pub current_location: String,
    pub last_daily_key: Option<String>,
    pub last_weekly_key: Option<String>,
    pub daily_quests_completed: u32,
    pub weekly_quests_completed: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(id: PlayerId, starting_location: &str, starting_tool: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: None,
            level: 1,
            exp: 0,
            gold: 0,
            total_clicks: 0,
            total_gold_earned: 0,
            total_crits: 0,
            current_crit_streak: 0,
            max_crit_streak: 0,
            tool_power_bonus: 0,
            crit_bonus: 0,
            active_tool: starting_tool.to_string(),
            current_location: starting_location.to_string(),
            last_daily_key: None,
            last_weekly_key: None,
            daily_quests_completed: 0,
            weekly_quests_completed: 0,
            created_at: now,
            updated_at: now,
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Credit gold and exp without touching lifetime counters (quest/achievement/boss payouts).
    pub fn credit(&mut self, gold: u64, exp: u64) {
        self.gold = self.gold.saturating_add(gold);
        self.exp = self.exp.saturating_add(exp);
    }

    /// Roll surplus exp over into levels until `exp < exp_per_level`.
    pub fn normalize_level(&mut self, exp_per_level: u64) {
        if exp_per_level == 0 {
            return;
        }
        while self.exp >= exp_per_level {
            self.level += 1;
            self.exp -= exp_per_level;
        }
    }

    pub fn last_period_key(&self, period: QuestPeriod) -> Option<&str> {
        match period {
            QuestPeriod::Daily => self.last_daily_key.as_deref(),
            QuestPeriod::Weekly => self.last_weekly_key.as_deref(),
        }
    }

    pub fn set_last_period_key(&mut self, period: QuestPeriod, key: String) {
        match period {
            QuestPeriod::Daily => self.last_daily_key = Some(key),
            QuestPeriod::Weekly => self.last_weekly_key = Some(key),
        }
    }

    pub fn record_quest_completion(&mut self, period: QuestPeriod) {
        match period {
            QuestPeriod::Daily => self.daily_quests_completed += 1,
            QuestPeriod::Weekly => self.weekly_quests_completed += 1,
        }
    }

    pub fn totals(&self) -> PlayerTotals {
        PlayerTotals {
            level: self.level,
            exp: self.exp,
            gold: self.gold,
            total_clicks: self.total_clicks,
            total_gold_earned: self.total_gold_earned,
            total_crits: self.total_crits,
            current_crit_streak: self.current_crit_streak,
            max_crit_streak: self.max_crit_streak,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestPeriod {
    Daily,
    Weekly,
}

impl QuestPeriod {
    pub const ALL: [QuestPeriod; 2] = [QuestPeriod::Daily, QuestPeriod::Weekly];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestPeriod::Daily => "daily",
            QuestPeriod::Weekly => "weekly",
        }
    }

    /// Calendar day (`2026-10-19`) or ISO week (`2026-43`) containing `now`.
    pub fn key_for(&self, now: DateTime<Utc>) -> String {
        match self {
            QuestPeriod::Daily => now.date_naive().format("%Y-%m-%d").to_string(),
            QuestPeriod::Weekly => {
                let week = now.iso_week();
                format!("{}-{:02}", week.year(), week.week())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestInstance {
    pub slot: u8,
    pub period: QuestPeriod,
    pub period_key: String,
    pub name: String,
    pub description: String,
    pub goal: u64,
    pub progress: u64,
    pub completed: bool,
    pub reward_gold: u64,
    pub reward_exp: u64,
}

impl QuestInstance {
    pub fn view(&self) -> QuestView {
        QuestView {
            slot: self.slot,
            name: self.name.clone(),
            description: self.description.clone(),
            goal: self.goal,
            progress: self.progress,
            completed: self.completed,
            reward_gold: self.reward_gold,
            reward_exp: self.reward_exp,
        }
    }
}

/// Write-once record of an unlocked achievement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AchievementUnlock {
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
    pub progress: u64,
    pub target: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BossProgress {
    pub boss_id: String,
    pub current_health: u64,
    pub max_health: u64,
    pub defeated: bool,
    pub last_attempt: Option<DateTime<Utc>>,
    pub defeated_at: Option<DateTime<Utc>>,
}

impl BossProgress {
    pub fn fresh(boss_id: &str, max_health: u64) -> Self {
        Self {
            boss_id: boss_id.to_string(),
            current_health: max_health,
            max_health,
            defeated: false,
            last_attempt: None,
            defeated_at: None,
        }
    }

    pub fn reset(&mut self, max_health: u64) {
        self.max_health = max_health;
        self.current_health = max_health;
        self.defeated = false;
        self.defeated_at = None;
    }
}

/// Payload of a timed effect. Stored with bincode, so keep it externally tagged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Multiplies click exp; several boosts multiply together.
    ExpBoost { multiplier: f64 },
    /// Adds percentage points to the crit chance.
    CritBoost { percent: f64 },
    /// Independent second roll that can only promote a non-crit to a crit.
    Luck { percent: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveEffect {
    pub effect_id: String,
    pub kind: EffectKind,
    pub expires_at: DateTime<Utc>,
}

impl ActiveEffect {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CraftedItem {
    pub item_id: String,
    pub quantity: u32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CraftedItem {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

// ============================================================================
// Operation results handed to adapters
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlayerTotals {
    pub level: u32,
    pub exp: u64,
    pub gold: u64,
    pub total_clicks: u64,
    pub total_gold_earned: u64,
    pub total_crits: u64,
    pub current_crit_streak: u32,
    pub max_crit_streak: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuestView {
    pub slot: u8,
    pub name: String,
    pub description: String,
    pub goal: u64,
    pub progress: u64,
    pub completed: bool,
    pub reward_gold: u64,
    pub reward_exp: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnlockedAchievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub reward_gold: u64,
    pub reward_exp: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AchievementView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub unlocked: bool,
    pub progress: u64,
    pub target: u64,
    pub reward_gold: u64,
    pub reward_exp: u64,
}

impl AchievementView {
    pub fn percent(&self) -> u8 {
        if self.unlocked || self.target == 0 {
            return 100;
        }
        ((self.progress.min(self.target) * 100) / self.target) as u8
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResourceDrop {
    pub resource_id: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClickOutcome {
    pub gold: u64,
    pub exp: u64,
    pub is_crit: bool,
    /// Crit came from a luck effect rather than the base roll.
    pub lucky: bool,
    pub resource: Option<String>,
    pub amount: u64,
    /// Amount actually stored after the cap was applied.
    pub stored: u64,
    pub totals: PlayerTotals,
    pub completed_quests: Vec<QuestView>,
    pub achievements: Vec<UnlockedAchievement>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttackOutcome {
    pub boss_id: String,
    pub damage: u64,
    pub is_crit: bool,
    /// True only for the attack that took the boss from alive to defeated.
    pub defeated: bool,
    pub current_health: u64,
    pub max_health: u64,
    pub reward_gold: u64,
    pub reward_exp: u64,
    pub loot: Vec<ResourceDrop>,
    pub achievements: Vec<UnlockedAchievement>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CraftedResult {
    Resource { resource_id: String, amount: u64, stored: u64 },
    Effect { effect_id: String, expires_at: DateTime<Utc> },
    Item { item_id: String, quantity: u32 },
    Permanent { modifier: String, new_value: u32 },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CraftOutcome {
    pub success: bool,
    pub recipe_id: String,
    pub result: CraftedResult,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UseOutcome {
    pub success: bool,
    pub item_id: String,
    pub boss_id: String,
    pub remaining: u32,
    pub message: String,
}
