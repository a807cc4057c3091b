//! Achievement registry and evaluation
//!
//! Every achievement is a pure predicate over a [`PlayerSnapshot`]. Evaluation
//! builds one snapshot, runs each predicate not yet unlocked, and records wins with an
//! idempotent insert so a repeated evaluation never pays twice.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::info;

use crate::game::engine::Game;
use crate::game::errors::GameError;
use crate::game::storage::{keys, TxResult, Txn};
use crate::game::types::{AchievementUnlock, AchievementView, PlayerId, PlayerRecord, UnlockedAchievement};

/// Read-only view of everything predicates may look at.
#[derive(Debug, Clone, Default)]
pub struct PlayerSnapshot {
    pub level: u32,
    pub total_clicks: u64,
    pub total_gold_earned: u64,
    pub total_crits: u64,
    pub max_crit_streak: u32,
    /// Every catalog resource, zero when the player has none.
    pub inventory: BTreeMap<String, u64>,
    pub inventory_total: u64,
    /// Owned tools only.
    pub tools: BTreeMap<String, u32>,
    /// Number of tools in the catalog.
    pub catalog_tool_count: usize,
    pub quests_completed: u64,
    pub max_location_level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub achieved: bool,
    pub current: u64,
    pub target: u64,
}

fn at_least(current: u64, target: u64) -> Progress {
    Progress {
        achieved: current >= target,
        current,
        target,
    }
}

pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub reward_gold: u64,
    pub reward_exp: u64,
    pub check: fn(&PlayerSnapshot) -> Progress,
}

// ============================================================================
// Predicates
// ============================================================================

fn first_click(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_clicks, 1)
}
fn clicks_100(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_clicks, 100)
}
fn clicks_300(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_clicks, 300)
}
fn clicks_500(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_clicks, 500)
}
fn clicks_1000(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_clicks, 1000)
}
fn gold_1000(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_gold_earned, 1000)
}
fn gold_1500(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_gold_earned, 1500)
}
fn gold_5000(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_gold_earned, 5000)
}
fn gold_20000(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_gold_earned, 20000)
}
fn resources_50(s: &PlayerSnapshot) -> Progress {
    at_least(s.inventory_total, 50)
}

fn collector_all(s: &PlayerSnapshot) -> Progress {
    let min = s.inventory.values().copied().min().unwrap_or(0);
    at_least(min, 100)
}

fn crits_50(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_crits, 50)
}
fn crit_master(s: &PlayerSnapshot) -> Progress {
    at_least(s.total_crits, 100)
}
fn crit_streak_5(s: &PlayerSnapshot) -> Progress {
    at_least(s.max_crit_streak as u64, 5)
}

fn smith(s: &PlayerSnapshot) -> Progress {
    let max = s.tools.values().copied().max().unwrap_or(0);
    at_least(max as u64, 5)
}

/// Lowest level across the whole catalog; unowned tools count as 0.
fn lowest_tool_level(s: &PlayerSnapshot) -> u64 {
    if s.tools.len() < s.catalog_tool_count {
        return 0;
    }
    s.tools.values().copied().min().unwrap_or(0) as u64
}

fn tool_master(s: &PlayerSnapshot) -> Progress {
    at_least(lowest_tool_level(s), 3)
}

fn tools_all_purchased(s: &PlayerSnapshot) -> Progress {
    at_least(s.tools.len() as u64, s.catalog_tool_count as u64)
}

fn tools_all_level5(s: &PlayerSnapshot) -> Progress {
    if s.tools.len() < s.catalog_tool_count {
        return Progress {
            achieved: false,
            current: s.tools.len() as u64,
            target: s.catalog_tool_count as u64,
        };
    }
    at_least(lowest_tool_level(s), 5)
}

fn tool_level_sum(s: &PlayerSnapshot) -> u64 {
    s.tools.values().map(|l| *l as u64).sum()
}

fn tools_total_50(s: &PlayerSnapshot) -> Progress {
    at_least(tool_level_sum(s), 50)
}
fn tools_total_100(s: &PlayerSnapshot) -> Progress {
    at_least(tool_level_sum(s), 100)
}
fn hardworker(s: &PlayerSnapshot) -> Progress {
    at_least(s.quests_completed, 50)
}
fn explorer(s: &PlayerSnapshot) -> Progress {
    at_least(s.level as u64, s.max_location_level as u64)
}

macro_rules! achievement {
    ($id:literal, $name:literal, $desc:literal, $check:ident, $gold:literal, $exp:literal) => {
        AchievementDef {
            id: $id,
            name: $name,
            description: $desc,
            reward_gold: $gold,
            reward_exp: $exp,
            check: $check,
        }
    };
}

static REGISTRY: &[AchievementDef] = &[
    achievement!("first_click", "First Steps", "Mine for the first time", first_click, 10, 5),
    achievement!("clicks_100", "Apprentice Miner", "Mine 100 times", clicks_100, 50, 20),
    achievement!("clicks_300", "Workaholic", "Mine 300 times", clicks_300, 80, 35),
    achievement!("clicks_500", "Seasoned Miner", "Mine 500 times", clicks_500, 120, 50),
    achievement!("clicks_1000", "Veteran", "Mine 1000 times", clicks_1000, 200, 100),
    achievement!("gold_1000", "Gold Vein", "Earn 1000 gold", gold_1000, 100, 50),
    achievement!("gold_1500", "Gold Rush", "Earn 1500 gold", gold_1500, 150, 75),
    achievement!("gold_5000", "Gold Magnate", "Earn 5000 gold", gold_5000, 300, 150),
    achievement!("gold_20000", "King of Gold", "Earn 20000 gold", gold_20000, 600, 300),
    achievement!("resources_50", "Collector", "Hold 50 resources in total", resources_50, 70, 35),
    achievement!("collector_all", "Grand Collector", "Hold at least 100 of every resource", collector_all, 400, 200),
    achievement!("crits_50", "Critical Mass", "Land 50 critical hits", crits_50, 80, 30),
    achievement!("crit_master", "Critical Master", "Land 100 critical hits", crit_master, 250, 120),
    achievement!("crit_streak_5", "Lucky Streak", "Land 5 critical hits in a row", crit_streak_5, 60, 25),
    achievement!("smith", "Smith", "Upgrade any tool to level 5", smith, 150, 50),
    achievement!("tool_master", "Tool Master", "Every tool at level 3 or above", tool_master, 350, 180),
    achievement!("tools_all_purchased", "Tool Collector", "Own every pickaxe", tools_all_purchased, 200, 100),
    achievement!("tools_all_level5", "Legendary Smith", "Every tool at level 5", tools_all_level5, 500, 250),
    achievement!("tools_total_50", "Tool Power I", "Total tool level of 50", tools_total_50, 150, 60),
    achievement!("tools_total_100", "Tool Power II", "Total tool level of 100", tools_total_100, 300, 150),
    achievement!("hardworker", "Hard Worker", "Complete 50 quests", hardworker, 200, 100),
    achievement!("explorer", "Explorer", "Reach the level of the deepest location", explorer, 300, 150),
];

pub fn registry() -> &'static [AchievementDef] {
    REGISTRY
}

pub fn find(id: &str) -> Option<&'static AchievementDef> {
    REGISTRY.iter().find(|def| def.id == id)
}

impl AchievementDef {
    fn unlocked(&self) -> UnlockedAchievement {
        UnlockedAchievement {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            reward_gold: self.reward_gold,
            reward_exp: self.reward_exp,
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

pub(crate) fn snapshot(game: &Game, tx: &Txn<'_>, player: &PlayerRecord) -> TxResult<PlayerSnapshot> {
    let catalog = game.catalog();
    let mut inventory = BTreeMap::new();
    for resource in &catalog.resources {
        inventory.insert(resource.id.clone(), tx.get_count(&keys::inventory(player.id, &resource.id))?);
    }
    let mut tools = BTreeMap::new();
    for tool in &catalog.tools {
        let level = tx.get_count(&keys::tool(player.id, &tool.id))?;
        if level > 0 {
            tools.insert(tool.id.clone(), level as u32);
        }
    }
    Ok(PlayerSnapshot {
        level: player.level,
        total_clicks: player.total_clicks,
        total_gold_earned: player.total_gold_earned,
        total_crits: player.total_crits,
        max_crit_streak: player.max_crit_streak,
        inventory_total: inventory.values().fold(0u64, |acc, v| acc.saturating_add(*v)),
        inventory,
        tools,
        catalog_tool_count: catalog.tools.len(),
        quests_completed: player.daily_quests_completed as u64 + player.weekly_quests_completed as u64,
        max_location_level: catalog.max_location_level(),
    })
}

/// Unlock every newly satisfied achievement and credit its reward to `player`.
///
/// Rewards go to the in-memory record; the caller writes it back.
pub(crate) fn evaluate(
    game: &Game,
    tx: &Txn<'_>,
    player: &mut PlayerRecord,
    now: DateTime<Utc>,
) -> TxResult<Vec<UnlockedAchievement>> {
    let snap = snapshot(game, tx, player)?;
    let mut unlocked = Vec::new();
    for def in REGISTRY {
        let key = keys::achievement(player.id, def.id);
        let progress = (def.check)(&snap);
        if !progress.achieved {
            continue;
        }
        let record = AchievementUnlock {
            achievement_id: def.id.to_string(),
            unlocked_at: now,
            progress: progress.current,
            target: progress.target,
        };
        if tx.insert_new(&key, &record)? {
            player.credit(def.reward_gold, def.reward_exp);
            unlocked.push(def.unlocked());
        }
    }
    if !unlocked.is_empty() {
        player.normalize_level(game.rules().exp_per_level);
    }
    Ok(unlocked)
}

impl Game {
    /// Run the registry for one player outside of any other action.
    pub fn evaluate_achievements(&self, id: PlayerId) -> Result<Vec<UnlockedAchievement>, GameError> {
        let now = self.now();
        let unlocked = self.store().transaction(|tx| {
            let mut player = self.load_or_create_player(tx, id, now)?;
            let unlocked = evaluate(self, tx, &mut player, now)?;
            if !unlocked.is_empty() {
                player.touch(now);
                tx.put_player(&player)?;
            }
            Ok(unlocked)
        })?;
        for ach in &unlocked {
            info!("player {} unlocked achievement {}", id, ach.id);
        }
        Ok(unlocked)
    }

    /// Progress against every achievement, unlocked or not. Never writes.
    pub fn achievements_view(&self, id: PlayerId) -> Result<Vec<AchievementView>, GameError> {
        let now = self.now();
        self.store().transaction(|tx| {
            // an unknown player sees the all-locked view; nothing is written
            let player = match tx.get_player(id)? {
                Some(player) => player,
                None => PlayerRecord::new(
                    id,
                    &self.catalog().starting_location,
                    &self.catalog().starting_tool,
                    now,
                ),
            };
            let snap = snapshot(self, tx, &player)?;
            let mut views = Vec::with_capacity(REGISTRY.len());
            for def in REGISTRY {
                let recorded = tx.get::<AchievementUnlock>(&keys::achievement(id, def.id))?;
                let live = (def.check)(&snap);
                let (progress, target) = match &recorded {
                    Some(unlock) => (unlock.progress.max(live.current), unlock.target),
                    None => (live.current, live.target),
                };
                views.push(AchievementView {
                    id: def.id.to_string(),
                    name: def.name.to_string(),
                    description: def.description.to_string(),
                    unlocked: recorded.is_some(),
                    progress,
                    target,
                    reward_gold: def.reward_gold,
                    reward_exp: def.reward_exp,
                });
            }
            Ok(views)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_tools(levels: &[u32], catalog_count: usize) -> PlayerSnapshot {
        PlayerSnapshot {
            tools: levels
                .iter()
                .enumerate()
                .map(|(i, l)| (format!("tool_{}", i), *l))
                .collect(),
            catalog_tool_count: catalog_count,
            ..PlayerSnapshot::default()
        }
    }

    #[test]
    fn registry_ids_are_unique() {
        let mut ids: Vec<_> = registry().iter().map(|d| d.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 22);
    }

    #[test]
    fn tool_predicates_need_full_collection() {
        let partial = snapshot_with_tools(&[5, 5], 3);
        assert!((find("smith").unwrap().check)(&partial).achieved);
        assert!(!(find("tool_master").unwrap().check)(&partial).achieved);
        let all_five = (find("tools_all_level5").unwrap().check)(&partial);
        assert_eq!((all_five.current, all_five.target), (2, 3));

        let full = snapshot_with_tools(&[5, 6, 5], 3);
        assert!((find("tools_all_level5").unwrap().check)(&full).achieved);
        assert!((find("tools_all_purchased").unwrap().check)(&full).achieved);
    }

    #[test]
    fn collector_all_tracks_scarcest_resource() {
        let mut snap = PlayerSnapshot::default();
        snap.inventory.insert("coal".into(), 500);
        snap.inventory.insert("mithril".into(), 40);
        let p = (find("collector_all").unwrap().check)(&snap);
        assert_eq!((p.achieved, p.current), (false, 40));
    }

    #[test]
    fn explorer_targets_deepest_location() {
        let snap = PlayerSnapshot {
            level: 20,
            max_location_level: 20,
            ..PlayerSnapshot::default()
        };
        assert!((find("explorer").unwrap().check)(&snap).achieved);
    }
}
