//! Gold and resource sinks: upgrades, pickaxes, travel and the resource market.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::game::achievement;
use crate::game::engine::Game;
use crate::game::errors::GameError;
use crate::game::ledger::active_effects;
use crate::game::quest::{self, tags};
use crate::game::reward::tool_power;
use crate::game::storage::{abort, keys};
use crate::game::types::{
    ActiveEffect, CraftedItem, PlayerId, PlayerTotals, QuestView, UnlockedAchievement,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellAmount {
    One,
    All,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpgradePurchase {
    pub upgrade_id: String,
    pub new_level: u32,
    pub price: u64,
    pub gold_left: u64,
    pub completed_quests: Vec<QuestView>,
    pub achievements: Vec<UnlockedAchievement>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolPurchase {
    pub tool_id: String,
    pub price: u64,
    pub gold_left: u64,
    pub achievements: Vec<UnlockedAchievement>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolUpgrade {
    pub tool_id: String,
    pub new_level: u32,
    pub cost: BTreeMap<String, u64>,
    pub achievements: Vec<UnlockedAchievement>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Sale {
    pub resource_id: String,
    pub quantity: u64,
    pub gold: u64,
    pub completed_quests: Vec<QuestView>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Profile {
    pub id: PlayerId,
    pub username: Option<String>,
    pub totals: PlayerTotals,
    pub active_tool: String,
    pub active_tool_level: u32,
    pub tool_power: u32,
    pub tool_power_bonus: u32,
    pub crit_bonus: u32,
    pub current_location: String,
    pub inventory: BTreeMap<String, u64>,
    pub upgrades: BTreeMap<String, u32>,
    pub tools: BTreeMap<String, u32>,
    pub effects: Vec<ActiveEffect>,
    pub items: Vec<CraftedItem>,
    pub quests_completed: u32,
    pub created_at: DateTime<Utc>,
}

impl Game {
    /// Buy one level of a click upgrade. Price is `base * mult^level`.
    pub fn buy_upgrade(&self, id: PlayerId, upgrade_id: &str) -> Result<UpgradePurchase, GameError> {
        let def = self
            .catalog()
            .upgrade(upgrade_id)
            .ok_or_else(|| GameError::NotFound(format!("upgrade: {}", upgrade_id)))?;
        let now = self.now();
        let purchase = self.store().transaction(|tx| {
            let mut player = self.load_or_create_player(tx, id, now)?;
            let key = keys::upgrade(id, upgrade_id);
            let level = tx.get_count(&key)? as u32;
            let price = def.price_at(level);
            if player.gold < price {
                return abort(GameError::InsufficientGold {
                    needed: price,
                    available: player.gold,
                });
            }
            player.gold -= price;
            tx.put_count(&key, level as u64 + 1)?;

            quest::ensure_all_periods(self, tx, &mut player, now)?;
            let completed_quests = quest::apply_progress_all(self, tx, &mut player, tags::UPGRADE, price)?;
            let achievements = achievement::evaluate(self, tx, &mut player, now)?;
            player.touch(now);
            tx.put_player(&player)?;
            Ok(UpgradePurchase {
                upgrade_id: upgrade_id.to_string(),
                new_level: level + 1,
                price,
                gold_left: player.gold,
                completed_quests,
                achievements,
            })
        })?;
        debug!("player {} bought {} level {}", id, upgrade_id, purchase.new_level);
        Ok(purchase)
    }

    pub fn buy_tool(&self, id: PlayerId, tool_id: &str) -> Result<ToolPurchase, GameError> {
        let def = self
            .catalog()
            .tool(tool_id)
            .ok_or_else(|| GameError::NotFound(format!("tool: {}", tool_id)))?;
        let now = self.now();
        let purchase = self.store().transaction(|tx| {
            let mut player = self.load_or_create_player(tx, id, now)?;
            let key = keys::tool(id, tool_id);
            if tx.get_count(&key)? > 0 {
                return abort(GameError::AlreadyOwned(tool_id.to_string()));
            }
            if player.level < def.required_level {
                return abort(GameError::LevelTooLow {
                    required: def.required_level,
                    current: player.level,
                });
            }
            if player.gold < def.price {
                return abort(GameError::InsufficientGold {
                    needed: def.price,
                    available: player.gold,
                });
            }
            player.gold -= def.price;
            tx.put_count(&key, 1)?;
            let achievements = achievement::evaluate(self, tx, &mut player, now)?;
            player.touch(now);
            tx.put_player(&player)?;
            Ok(ToolPurchase {
                tool_id: tool_id.to_string(),
                price: def.price,
                gold_left: player.gold,
                achievements,
            })
        })?;
        info!("player {} bought {}", id, tool_id);
        Ok(purchase)
    }

    /// Spend resources to raise an owned tool one level. Cost scales with the current level.
    pub fn upgrade_tool(&self, id: PlayerId, tool_id: &str) -> Result<ToolUpgrade, GameError> {
        let def = self
            .catalog()
            .tool(tool_id)
            .ok_or_else(|| GameError::NotFound(format!("tool: {}", tool_id)))?;
        let now = self.now();
        self.store().transaction(|tx| {
            let mut player = self.load_or_create_player(tx, id, now)?;
            let key = keys::tool(id, tool_id);
            let level = tx.get_count(&key)? as u32;
            if level == 0 {
                return abort(GameError::ToolNotOwned(tool_id.to_string()));
            }
            let cost = def.upgrade_cost_at(level);
            for (resource, amount) in &cost {
                self.debit_resource(tx, id, resource, *amount)?;
            }
            tx.put_count(&key, level as u64 + 1)?;
            let achievements = achievement::evaluate(self, tx, &mut player, now)?;
            player.touch(now);
            tx.put_player(&player)?;
            Ok(ToolUpgrade {
                tool_id: tool_id.to_string(),
                new_level: level + 1,
                cost,
                achievements,
            })
        })
    }

    pub fn set_active_tool(&self, id: PlayerId, tool_id: &str) -> Result<(), GameError> {
        if self.catalog().tool(tool_id).is_none() {
            return Err(GameError::NotFound(format!("tool: {}", tool_id)));
        }
        let now = self.now();
        self.store().transaction(|tx| {
            let mut player = self.load_or_create_player(tx, id, now)?;
            if tx.get_count(&keys::tool(id, tool_id))? == 0 {
                return abort(GameError::ToolNotOwned(tool_id.to_string()));
            }
            player.active_tool = tool_id.to_string();
            player.touch(now);
            tx.put_player(&player)
        })
    }

    /// Move to another mine. Gated on player level and active tool level.
    pub fn travel(&self, id: PlayerId, location_id: &str) -> Result<(), GameError> {
        let def = self
            .catalog()
            .location(location_id)
            .ok_or_else(|| GameError::NotFound(format!("location: {}", location_id)))?;
        let now = self.now();
        self.store().transaction(|tx| {
            let mut player = self.load_or_create_player(tx, id, now)?;
            if player.level < def.min_level {
                return abort(GameError::LevelTooLow {
                    required: def.min_level,
                    current: player.level,
                });
            }
            let tool_level = self.active_tool_level(tx, &player)?;
            if tool_level < def.min_tool_level {
                return abort(GameError::ToolLevelTooLow {
                    required: def.min_tool_level,
                    current: tool_level,
                });
            }
            player.current_location = location_id.to_string();
            player.touch(now);
            tx.put_player(&player)
        })
    }

    pub fn sell_resource(&self, id: PlayerId, resource_id: &str, amount: SellAmount) -> Result<Sale, GameError> {
        let def = self
            .catalog()
            .resource(resource_id)
            .ok_or_else(|| GameError::NotFound(format!("resource: {}", resource_id)))?;
        let now = self.now();
        self.store().transaction(|tx| {
            let mut player = self.load_or_create_player(tx, id, now)?;
            let held = tx.get_count(&keys::inventory(id, resource_id))?;
            if held == 0 {
                return abort(GameError::InsufficientResource {
                    resource: resource_id.to_string(),
                    needed: 1,
                    available: 0,
                });
            }
            let quantity = match amount {
                SellAmount::One => 1,
                SellAmount::All => held,
            };
            self.debit_resource(tx, id, resource_id, quantity)?;
            let gold = quantity.saturating_mul(def.base_price);
            player.gold = player.gold.saturating_add(gold);

            quest::ensure_all_periods(self, tx, &mut player, now)?;
            let completed_quests = quest::apply_progress_all(self, tx, &mut player, tags::MARKET, gold)?;
            if !completed_quests.is_empty() {
                achievement::evaluate(self, tx, &mut player, now)?;
            }
            player.touch(now);
            tx.put_player(&player)?;
            Ok(Sale {
                resource_id: resource_id.to_string(),
                quantity,
                gold,
                completed_quests,
            })
        })
    }

    /// Everything a profile screen needs, read in one consistent transaction.
    pub fn profile(&self, id: PlayerId) -> Result<Profile, GameError> {
        let now = self.now();
        self.store().transaction(|tx| {
            let Some(player) = tx.get_player(id)? else {
                return abort(GameError::NotFound(format!("player: {}", id)));
            };
            let catalog = self.catalog();
            let mut inventory = BTreeMap::new();
            for resource in &catalog.resources {
                inventory.insert(resource.id.clone(), tx.get_count(&keys::inventory(id, &resource.id))?);
            }
            let mut upgrades = BTreeMap::new();
            for upgrade in &catalog.upgrades {
                upgrades.insert(upgrade.id.clone(), tx.get_count(&keys::upgrade(id, &upgrade.id))? as u32);
            }
            let mut tools = BTreeMap::new();
            for tool in &catalog.tools {
                let level = tx.get_count(&keys::tool(id, &tool.id))? as u32;
                if level > 0 {
                    tools.insert(tool.id.clone(), level);
                }
            }
            let mut items = Vec::new();
            for item_id in catalog.item_ids() {
                if let Some(item) = tx.get::<CraftedItem>(&keys::item(id, item_id))? {
                    items.push(item);
                }
            }
            let active_tool_level = tools.get(&player.active_tool).copied().unwrap_or(0);
            Ok(Profile {
                id,
                username: player.username.clone(),
                totals: player.totals(),
                active_tool: player.active_tool.clone(),
                active_tool_level,
                tool_power: tool_power(
                    catalog.tool(&player.active_tool),
                    active_tool_level,
                    player.tool_power_bonus,
                ),
                tool_power_bonus: player.tool_power_bonus,
                crit_bonus: player.crit_bonus,
                current_location: player.current_location.clone(),
                inventory,
                upgrades,
                tools,
                effects: active_effects(self, tx, id, now)?,
                items,
                quests_completed: player.daily_quests_completed + player.weekly_quests_completed,
                created_at: player.created_at,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::{Catalog, CLICK_POWER};
    use crate::game::rules::GameRules;
    use crate::game::storage::MineStoreBuilder;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn game() -> (TempDir, Game) {
        let dir = TempDir::new().expect("tempdir");
        let store = MineStoreBuilder::new(dir.path()).without_flush().open().expect("store");
        let game = Game::new(store, Arc::new(Catalog::standard()), GameRules::default())
            .expect("game")
            .with_seed(99);
        (dir, game)
    }

    fn give_gold(game: &Game, id: PlayerId, gold: u64) {
        let now = game.now();
        game.store()
            .transaction(|tx| {
                let mut player = game.load_or_create_player(tx, id, now)?;
                player.gold = gold;
                tx.put_player(&player)
            })
            .expect("seed gold");
    }

    #[test]
    fn upgrade_price_doubles_per_level() {
        let (_dir, game) = game();
        give_gold(&game, 1, 150);
        let first = game.buy_upgrade(1, CLICK_POWER).expect("first");
        assert_eq!((first.price, first.new_level, first.gold_left), (50, 1, 100));
        let second = game.buy_upgrade(1, CLICK_POWER).expect("second");
        let quest_gold: u64 = second.completed_quests.iter().map(|q| q.reward_gold).sum();
        assert_eq!((second.price, second.gold_left), (100, quest_gold));
        let err = game.buy_upgrade(1, CLICK_POWER).unwrap_err();
        assert!(matches!(err, GameError::InsufficientGold { needed: 200, .. }));
    }

    #[test]
    fn buying_an_owned_tool_is_a_conflict() {
        let (_dir, game) = game();
        give_gold(&game, 2, 1000);
        let err = game.buy_tool(2, "wooden_pickaxe").unwrap_err();
        assert!(matches!(err, GameError::AlreadyOwned(_)));
        assert_eq!(game.store().get_player(2).unwrap().gold, 1000);
    }

    #[test]
    fn stone_pickaxe_needs_level_three() {
        let (_dir, game) = game();
        give_gold(&game, 3, 1000);
        let err = game.buy_tool(3, "stone_pickaxe").unwrap_err();
        assert!(matches!(err, GameError::LevelTooLow { required: 3, current: 1 }));
    }

    #[test]
    fn travel_respects_level_gate() {
        let (_dir, game) = game();
        game.register_player(4, None).expect("register");
        assert!(matches!(
            game.travel(4, "iron_mine"),
            Err(GameError::LevelTooLow { required: 3, .. })
        ));
        assert!(matches!(game.travel(4, "atlantis"), Err(GameError::NotFound(_))));
        game.travel(4, "coal_mine").expect("stay home");
    }

    #[test]
    fn selling_everything_pays_base_price() {
        let (_dir, game) = game();
        game.register_player(5, None).expect("register");
        game.store()
            .transaction(|tx| tx.put_count(&keys::inventory(5, "iron"), 7))
            .expect("stock");
        let sale = game.sell_resource(5, "iron", SellAmount::All).expect("sell");
        assert_eq!((sale.quantity, sale.gold), (7, 70));
        assert_eq!(game.store().get_player(5).unwrap().gold, 70);
        assert!(game.sell_resource(5, "iron", SellAmount::One).is_err());
    }

    #[test]
    fn profile_reports_starting_kit() {
        let (_dir, game) = game();
        game.register_player(6, Some("pick")).expect("register");
        let profile = game.profile(6).expect("profile");
        assert_eq!(profile.active_tool, "wooden_pickaxe");
        assert_eq!(profile.tool_power, 1);
        assert_eq!(profile.tools.len(), 1);
        assert!(matches!(game.profile(404), Err(GameError::NotFound(_))));
    }
}
