//! Test utilities & fixtures.
//! Builds a seeded engine on a temp-dir store with a frozen clock, plus a catalog
//! carrying a small low-level boss so encounters can be exercised without grinding.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use mineclick::game::catalog::{BossDef, QuestTemplate, RecipeDef, RecipeOutput, ResourceRange};
use mineclick::game::storage::keys;
use mineclick::game::{Catalog, Clock, Game, GameRules, MineStoreBuilder, PlayerId};
use tempfile::TempDir;

pub const GOLEM: &str = "test_golem";
pub const GOLEM_HEALTH: u64 = 100;
pub const GOLEM_SIGIL: &str = "golem_sigil";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap()
}

/// Standard tables plus a level-1 boss and a one-hour key for it.
pub fn test_catalog() -> Catalog {
    let mut catalog = Catalog::standard();
    catalog.bosses.push(BossDef {
        id: GOLEM.into(),
        name: "Test Golem".into(),
        description: "A pile of rocks that fights back.".into(),
        min_level: 1,
        min_tool_level: 1,
        health: GOLEM_HEALTH,
        reward_gold: 250,
        reward_exp: 40,
        reward_resources: vec![ResourceRange {
            resource_id: "coal".into(),
            min: 1,
            max: 1,
        }],
    });
    catalog.recipes.push(RecipeDef {
        id: GOLEM_SIGIL.into(),
        name: "Golem Sigil".into(),
        costs: [("coal".to_string(), 5u64)].into_iter().collect(),
        output: RecipeOutput::Key {
            item_id: GOLEM_SIGIL.into(),
            boss_id: GOLEM.into(),
            lifetime_hours: Some(1),
        },
    });
    catalog
}

/// Catalog whose daily set is a single fixed-goal clicks quest.
pub fn single_quest_catalog(goal: u64) -> Catalog {
    let mut catalog = test_catalog();
    catalog.daily_quests = vec![QuestTemplate {
        name: "Clicks Warmup".into(),
        description: "Mine {} times".into(),
        goal_min: goal,
        goal_max: goal,
        reward_gold: 40,
        reward_exp: 15,
    }];
    catalog
}

pub fn game_with(catalog: Catalog, rules: GameRules, seed: u64) -> (TempDir, Game) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = MineStoreBuilder::new(dir.path())
        .without_flush()
        .open()
        .expect("open store");
    let game = Game::new(store, Arc::new(catalog), rules)
        .expect("game")
        .with_seed(seed)
        .with_clock(Clock::fixed(start_time()));
    (dir, game)
}

pub fn game() -> (TempDir, Game) {
    game_with(test_catalog(), GameRules::default(), 99)
}

/// Overwrite inventory counts, creating the player first.
pub fn stock(game: &Game, id: PlayerId, items: &[(&str, u64)]) {
    game.register_player(id, None).expect("register");
    game.store()
        .transaction(|tx| {
            for (resource, amount) in items {
                tx.put_count(&keys::inventory(id, resource), *amount)?;
            }
            Ok(())
        })
        .expect("stock");
}

pub fn inventory(game: &Game, id: PlayerId, resource: &str) -> u64 {
    game.store()
        .get_count(&keys::inventory(id, resource))
        .expect("inventory")
}

pub fn set_gold(game: &Game, id: PlayerId, gold: u64) {
    game.register_player(id, None).expect("register");
    game.store()
        .transaction(|tx| {
            if let Some(mut player) = tx.get_player(id)? {
                player.gold = gold;
                tx.put_player(&player)?;
            }
            Ok(())
        })
        .expect("set gold");
}
