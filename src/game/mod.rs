//! Mining progression engine.
//! Sled-backed player state, reward and drop rolls, rotating quests, achievements,
//! boss encounters and crafting. Every public operation on [`Game`] commits as one
//! store transaction.

pub mod achievement;
pub mod boss;
pub mod catalog;
pub mod clock;
pub mod crafting;
pub mod engine;
pub mod errors;
pub mod leaderboard;
pub mod ledger;
pub mod quest;
pub mod reward;
pub mod rules;
pub mod seed_loader;
pub mod shop;
pub mod storage;
pub mod types;

pub use achievement::{registry as achievement_registry, AchievementDef, PlayerSnapshot, Progress};
pub use catalog::{Catalog, CLICK_POWER, CRIT_CHANCE};
pub use clock::Clock;
pub use engine::{Dice, Game};
pub use errors::{ErrorKind, GameError};
pub use leaderboard::{LeaderboardEntry, LeaderboardKind};
pub use quest::tags as quest_tags;
pub use reward::{compute_click_reward, resolve_drop, roll_drop, scale_drop_amount, tool_power};
pub use rules::GameRules;
pub use seed_loader::{load_catalog_from_json, save_catalog_to_json};
pub use shop::{Profile, Sale, SellAmount, ToolPurchase, ToolUpgrade, UpgradePurchase};
pub use storage::{MineStore, MineStoreBuilder};
pub use types::*;
