//! # Mineclick - Progression Engine for a Chat-Driven Mining Game
//!
//! Mineclick is the transactional core behind an incremental "mining" game played
//! through a chat bot. Players mine for gold, experience and ore, complete rotating
//! daily and weekly quests, unlock achievements, fight shared-health bosses and craft
//! resources into items and timed effects.
//!
//! ## Features
//!
//! - **Atomic Actions**: every click, purchase, attack or craft commits as one sled transaction.
//! - **Boss Encounters**: concurrent attackers, exactly one defeat and one payout per boss life.
//! - **Rotating Quests**: per-day and per-ISO-week quest sets, sampled from templates.
//! - **Achievements**: declarative predicate registry, write-once unlocks.
//! - **Crafting**: resources, consumable effects, boss keys and permanent modifiers.
//! - **Data-Driven Tables**: built-in catalog, exportable to and loadable from JSON.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mineclick::game::{Catalog, Game, GameRules, MineStore};
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = MineStore::open("./data/mine.db")?;
//!     let game = Game::new(store, Arc::new(Catalog::standard()), GameRules::default())?;
//!     let outcome = game.resolve_click(42)?;
//!     println!("+{} gold, crit: {}", outcome.gold, outcome.is_crit);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - Engine: storage, rewards, quests, achievements, bosses, crafting
//! - [`config`] - Configuration management and validation
//! - [`scheduler`] - Periodic boss reset sweep

pub mod config;
pub mod game;
pub mod scheduler;
