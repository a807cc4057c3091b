//! Crafting: turn resource bundles into resources, timed effects, boss keys or
//! permanent modifiers.

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};

use crate::game::catalog::{PermanentModifier, RecipeDef, RecipeOutput};
use crate::game::engine::Game;
use crate::game::errors::GameError;
use crate::game::storage::{abort, keys, TxResult, Txn};
use crate::game::types::{
    ActiveEffect, BossProgress, CraftOutcome, CraftedItem, CraftedResult, PlayerId, UseOutcome,
};

fn check_costs(tx: &Txn<'_>, id: PlayerId, recipe: &RecipeDef) -> TxResult<()> {
    for (resource, needed) in &recipe.costs {
        let available = tx.get_count(&keys::inventory(id, resource))?;
        if available < *needed {
            return abort(GameError::InsufficientResource {
                resource: resource.clone(),
                needed: *needed,
                available,
            });
        }
    }
    Ok(())
}

fn craft_tx(game: &Game, tx: &Txn<'_>, id: PlayerId, recipe: &RecipeDef, now: DateTime<Utc>) -> TxResult<CraftOutcome> {
    let mut player = game.load_or_create_player(tx, id, now)?;
    check_costs(tx, id, recipe)?;
    for (resource, amount) in &recipe.costs {
        game.debit_resource(tx, id, resource, *amount)?;
    }

    let (result, description) = match &recipe.output {
        RecipeOutput::Resource { resource_id, amount } => {
            let stored = game.credit_resource(tx, id, resource_id, *amount)?;
            (
                CraftedResult::Resource {
                    resource_id: resource_id.clone(),
                    amount: *amount,
                    stored,
                },
                format!("Crafted {} x{}", resource_id, amount),
            )
        }
        RecipeOutput::Consumable {
            effect_id,
            effect,
            duration_minutes,
        } => {
            let expires_at = now + Duration::minutes(*duration_minutes as i64);
            // replaces any running copy: the timer restarts, magnitudes never stack
            let active = ActiveEffect {
                effect_id: effect_id.clone(),
                kind: *effect,
                expires_at,
            };
            tx.put(&keys::effect(id, effect_id), &active)?;
            (
                CraftedResult::Effect {
                    effect_id: effect_id.clone(),
                    expires_at,
                },
                format!("{} active for {} minutes", recipe.name, duration_minutes),
            )
        }
        RecipeOutput::Key {
            item_id,
            lifetime_hours,
            ..
        } => {
            let key = keys::item(id, item_id);
            let mut item = tx.get::<CraftedItem>(&key)?.unwrap_or(CraftedItem {
                item_id: item_id.clone(),
                quantity: 0,
                expires_at: None,
            });
            if item.is_expired(now) {
                item.quantity = 0;
            }
            item.quantity += 1;
            item.expires_at = lifetime_hours.map(|h| now + Duration::hours(h as i64));
            tx.put(&key, &item)?;
            (
                CraftedResult::Item {
                    item_id: item_id.clone(),
                    quantity: item.quantity,
                },
                format!("{} added to your bag ({} held)", recipe.name, item.quantity),
            )
        }
        RecipeOutput::Permanent { modifier, amount } => {
            let field = match modifier {
                PermanentModifier::ToolPower => &mut player.tool_power_bonus,
                PermanentModifier::CritChance => &mut player.crit_bonus,
            };
            *field += amount;
            let new_value = *field;
            (
                CraftedResult::Permanent {
                    modifier: modifier.as_str().to_string(),
                    new_value,
                },
                format!("{} raised to {}", modifier.as_str(), new_value),
            )
        }
    };

    player.touch(now);
    tx.put_player(&player)?;
    Ok(CraftOutcome {
        success: true,
        recipe_id: recipe.id.clone(),
        result,
        description,
    })
}

enum UseAttempt {
    Used(UseOutcome),
    /// The row was past its expiry and has been removed.
    Expired,
}

fn use_item_tx(
    game: &Game,
    tx: &Txn<'_>,
    id: PlayerId,
    item_id: &str,
    boss_id: &str,
    now: DateTime<Utc>,
) -> TxResult<UseAttempt> {
    let mut player = game.load_or_create_player(tx, id, now)?;
    let key = keys::item(id, item_id);
    let Some(mut item) = tx.get::<CraftedItem>(&key)? else {
        return abort(GameError::ItemNotOwned(item_id.to_string()));
    };
    if item.quantity == 0 {
        return abort(GameError::ItemNotOwned(item_id.to_string()));
    }
    if item.is_expired(now) {
        tx.remove(&key)?;
        return Ok(UseAttempt::Expired);
    }
    let Some(boss) = game.catalog().boss(boss_id) else {
        return abort(GameError::NotFound(format!("boss: {}", boss_id)));
    };

    let boss_key = keys::boss(id, boss_id);
    let mut progress = tx
        .get::<BossProgress>(&boss_key)?
        .unwrap_or_else(|| BossProgress::fresh(boss_id, boss.health));
    progress.reset(boss.health);
    tx.put(&boss_key, &progress)?;

    item.quantity -= 1;
    if item.quantity == 0 {
        tx.remove(&key)?;
    } else {
        tx.put(&key, &item)?;
    }
    player.touch(now);
    tx.put_player(&player)?;
    tx.append_event(&format!("key_used player={} item={} boss={}", id, item_id, boss_id))?;

    Ok(UseAttempt::Used(UseOutcome {
        success: true,
        item_id: item_id.to_string(),
        boss_id: boss_id.to_string(),
        remaining: item.quantity,
        message: format!("{} stands ready again", boss.name),
    }))
}

impl Game {
    /// Debit a recipe's costs and produce its output. Nothing changes if any cost is short.
    pub fn craft(&self, id: PlayerId, recipe_id: &str) -> Result<CraftOutcome, GameError> {
        let recipe = self
            .catalog()
            .recipe(recipe_id)
            .ok_or_else(|| GameError::NotFound(format!("recipe: {}", recipe_id)))?;
        let now = self.now();
        let outcome = self.store().transaction(|tx| craft_tx(self, tx, id, recipe, now))?;
        info!("player {} crafted {}", id, recipe_id);
        Ok(outcome)
    }

    /// Consume one key item and reset the boss it targets.
    pub fn use_item(&self, id: PlayerId, item_id: &str) -> Result<UseOutcome, GameError> {
        let Some((item_id, boss_id, _)) = self.catalog().key_item(item_id) else {
            return Err(GameError::NotFound(format!("item: {}", item_id)));
        };
        let now = self.now();
        let attempt = self
            .store()
            .transaction(|tx| use_item_tx(self, tx, id, item_id, boss_id, now))?;
        let UseAttempt::Used(outcome) = attempt else {
            warn!("player {} tried to use expired {}", id, item_id);
            return Err(GameError::ItemExpired(item_id.to_string()));
        };
        info!("player {} used {} on {}", id, item_id, boss_id);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::Catalog;
    use crate::game::clock::Clock;
    use crate::game::rules::GameRules;
    use crate::game::storage::MineStoreBuilder;
    use crate::game::types::EffectKind;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn game() -> (TempDir, Game) {
        let dir = TempDir::new().expect("tempdir");
        let store = MineStoreBuilder::new(dir.path()).without_flush().open().expect("store");
        let start = Utc.with_ymd_and_hms(2026, 2, 10, 9, 0, 0).unwrap();
        let game = Game::new(store, Arc::new(Catalog::standard()), GameRules::default())
            .expect("game")
            .with_seed(5)
            .with_clock(Clock::fixed(start));
        (dir, game)
    }

    fn stock(game: &Game, id: PlayerId, items: &[(&str, u64)]) {
        let now = game.now();
        game.store()
            .transaction(|tx| {
                game.load_or_create_player(tx, id, now)?;
                for (res, amount) in items {
                    tx.put_count(&keys::inventory(id, res), *amount)?;
                }
                Ok(())
            })
            .expect("stock");
    }

    #[test]
    fn consumable_refresh_resets_timer() {
        let (_dir, game) = game();
        stock(&game, 1, &[("coal", 60), ("iron", 20)]);
        let first = game.craft(1, "miners_brew").expect("first brew");
        game.clock().advance(Duration::minutes(20));
        let second = game.craft(1, "miners_brew").expect("second brew");
        let (CraftedResult::Effect { expires_at: a, .. }, CraftedResult::Effect { expires_at: b, .. }) =
            (first.result, second.result)
        else {
            panic!("brew should produce an effect");
        };
        assert_eq!(b - a, Duration::minutes(20));

        let effect: ActiveEffect = game
            .store()
            .transaction(|tx| tx.get(&keys::effect(1, "miners_brew")))
            .expect("read")
            .expect("effect row");
        assert_eq!(effect.kind, EffectKind::ExpBoost { multiplier: 1.5 });
    }

    #[test]
    fn permanent_recipe_bumps_player_field() {
        let (_dir, game) = game();
        stock(&game, 2, &[("mithril", 5), ("diamond", 5)]);
        let outcome = game.craft(2, "tempered_handle").expect("craft");
        assert_eq!(
            outcome.result,
            CraftedResult::Permanent {
                modifier: "tool_power_bonus".into(),
                new_value: 1
            }
        );
        assert_eq!(game.store().get_player(2).unwrap().tool_power_bonus, 1);
        assert_eq!(game.store().get_count(&keys::inventory(2, "mithril")).unwrap(), 0);
    }

    #[test]
    fn expired_key_is_swept() {
        let (_dir, game) = game();
        stock(&game, 3, &[("soul_shard", 1), ("gold", 10)]);
        game.craft(3, "goblin_sigil").expect("craft");
        game.clock().advance(Duration::hours(25));
        let err = game.use_item(3, "goblin_sigil").unwrap_err();
        assert!(matches!(err, GameError::ItemExpired(_)));
        let err = game.use_item(3, "goblin_sigil").unwrap_err();
        assert!(matches!(err, GameError::ItemNotOwned(_)));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let (_dir, game) = game();
        assert!(matches!(game.craft(4, "philosopher_stone"), Err(GameError::NotFound(_))));
        assert!(matches!(game.use_item(4, "miners_brew"), Err(GameError::NotFound(_))));
    }
}
