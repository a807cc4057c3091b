//! Click resolution: the full effect chain of one mining action, committed as a unit.

use chrono::{DateTime, Utc};
use log::debug;

use crate::game::achievement;
use crate::game::catalog::{CLICK_POWER, CRIT_CHANCE};
use crate::game::engine::Game;
use crate::game::errors::GameError;
use crate::game::quest::{self, tags};
use crate::game::reward::{compute_click_reward, roll_drop, tool_power, RewardInputs};
use crate::game::storage::{abort, keys, TxResult, Txn};
use crate::game::types::{ActiveEffect, ClickOutcome, PlayerId, PlayerRecord};

/// Effects of `player` still running at `now`. Expired rows are dropped.
pub(crate) fn active_effects(
    game: &Game,
    tx: &Txn<'_>,
    player: PlayerId,
    now: DateTime<Utc>,
) -> TxResult<Vec<ActiveEffect>> {
    let mut active = Vec::new();
    for effect_id in game.catalog().effect_ids() {
        let key = keys::effect(player, effect_id);
        if let Some(effect) = tx.get::<ActiveEffect>(&key)? {
            if effect.is_active(now) {
                active.push(effect);
            } else {
                tx.remove(&key)?;
            }
        }
    }
    Ok(active)
}

fn current_tool_power(game: &Game, tx: &Txn<'_>, player: &PlayerRecord) -> TxResult<u32> {
    let level = game.active_tool_level(tx, player)?;
    Ok(tool_power(
        game.catalog().tool(&player.active_tool),
        level,
        player.tool_power_bonus,
    ))
}

fn resolve_click_tx(game: &Game, tx: &Txn<'_>, id: PlayerId, now: DateTime<Utc>) -> TxResult<ClickOutcome> {
    let mut player = game.load_or_create_player(tx, id, now)?;
    quest::ensure_all_periods(game, tx, &mut player, now)?;

    let effects = active_effects(game, tx, id, now)?;
    let Some(location) = game.catalog().location(&player.current_location) else {
        return abort(GameError::NotFound(format!("location: {}", player.current_location)));
    };
    let power = current_tool_power(game, tx, &player)?;
    let inputs = RewardInputs {
        click_power_level: tx.get_count(&keys::upgrade(id, CLICK_POWER))? as u32,
        crit_chance_level: tx.get_count(&keys::upgrade(id, CRIT_CHANCE))? as u32,
        crit_bonus: player.crit_bonus,
        effects: &effects,
    };
    let rules = game.rules();
    let (reward, drop) = game.dice().with(|rng| {
        let drop = roll_drop(rng, location, power, rules.tool_drop_step);
        (compute_click_reward(rng, rules, &inputs), drop)
    });

    player.gold = player.gold.saturating_add(reward.gold);
    player.exp = player.exp.saturating_add(reward.exp);
    player.total_clicks += 1;
    player.total_gold_earned = player.total_gold_earned.saturating_add(reward.gold);
    if reward.is_crit {
        player.total_crits += 1;
        player.current_crit_streak += 1;
        player.max_crit_streak = player.max_crit_streak.max(player.current_crit_streak);
    } else {
        player.current_crit_streak = 0;
    }

    let (resource, amount, stored) = match &drop {
        Some(d) => {
            let stored = game.credit_resource(tx, id, &d.resource_id, d.amount)?;
            (Some(d.resource_id.clone()), d.amount, stored)
        }
        None => (None, 0, 0),
    };

    let mut completed_quests = quest::apply_progress_all(game, tx, &mut player, tags::CLICKS, 1)?;
    completed_quests.extend(quest::apply_progress_all(game, tx, &mut player, tags::GOLD, reward.gold)?);
    if reward.is_crit {
        completed_quests.extend(quest::apply_progress_all(game, tx, &mut player, tags::CRITS, 1)?);
    }
    completed_quests.extend(quest::apply_progress_all(game, tx, &mut player, tags::ORE, amount)?);

    let achievements = achievement::evaluate(game, tx, &mut player, now)?;

    player.normalize_level(rules.exp_per_level);
    player.touch(now);
    tx.put_player(&player)?;

    Ok(ClickOutcome {
        gold: reward.gold,
        exp: reward.exp,
        is_crit: reward.is_crit,
        lucky: reward.lucky,
        resource,
        amount,
        stored,
        totals: player.totals(),
        completed_quests,
        achievements,
    })
}

impl Game {
    /// One mining action. Either every consequence commits or none does.
    pub fn resolve_click(&self, id: PlayerId) -> Result<ClickOutcome, GameError> {
        let now = self.now();
        let outcome = self.store().transaction(|tx| resolve_click_tx(self, tx, id, now))?;
        debug!(
            "player {} click: +{}g +{}e crit={} drop={:?}x{}",
            id, outcome.gold, outcome.exp, outcome.is_crit, outcome.resource, outcome.amount
        );
        Ok(outcome)
    }
}
