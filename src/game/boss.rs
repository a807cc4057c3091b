//! Boss encounters
//!
//! Each (player, boss) pair holds a depletable health row. Attacks run inside a
//! serializable store transaction, so concurrent attackers on the same row are
//! applied one after another and only one of them can observe the transition to
//! zero health. That attacker alone is paid.
//!
//! A single persisted timestamp (`meta:boss_reset`) gates the periodic sweep that
//! brings every boss back to full health.

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use rand::Rng;

use crate::game::achievement;
use crate::game::catalog::{BossDef, CLICK_POWER, CRIT_CHANCE};
use crate::game::engine::Game;
use crate::game::errors::GameError;
use crate::game::ledger::active_effects;
use crate::game::reward::{compute_click_reward, RewardInputs};
use crate::game::storage::{abort, keys, TxResult, Txn};
use crate::game::types::{AttackOutcome, BossProgress, PlayerId, ResourceDrop};

/// How the damage of one attack is decided.
#[derive(Debug, Clone, Copy)]
enum Strike {
    Fixed(u64),
    Rolled,
}

fn roll_strike(game: &Game, tx: &Txn<'_>, id: PlayerId, crit_bonus: u32, now: DateTime<Utc>) -> TxResult<(u64, bool)> {
    let effects = active_effects(game, tx, id, now)?;
    let inputs = RewardInputs {
        click_power_level: tx.get_count(&keys::upgrade(id, CLICK_POWER))? as u32,
        crit_chance_level: tx.get_count(&keys::upgrade(id, CRIT_CHANCE))? as u32,
        crit_bonus,
        effects: &effects,
    };
    let reward = game
        .dice()
        .with(|rng| compute_click_reward(rng, game.rules(), &inputs));
    // crits hit twice as hard again against bosses
    let damage = if reward.is_crit { reward.gold * 2 } else { reward.gold };
    Ok((damage, reward.is_crit))
}

fn attack_tx(
    game: &Game,
    tx: &Txn<'_>,
    id: PlayerId,
    def: &BossDef,
    strike: Strike,
    now: DateTime<Utc>,
) -> TxResult<AttackOutcome> {
    let mut player = game.load_or_create_player(tx, id, now)?;
    if player.level < def.min_level {
        return abort(GameError::LevelTooLow {
            required: def.min_level,
            current: player.level,
        });
    }
    let tool_level = game.active_tool_level(tx, &player)?;
    if tool_level < def.min_tool_level {
        return abort(GameError::ToolLevelTooLow {
            required: def.min_tool_level,
            current: tool_level,
        });
    }

    let key = keys::boss(id, &def.id);
    let mut progress = tx
        .get::<BossProgress>(&key)?
        .unwrap_or_else(|| BossProgress::fresh(&def.id, def.health));
    if progress.defeated {
        return abort(GameError::BossAlreadyDefeated(def.id.clone()));
    }

    let (damage, is_crit) = match strike {
        Strike::Fixed(damage) => (damage, false),
        Strike::Rolled => roll_strike(game, tx, id, player.crit_bonus, now)?,
    };

    progress.current_health = progress.current_health.saturating_sub(damage);
    progress.last_attempt = Some(now);

    let mut outcome = AttackOutcome {
        boss_id: def.id.clone(),
        damage,
        is_crit,
        defeated: false,
        current_health: progress.current_health,
        max_health: progress.max_health,
        reward_gold: 0,
        reward_exp: 0,
        loot: Vec::new(),
        achievements: Vec::new(),
    };

    if progress.current_health == 0 {
        progress.defeated = true;
        progress.defeated_at = Some(now);
        player.credit(def.reward_gold, def.reward_exp);

        let rolls: Vec<(String, u64)> = game.dice().with(|rng| {
            def.reward_resources
                .iter()
                .map(|r| (r.resource_id.clone(), rng.gen_range(r.min..=r.max)))
                .collect()
        });
        for (resource_id, amount) in rolls {
            game.credit_resource(tx, id, &resource_id, amount)?;
            outcome.loot.push(ResourceDrop { resource_id, amount });
        }

        outcome.defeated = true;
        outcome.reward_gold = def.reward_gold;
        outcome.reward_exp = def.reward_exp;
        outcome.achievements = achievement::evaluate(game, tx, &mut player, now)?;
        player.normalize_level(game.rules().exp_per_level);
        tx.append_event(&format!("boss_defeated player={} boss={}", id, def.id))?;
    }

    tx.put(&key, &progress)?;
    player.touch(now);
    tx.put_player(&player)?;
    Ok(outcome)
}

/// Restore the listed rows. Rows first written after `rows` was scanned wait for the next sweep.
fn sweep_tx(game: &Game, tx: &Txn<'_>, rows: &[String]) -> TxResult<usize> {
    let mut reset = 0usize;
    for key in rows {
        let Some(mut progress) = tx.get::<BossProgress>(key)? else {
            continue;
        };
        let max = game
            .catalog()
            .boss(&progress.boss_id)
            .map(|b| b.health)
            .unwrap_or(progress.max_health);
        progress.reset(max);
        tx.put(key, &progress)?;
        reset += 1;
    }
    tx.append_event(&format!("boss_reset rows={}", reset))?;
    Ok(reset)
}

impl Game {
    fn boss_def(&self, boss_id: &str) -> Result<&BossDef, GameError> {
        self.catalog()
            .boss(boss_id)
            .ok_or_else(|| GameError::NotFound(format!("boss: {}", boss_id)))
    }

    fn run_attack(&self, id: PlayerId, boss_id: &str, strike: Strike) -> Result<AttackOutcome, GameError> {
        let def = self.boss_def(boss_id)?;
        let now = self.now();
        let result = self.store().transaction(|tx| attack_tx(self, tx, id, def, strike, now));
        match &result {
            Ok(outcome) if outcome.defeated => {
                info!("player {} defeated {} with a {} hit", id, boss_id, outcome.damage);
            }
            Err(e @ GameError::BossAlreadyDefeated(_))
            | Err(e @ GameError::LevelTooLow { .. })
            | Err(e @ GameError::ToolLevelTooLow { .. }) => {
                warn!("player {} attack on {} rejected: {}", id, boss_id, e);
            }
            _ => {}
        }
        result
    }

    /// Attack with a fixed amount of damage.
    pub fn attack(&self, id: PlayerId, boss_id: &str, damage: u64) -> Result<AttackOutcome, GameError> {
        self.run_attack(id, boss_id, Strike::Fixed(damage))
    }

    /// Attack with damage rolled like a click, doubled again on a crit.
    /// Honours a lapsed reset interval before striking.
    pub fn attack_boss(&self, id: PlayerId, boss_id: &str) -> Result<AttackOutcome, GameError> {
        self.boss_def(boss_id)?;
        self.maybe_reset_bosses()?;
        self.run_attack(id, boss_id, Strike::Rolled)
    }

    /// Current row for one boss, fresh if never attacked.
    pub fn boss_progress(&self, id: PlayerId, boss_id: &str) -> Result<BossProgress, GameError> {
        let def = self.boss_def(boss_id)?;
        self.store().transaction(|tx| {
            Ok(tx
                .get::<BossProgress>(&keys::boss(id, boss_id))?
                .unwrap_or_else(|| BossProgress::fresh(&def.id, def.health)))
        })
    }

    /// Claim the reset slot if the interval has lapsed and sweep every boss row in the
    /// same transaction. Exactly one concurrent caller wins; a failed sweep leaves the
    /// gate where it was.
    ///
    /// The first call ever only records the starting point.
    pub fn maybe_reset_bosses(&self) -> Result<Option<usize>, GameError> {
        let now = self.now();
        let interval = Duration::hours(self.rules().boss_reset_interval_hours);
        if let Some(last) = self.last_boss_reset()? {
            if now - last < interval {
                return Ok(None);
            }
        }
        let rows = self.store().boss_keys()?;
        let swept = self.store().transaction(|tx| {
            match tx.get::<DateTime<Utc>>(keys::BOSS_RESET)? {
                Some(last) if now - last < interval => Ok(None),
                Some(_) => {
                    tx.put(keys::BOSS_RESET, &now)?;
                    sweep_tx(self, tx, &rows).map(Some)
                }
                None => {
                    tx.put(keys::BOSS_RESET, &now)?;
                    Ok(None)
                }
            }
        })?;
        if let Some(reset) = swept {
            info!("boss reset sweep restored {} rows", reset);
        }
        Ok(swept)
    }

    /// Timestamp of the last sweep, if any.
    pub fn last_boss_reset(&self) -> Result<Option<DateTime<Utc>>, GameError> {
        self.store()
            .transaction(|tx| tx.get::<DateTime<Utc>>(keys::BOSS_RESET))
    }
}
