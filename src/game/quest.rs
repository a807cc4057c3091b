//! Rotating daily and weekly objectives
//!
//! Each period (UTC day, ISO week) gets a fresh sample of templates the first time a
//! player is seen in it. Progress is routed by tag: every open quest whose name
//! contains the tag advances, so template names must embed exactly the tags they track.

use chrono::{DateTime, Utc};
use log::debug;
use rand::seq::index::sample;
use rand::Rng;

use crate::game::engine::Game;
use crate::game::errors::GameError;
use crate::game::storage::{keys, TxResult, Txn};
use crate::game::types::{PlayerId, PlayerRecord, QuestInstance, QuestPeriod, QuestView};

/// Tags emitted by engine events. Matching is a case-sensitive substring test.
pub mod tags {
    pub const CLICKS: &str = "Clicks";
    pub const GOLD: &str = "Gold";
    pub const CRITS: &str = "Crits";
    pub const ORE: &str = "Ore";
    pub const UPGRADE: &str = "Upgrade";
    pub const MARKET: &str = "Market";
}

pub fn matches_tag(name: &str, tag: &str) -> bool {
    !tag.is_empty() && name.contains(tag)
}

// ============================================================================
// Transaction helpers
// ============================================================================

fn current_rows(tx: &Txn<'_>, id: PlayerId, period: QuestPeriod, period_key: &str) -> TxResult<Vec<QuestInstance>> {
    let mut rows = Vec::new();
    for slot in 0..=u8::MAX {
        match tx.get::<QuestInstance>(&keys::quest(id, period, period_key, slot))? {
            Some(row) => rows.push(row),
            None => break,
        }
    }
    Ok(rows)
}

/// Regenerate the player's quest set if the stored period key is stale.
pub(crate) fn ensure_period(
    game: &Game,
    tx: &Txn<'_>,
    player: &mut PlayerRecord,
    period: QuestPeriod,
    now: DateTime<Utc>,
) -> TxResult<()> {
    let key = period.key_for(now);
    if player.last_period_key(period) == Some(key.as_str()) {
        return Ok(());
    }

    if let Some(old_key) = player.last_period_key(period).map(str::to_string) {
        for row in current_rows(tx, player.id, period, &old_key)? {
            tx.remove(&keys::quest(player.id, period, &old_key, row.slot))?;
        }
    }

    let templates = game.catalog().quest_templates(period);
    let count = game.rules().quest_count(period).min(templates.len());
    let picks: Vec<(usize, u64)> = game.dice().with(|rng| {
        sample(&mut *rng, templates.len(), count)
            .into_iter()
            .map(|idx| {
                let t = &templates[idx];
                (idx, rng.gen_range(t.goal_min..=t.goal_max))
            })
            .collect()
    });

    for (slot, (idx, goal)) in picks.into_iter().enumerate() {
        let template = &templates[idx];
        let slot = slot as u8;
        let instance = QuestInstance {
            slot,
            period,
            period_key: key.clone(),
            name: template.name.clone(),
            description: template.describe(goal),
            goal,
            progress: 0,
            completed: false,
            reward_gold: template.reward_gold,
            reward_exp: template.reward_exp,
        };
        tx.insert_new(&keys::quest(player.id, period, &key, slot), &instance)?;
    }

    debug!("player {} rolled {} {} quests for {}", player.id, count, period.as_str(), key);
    player.set_last_period_key(period, key);
    Ok(())
}

pub(crate) fn ensure_all_periods(game: &Game, tx: &Txn<'_>, player: &mut PlayerRecord, now: DateTime<Utc>) -> TxResult<()> {
    for period in QuestPeriod::ALL {
        ensure_period(game, tx, player, period, now)?;
    }
    Ok(())
}

/// Advance every open quest of `period` whose name carries `tag`; pay out completions.
///
/// Assumes [`ensure_period`] already ran in this transaction.
pub(crate) fn apply_progress(
    game: &Game,
    tx: &Txn<'_>,
    player: &mut PlayerRecord,
    period: QuestPeriod,
    tag: &str,
    delta: u64,
) -> TxResult<Vec<QuestView>> {
    let mut completed = Vec::new();
    if delta == 0 {
        return Ok(completed);
    }
    let Some(period_key) = player.last_period_key(period).map(str::to_string) else {
        return Ok(completed);
    };

    for mut row in current_rows(tx, player.id, period, &period_key)? {
        if row.completed || !matches_tag(&row.name, tag) {
            continue;
        }
        row.progress = row.progress.saturating_add(delta);
        if row.progress >= row.goal {
            row.completed = true;
            player.credit(row.reward_gold, row.reward_exp);
            player.record_quest_completion(period);
            completed.push(row.view());
        }
        tx.put(&keys::quest(player.id, period, &period_key, row.slot), &row)?;
    }

    player.normalize_level(game.rules().exp_per_level);
    Ok(completed)
}

/// Same tag and delta against both daily and weekly sets.
pub(crate) fn apply_progress_all(
    game: &Game,
    tx: &Txn<'_>,
    player: &mut PlayerRecord,
    tag: &str,
    delta: u64,
) -> TxResult<Vec<QuestView>> {
    let mut completed = Vec::new();
    for period in QuestPeriod::ALL {
        completed.extend(apply_progress(game, tx, player, period, tag, delta)?);
    }
    Ok(completed)
}

// ============================================================================
// Public operations
// ============================================================================

impl Game {
    /// Current quest set for `period`, rotating it first if the period rolled over.
    pub fn list_quests(&self, id: PlayerId, period: QuestPeriod) -> Result<Vec<QuestView>, GameError> {
        let now = self.now();
        self.store().transaction(|tx| {
            let mut player = self.load_or_create_player(tx, id, now)?;
            ensure_period(self, tx, &mut player, period, now)?;
            tx.put_player(&player)?;
            let key = player.last_period_key(period).unwrap_or_default().to_string();
            Ok(current_rows(tx, id, period, &key)?
                .iter()
                .map(QuestInstance::view)
                .collect())
        })
    }

    /// Feed progress for one tag directly. Returns the quests completed by this call.
    pub fn apply_quest_progress(
        &self,
        id: PlayerId,
        period: QuestPeriod,
        tag: &str,
        delta: u64,
    ) -> Result<Vec<QuestView>, GameError> {
        let now = self.now();
        self.store().transaction(|tx| {
            let mut player = self.load_or_create_player(tx, id, now)?;
            ensure_period(self, tx, &mut player, period, now)?;
            let completed = apply_progress(self, tx, &mut player, period, tag, delta)?;
            if !completed.is_empty() {
                crate::game::achievement::evaluate(self, tx, &mut player, now)?;
            }
            player.touch(now);
            tx.put_player(&player)?;
            Ok(completed)
        })
    }
}
