use serde::{Deserialize, Serialize};

use crate::game::engine::Game;
use crate::game::errors::GameError;
use crate::game::storage::keys;
use crate::game::types::{AchievementUnlock, PlayerId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardKind {
    /// Level, ties broken by exp.
    Level,
    Gold,
    Achievements,
    Quests,
    /// Sum of owned tool levels.
    Tools,
    Resource(String),
    TotalResources,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: PlayerId,
    pub username: Option<String>,
    pub score: u64,
    /// Secondary key; only used by the level board.
    pub tiebreak: u64,
}

impl Game {
    /// Top `limit` players for `kind`. Reads committed rows outside any transaction.
    pub fn leaderboard(&self, kind: &LeaderboardKind, limit: usize) -> Result<Vec<LeaderboardEntry>, GameError> {
        if let LeaderboardKind::Resource(resource) = kind {
            if self.catalog().resource(resource).is_none() {
                return Err(GameError::NotFound(format!("resource: {}", resource)));
            }
        }
        let store = self.store();
        let mut rows = Vec::new();
        for id in store.list_player_ids()? {
            let player = store.get_player(id)?;
            let (score, tiebreak) = match kind {
                LeaderboardKind::Level => (player.level as u64, player.exp),
                LeaderboardKind::Gold => (player.gold, 0),
                LeaderboardKind::Achievements => (
                    store
                        .scan_prefix::<AchievementUnlock>(&keys::owned_prefix("achievements", id))?
                        .len() as u64,
                    0,
                ),
                LeaderboardKind::Quests => (
                    player.daily_quests_completed as u64 + player.weekly_quests_completed as u64,
                    0,
                ),
                LeaderboardKind::Tools => (
                    store
                        .scan_prefix::<u64>(&keys::owned_prefix("tools", id))?
                        .iter()
                        .map(|(_, level)| *level)
                        .sum(),
                    0,
                ),
                LeaderboardKind::Resource(resource) => (store.get_count(&keys::inventory(id, resource))?, 0),
                LeaderboardKind::TotalResources => (
                    store
                        .scan_prefix::<u64>(&keys::owned_prefix("inventory", id))?
                        .iter()
                        .fold(0u64, |acc, (_, amount)| acc.saturating_add(*amount)),
                    0,
                ),
            };
            rows.push((player.id, player.username, score, tiebreak));
        }

        rows.sort_by(|a, b| (b.2, b.3).cmp(&(a.2, a.3)).then(a.0.cmp(&b.0)));
        Ok(rows
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, (player_id, username, score, tiebreak))| LeaderboardEntry {
                rank: i + 1,
                player_id,
                username,
                score,
                tiebreak,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::Catalog;
    use crate::game::rules::GameRules;
    use crate::game::storage::MineStoreBuilder;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn gold_board_orders_descending() {
        let dir = TempDir::new().expect("tempdir");
        let store = MineStoreBuilder::new(dir.path()).without_flush().open().expect("store");
        let game = Game::new(store, Arc::new(Catalog::standard()), GameRules::default()).expect("game");
        let now = game.now();
        for (id, gold) in [(1, 50u64), (2, 500), (3, 5)] {
            game.store()
                .transaction(|tx| {
                    let mut player = game.load_or_create_player(tx, id, now)?;
                    player.gold = gold;
                    tx.put_player(&player)
                })
                .expect("seed");
        }
        let board = game.leaderboard(&LeaderboardKind::Gold, 2).expect("board");
        let ids: Vec<_> = board.iter().map(|e| e.player_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(board[0].rank, 1);
        assert!(matches!(
            game.leaderboard(&LeaderboardKind::Resource("unobtainium".into()), 5),
            Err(GameError::NotFound(_))
        ));
    }
}
