use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::game::catalog::Catalog;
use crate::game::clock::Clock;
use crate::game::errors::GameError;
use crate::game::rules::GameRules;
use crate::game::storage::{keys, MineStore, TxResult, Txn};
use crate::game::types::{PlayerId, PlayerRecord};

/// Shared random source. Transactions may re-run, so every attempt draws afresh.
pub struct Dice(Mutex<StdRng>);

impl Dice {
    pub fn from_entropy() -> Self {
        Dice(Mutex::new(StdRng::from_entropy()))
    }

    pub fn seeded(seed: u64) -> Self {
        Dice(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.0.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut rng)
    }
}

/// Entry point for every progression operation.
///
/// `Game` is `Send + Sync`; wrap it in an `Arc` and call it from as many
/// request handlers as needed. Each public operation is one store transaction.
pub struct Game {
    store: MineStore,
    catalog: Arc<Catalog>,
    rules: GameRules,
    dice: Dice,
    clock: Clock,
}

impl Game {
    pub fn new(store: MineStore, catalog: Arc<Catalog>, rules: GameRules) -> Result<Self, GameError> {
        catalog.validate()?;
        rules.validate()?;
        Ok(Self {
            store,
            catalog,
            rules,
            dice: Dice::from_entropy(),
            clock: Clock::System,
        })
    }

    /// Deterministic dice for tests and replays.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.dice = Dice::seeded(seed);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &MineStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub(crate) fn dice(&self) -> &Dice {
        &self.dice
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Load the player row, creating it (with starter inventory, upgrades and tool) on first contact.
    pub(crate) fn load_or_create_player(
        &self,
        tx: &Txn<'_>,
        id: PlayerId,
        now: DateTime<Utc>,
    ) -> TxResult<PlayerRecord> {
        if let Some(player) = tx.get_player(id)? {
            return Ok(player);
        }
        let player = PlayerRecord::new(
            id,
            &self.catalog.starting_location,
            &self.catalog.starting_tool,
            now,
        );
        for resource in &self.catalog.resources {
            tx.insert_new(&keys::inventory(id, &resource.id), &0u64)?;
        }
        for upgrade in &self.catalog.upgrades {
            tx.insert_new(&keys::upgrade(id, &upgrade.id), &0u64)?;
        }
        tx.insert_new(&keys::tool(id, &self.catalog.starting_tool), &1u64)?;
        tx.put_player(&player)?;
        Ok(player)
    }

    /// Attach a display name to a player, creating the row if needed.
    pub fn register_player(&self, id: PlayerId, username: Option<&str>) -> Result<PlayerRecord, GameError> {
        let now = self.now();
        self.store.transaction(|tx| {
            let mut player = self.load_or_create_player(tx, id, now)?;
            if let Some(name) = username {
                player.username = Some(name.to_string());
                player.touch(now);
                tx.put_player(&player)?;
            }
            Ok(player)
        })
    }

    /// Credit a resource under the cap. Returns the amount actually stored.
    pub(crate) fn credit_resource(&self, tx: &Txn<'_>, id: PlayerId, resource: &str, amount: u64) -> TxResult<u64> {
        let key = keys::inventory(id, resource);
        let current = tx.get_count(&key)?;
        let next = current.saturating_add(amount).min(self.rules.max_resource_amount);
        if next != current {
            tx.put_count(&key, next)?;
        }
        Ok(next.saturating_sub(current))
    }

    /// Debit a resource, aborting when the player holds less than `amount`.
    pub(crate) fn debit_resource(&self, tx: &Txn<'_>, id: PlayerId, resource: &str, amount: u64) -> TxResult<()> {
        let key = keys::inventory(id, resource);
        let current = tx.get_count(&key)?;
        if current < amount {
            return crate::game::storage::abort(GameError::InsufficientResource {
                resource: resource.to_string(),
                needed: amount,
                available: current,
            });
        }
        tx.put_count(&key, current - amount)
    }

    /// Level of the player's active tool, 0 when the tool is not held.
    pub(crate) fn active_tool_level(&self, tx: &Txn<'_>, player: &PlayerRecord) -> TxResult<u32> {
        Ok(tx.get_count(&keys::tool(player.id, &player.active_tool))? as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::storage::MineStoreBuilder;
    use rand::Rng;
    use tempfile::TempDir;

    fn game() -> (TempDir, Game) {
        let dir = TempDir::new().expect("tempdir");
        let store = MineStoreBuilder::new(dir.path()).open().expect("store");
        let game = Game::new(store, Arc::new(Catalog::standard()), GameRules::default())
            .expect("game")
            .with_seed(7);
        (dir, game)
    }

    #[test]
    fn seeded_dice_repeat() {
        let a = Dice::seeded(42).with(|rng| rng.gen::<u64>());
        let b = Dice::seeded(42).with(|rng| rng.gen::<u64>());
        assert_eq!(a, b);
    }

    #[test]
    fn new_player_gets_starter_rows() {
        let (_dir, game) = game();
        let player = game.register_player(5, Some("digger")).expect("register");
        assert_eq!(player.level, 1);
        assert_eq!(player.username.as_deref(), Some("digger"));
        assert_eq!(game.store().get_count(&keys::tool(5, "wooden_pickaxe")).unwrap(), 1);
        let inventory = game
            .store()
            .scan_prefix::<u64>(&keys::owned_prefix("inventory", 5))
            .unwrap();
        assert_eq!(inventory.len(), game.catalog().resources.len());
    }

    #[test]
    fn resource_credit_clamps_to_cap() {
        let (_dir, game) = game();
        let cap = game.rules().max_resource_amount;
        let stored = game
            .store()
            .transaction(|tx| {
                game.load_or_create_player(tx, 1, game.now())?;
                tx.put_count(&keys::inventory(1, "coal"), cap - 1)?;
                let first = game.credit_resource(tx, 1, "coal", 10)?;
                let second = game.credit_resource(tx, 1, "coal", 10)?;
                Ok((first, second))
            })
            .expect("txn");
        assert_eq!(stored, (1, 0));
        assert_eq!(game.store().get_count(&keys::inventory(1, "coal")).unwrap(), cap);
    }

    #[test]
    fn debit_without_stock_aborts() {
        let (_dir, game) = game();
        let result = game.store().transaction(|tx| {
            game.load_or_create_player(tx, 1, game.now())?;
            game.debit_resource(tx, 1, "iron", 3)
        });
        assert!(matches!(result, Err(GameError::InsufficientResource { .. })));
        // the aborted transaction also rolled back player creation
        assert!(matches!(game.store().get_player(1), Err(GameError::NotFound(_))));
    }
}
