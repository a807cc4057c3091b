use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use sled::{IVec, Transactional};

use crate::game::errors::GameError;
use crate::game::types::{PlayerId, PlayerRecord, PLAYER_SCHEMA_VERSION};

const TREE_PRIMARY: &str = "mine";
const TREE_EVENTS: &str = "mine_events";

/// Result type for code running inside a store transaction.
pub type TxResult<T> = Result<T, ConflictableTransactionError<GameError>>;

/// Abort the enclosing transaction with a domain error.
pub fn abort<T>(err: GameError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err))
}

/// Row key layout for the primary tree.
pub mod keys {
    use crate::game::types::{PlayerId, QuestPeriod};

    pub const BOSS_RESET: &str = "meta:boss_reset";
    pub const PLAYERS_PREFIX: &str = "players:";
    pub const BOSSES_PREFIX: &str = "bosses:";

    pub fn player(id: PlayerId) -> String {
        format!("players:{}", id)
    }

    pub fn inventory(id: PlayerId, resource: &str) -> String {
        format!("inventory:{}:{}", id, resource)
    }

    pub fn upgrade(id: PlayerId, upgrade: &str) -> String {
        format!("upgrades:{}:{}", id, upgrade)
    }

    pub fn tool(id: PlayerId, tool: &str) -> String {
        format!("tools:{}:{}", id, tool)
    }

    pub fn quest(id: PlayerId, period: QuestPeriod, period_key: &str, slot: u8) -> String {
        format!("quests:{}:{}:{}:{}", id, period.as_str(), period_key, slot)
    }

    pub fn achievement(id: PlayerId, achievement: &str) -> String {
        format!("achievements:{}:{}", id, achievement)
    }

    pub fn boss(id: PlayerId, boss: &str) -> String {
        format!("bosses:{}:{}", id, boss)
    }

    pub fn effect(id: PlayerId, effect: &str) -> String {
        format!("effects:{}:{}", id, effect)
    }

    pub fn item(id: PlayerId, item: &str) -> String {
        format!("items:{}:{}", id, item)
    }

    /// Prefix for every row of one family owned by one player, e.g. `inventory:42:`.
    pub fn owned_prefix(family: &str, id: PlayerId) -> String {
        format!("{}:{}:", family, id)
    }
}

fn event_key(id: u64) -> String {
    format!("events:{:020}", id)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, GameError> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GameError> {
    Ok(bincode::deserialize::<T>(bytes)?)
}

fn check_player_schema(record: &PlayerRecord) -> Result<(), GameError> {
    if record.schema_version != PLAYER_SCHEMA_VERSION {
        return Err(GameError::SchemaMismatch {
            entity: "player",
            expected: PLAYER_SCHEMA_VERSION,
            found: record.schema_version,
        });
    }
    Ok(())
}

/// Typed view over a sled transaction spanning the primary and event trees.
///
/// Writes are visible to later reads in the same transaction. Conflicting
/// transactions are re-run by sled, so closures handed to
/// [`MineStore::transaction`] must be safe to execute more than once.
pub struct Txn<'a> {
    tree: &'a TransactionalTree,
    events: &'a TransactionalTree,
}

impl<'a> Txn<'a> {
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> TxResult<Option<T>> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => match decode(&bytes) {
                Ok(value) => Ok(Some(value)),
                Err(e) => abort(e),
            },
            None => Ok(None),
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> TxResult<()> {
        let bytes = match encode(value) {
            Ok(bytes) => bytes,
            Err(e) => return abort(e),
        };
        self.tree.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> TxResult<()> {
        self.tree.remove(key.as_bytes())?;
        Ok(())
    }

    /// Insert only when the key is absent. Returns true when the row was created.
    pub fn insert_new<T: Serialize>(&self, key: &str, value: &T) -> TxResult<bool> {
        if self.tree.get(key.as_bytes())?.is_some() {
            return Ok(false);
        }
        self.put(key, value)?;
        Ok(true)
    }

    /// Counter rows (inventory amounts, upgrade and tool levels) default to zero.
    pub fn get_count(&self, key: &str) -> TxResult<u64> {
        Ok(self.get::<u64>(key)?.unwrap_or(0))
    }

    pub fn put_count(&self, key: &str, value: u64) -> TxResult<()> {
        self.put(key, &value)
    }

    pub fn get_player(&self, id: PlayerId) -> TxResult<Option<PlayerRecord>> {
        let Some(record) = self.get::<PlayerRecord>(&keys::player(id))? else {
            return Ok(None);
        };
        if let Err(e) = check_player_schema(&record) {
            return abort(e);
        }
        Ok(Some(record))
    }

    pub fn put_player(&self, player: &PlayerRecord) -> TxResult<()> {
        let mut record = player.clone();
        record.schema_version = PLAYER_SCHEMA_VERSION;
        self.put(&keys::player(record.id), &record)
    }

    /// Append a free-form line to the event log. Commits or aborts with the rest of the transaction.
    pub fn append_event(&self, message: &str) -> TxResult<()> {
        let id = self.events.generate_id()?;
        self.events
            .insert(event_key(id).into_bytes(), message.as_bytes())?;
        Ok(())
    }
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct MineStoreBuilder {
    path: PathBuf,
    flush_on_commit: bool,
}

impl MineStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_on_commit: true,
        }
    }

    /// Skip the fsync after each committed transaction (throughput tests).
    pub fn without_flush(mut self) -> Self {
        self.flush_on_commit = false;
        self
    }

    pub fn open(self) -> Result<MineStore, GameError> {
        MineStore::open_with_options(self.path, self.flush_on_commit)
    }
}

/// Sled-backed persistence for player progression.
pub struct MineStore {
    _db: sled::Db,
    primary: sled::Tree,
    events: sled::Tree,
    flush_on_commit: bool,
}

impl MineStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, flush_on_commit: bool) -> Result<Self, GameError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let events = db.open_tree(TREE_EVENTS)?;
        Ok(Self {
            _db: db,
            primary,
            events,
            flush_on_commit,
        })
    }

    /// Run `f` as one serializable unit of work. Any error aborts with no partial writes.
    pub fn transaction<F, T>(&self, f: F) -> Result<T, GameError>
    where
        F: Fn(&Txn<'_>) -> TxResult<T>,
    {
        let result = (&self.primary, &self.events).transaction(|(tree, events)| {
            let txn = Txn { tree, events };
            f(&txn)
        });
        match result {
            Ok(value) => {
                if self.flush_on_commit {
                    self.primary.flush()?;
                    self.events.flush()?;
                }
                Ok(value)
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(GameError::Sled(e)),
        }
    }

    fn get_raw<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, GameError> {
        match self.primary.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Fetch a player record by id.
    pub fn get_player(&self, id: PlayerId) -> Result<PlayerRecord, GameError> {
        let Some(record) = self.get_raw::<PlayerRecord>(&keys::player(id))? else {
            return Err(GameError::NotFound(format!("player: {}", id)));
        };
        check_player_schema(&record)?;
        Ok(record)
    }

    /// List all player ids currently stored.
    pub fn list_player_ids(&self) -> Result<Vec<PlayerId>, GameError> {
        let mut ids = Vec::new();
        for entry in self.primary.scan_prefix(keys::PLAYERS_PREFIX.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(id) = text
                .strip_prefix(keys::PLAYERS_PREFIX)
                .and_then(|rest| rest.parse::<PlayerId>().ok())
            {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    pub fn get_count(&self, key: &str) -> Result<u64, GameError> {
        Ok(self.get_raw::<u64>(key)?.unwrap_or(0))
    }

    /// All rows under `prefix`, keyed by the remainder of the key.
    pub fn scan_prefix<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<(String, T)>, GameError> {
        let mut rows = Vec::new();
        for entry in self.primary.scan_prefix(prefix.as_bytes()) {
            let (key, value): (IVec, IVec) = entry?;
            let text = String::from_utf8_lossy(&key);
            let suffix = text.strip_prefix(prefix).unwrap_or(&text).to_string();
            rows.push((suffix, decode(&value)?));
        }
        Ok(rows)
    }

    /// Keys of every boss progress row across all players.
    pub fn boss_keys(&self) -> Result<Vec<String>, GameError> {
        let mut out = Vec::new();
        for entry in self.primary.scan_prefix(keys::BOSSES_PREFIX.as_bytes()) {
            let (key, _) = entry?;
            out.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(out)
    }

    /// Most recent event lines, newest first.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<String>, GameError> {
        let mut out = Vec::new();
        for entry in self.events.iter().rev().take(limit) {
            let (_, value) = entry?;
            out.push(String::from_utf8_lossy(&value).into_owned());
        }
        Ok(out)
    }
}
