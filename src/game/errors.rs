use thiserror::Error;

/// Errors that can arise while running progression operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, seed files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Static tables reference something that does not exist or hold invalid ranges.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Unknown recipe/boss/location/item/tool/upgrade/resource id.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("level {required} required (current {current})")]
    LevelTooLow { required: u32, current: u32 },

    #[error("tool level {required} required (current {current})")]
    ToolLevelTooLow { required: u32, current: u32 },

    #[error("insufficient gold: need {needed}, have {available}")]
    InsufficientGold { needed: u64, available: u64 },

    #[error("insufficient {resource}: need {needed}, have {available}")]
    InsufficientResource {
        resource: String,
        needed: u64,
        available: u64,
    },

    #[error("tool not owned: {0}")]
    ToolNotOwned(String),

    #[error("item not owned: {0}")]
    ItemNotOwned(String),

    #[error("item expired: {0}")]
    ItemExpired(String),

    /// Catch-all for requests that are well-formed but make no sense in the current state.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Boss is already down; the caller lost the race or attacked after the kill.
    #[error("boss already defeated: {0}")]
    BossAlreadyDefeated(String),

    #[error("already owned: {0}")]
    AlreadyOwned(String),
}

/// Coarse category used by adapters to pick a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Store,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::LevelTooLow { .. }
            | GameError::ToolLevelTooLow { .. }
            | GameError::InsufficientGold { .. }
            | GameError::InsufficientResource { .. }
            | GameError::ToolNotOwned(_)
            | GameError::ItemNotOwned(_)
            | GameError::ItemExpired(_)
            | GameError::InvalidAction(_) => ErrorKind::Validation,
            GameError::NotFound(_) => ErrorKind::NotFound,
            GameError::BossAlreadyDefeated(_) | GameError::AlreadyOwned(_) => ErrorKind::Conflict,
            GameError::Sled(_)
            | GameError::Bincode(_)
            | GameError::Io(_)
            | GameError::SchemaMismatch { .. }
            | GameError::Catalog(_) => ErrorKind::Store,
        }
    }

    /// Short, stable text for the presentation layer. Never includes ids or internals.
    pub fn user_message(&self) -> &'static str {
        match self {
            GameError::LevelTooLow { .. } => "Your level is too low.",
            GameError::ToolLevelTooLow { .. } => "Your tool level is too low.",
            GameError::InsufficientGold { .. } => "Not enough gold.",
            GameError::InsufficientResource { .. } => "Not enough resources.",
            GameError::ToolNotOwned(_) => "You don't own that tool.",
            GameError::ItemNotOwned(_) => "You don't have that item.",
            GameError::ItemExpired(_) => "That item has expired.",
            GameError::InvalidAction(_) => "That can't be done right now.",
            GameError::NotFound(_) => "Not found.",
            GameError::BossAlreadyDefeated(_) => "Boss already defeated.",
            GameError::AlreadyOwned(_) => "You already own that.",
            _ => "Something went wrong, try again later.",
        }
    }
}
