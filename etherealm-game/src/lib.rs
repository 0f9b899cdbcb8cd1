//! Etherealm Game Core
//!
//! Platform-agnostic player state and contract plumbing for the Etherealm
//! browser game. Every module keeps its state in one JSON blob behind the
//! [`KeyValueStore`] seam; the web crate supplies `localStorage` and the
//! wallet connection.

pub mod abi;
pub mod address;
pub mod chain;
pub mod character;
pub mod client;
pub mod constants;
pub mod daily;
pub mod equipment;
pub mod inventory;
pub mod items;
pub mod leaderboard;
pub mod quests;
pub mod seed;
pub mod shop;
pub mod skills;
pub mod social;
pub mod storage;

use thiserror::Error;

pub use abi::{AbiError, ParamKind, Token};
pub use address::{Address, AddressError, TokenAmount};
pub use chain::{
    CallRequest, ChainClient, ChainConfig, ChainError, MockChain, OnChainCharacter, ReadCall,
    ReadResult, SyncSummary, TxHash, WriteCall, decode_read, sync_roster,
};
pub use character::{Character, CharacterClass, CharacterError, Roster};
pub use client::{BattleReport, GameClient, RewardReceipt};
pub use daily::{DailyError, DailyReward, DailyRewardState, GameDay, RewardCalendar};
pub use equipment::{EquipmentError, EquipmentSlot, Loadout};
pub use inventory::{Inventory, InventoryError, ItemStack};
pub use items::{CatalogError, ItemCatalog, ItemDef, ItemKind, Rarity, StatBlock};
pub use leaderboard::{Leaderboard, LeaderboardEntry, Submission};
pub use quests::{GameEvent, QuestCatalog, QuestError, QuestLog};
pub use shop::ShopError;
pub use skills::{SkillBook, SkillError, SkillTree};
pub use social::{FriendList, GuildDirectory, GuildRole, SocialError};
pub use storage::{KeyValueStore, MemoryStore, Namespace, StorageError, StoredBlob, WriteBatch};

#[cfg(all(debug_assertions, not(target_arch = "wasm32")))]
pub(crate) fn debug_log_enabled() -> bool {
    matches!(std::env::var(constants::DEBUG_ENV_VAR), Ok(val) if val != "0")
}

#[cfg(not(all(debug_assertions, not(target_arch = "wasm32"))))]
pub(crate) const fn debug_log_enabled() -> bool {
    false
}

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load one named catalog (`items`, `skills`, `quests`, `rewards`, `chain`).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("unknown data file: {0}")]
    Unknown(String),
    #[error("failed to parse {name}.json: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Catalogs compiled into the binary from `data/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinData;

impl BuiltinData {
    /// Raw JSON for a named catalog.
    #[must_use]
    pub fn raw(config_name: &str) -> Option<&'static str> {
        match config_name {
            "items" => Some(include_str!("../data/items.json")),
            "skills" => Some(include_str!("../data/skills.json")),
            "quests" => Some(include_str!("../data/quests.json")),
            "rewards" => Some(include_str!("../data/rewards.json")),
            "chain" => Some(include_str!("../data/chain.json")),
            _ => None,
        }
    }
}

impl DataLoader for BuiltinData {
    type Error = DataError;

    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let raw = Self::raw(config_name).ok_or_else(|| DataError::Unknown(config_name.to_string()))?;
        serde_json::from_str(raw).map_err(|source| DataError::Parse {
            name: config_name.to_string(),
            source,
        })
    }
}

/// Every catalog the game needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct GameData {
    pub items: ItemCatalog,
    pub skills: SkillTree,
    pub quests: QuestCatalog,
    pub rewards: RewardCalendar,
    pub chain: ChainConfig,
}

impl GameData {
    /// # Errors
    ///
    /// Returns the loader's error for the first catalog that fails.
    pub fn load<L: DataLoader>(loader: &L) -> Result<Self, L::Error> {
        Ok(Self {
            items: loader.load_config("items")?,
            skills: loader.load_config("skills")?,
            quests: loader.load_config("quests")?,
            rewards: loader.load_config("rewards")?,
            chain: loader.load_config("chain")?,
        })
    }

    /// Catalogs embedded at compile time.
    ///
    /// # Panics
    ///
    /// Panics if the embedded JSON is invalid, which the data tests rule out.
    #[must_use]
    pub fn builtin() -> Self {
        Self::load(&BuiltinData).expect("embedded catalogs are valid")
    }
}
