//! Centralized balance and tuning constants for Etherealm game logic.
//!
//! Catalog content (items, skills, quests, rewards) lives in JSON data files;
//! the limits and curves here are only adjusted through reviewed code changes.

// Logging ------------------------------------------------------------------
pub(crate) const DEBUG_ENV_VAR: &str = "ETHEREALM_DEBUG_LOGS";

// Storage ------------------------------------------------------------------
pub const STORAGE_PREFIX: &str = "etherealm";
pub const GUEST_ACCOUNT: &str = "guest";
pub const GLOBAL_ACCOUNT: &str = "global";

pub const KEY_INVENTORY: &str = "inventory";
pub const KEY_EQUIPMENT: &str = "equipment";
pub const KEY_SKILLS: &str = "skills";
pub const KEY_CHARACTERS: &str = "characters";
pub const KEY_DAILY: &str = "daily";
pub const KEY_QUESTS: &str = "quests";
pub const KEY_FRIENDS: &str = "friends";
pub const KEY_GUILDS: &str = "guilds";
pub const KEY_LEADERBOARD: &str = "leaderboard";

// Inventory ----------------------------------------------------------------
pub const INVENTORY_CAPACITY: usize = 40;
pub const STARTING_GOLD: u64 = 100;

// Shop ---------------------------------------------------------------------
/// Fraction of the rarity-adjusted price refunded on sale, in percent.
pub const SELL_RATIO_PCT: u64 = 40;
/// Base resale value for items without a shop price.
pub const UNPRICED_BASE_VALUE: u64 = 5;

// Character progression ----------------------------------------------------
pub const MAX_LEVEL: u32 = 60;
pub const XP_BASE: u64 = 100;
pub const SKILL_POINTS_PER_LEVEL: u32 = 1;
pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 20;

// Daily ---------------------------------------------------------------------
pub const DAILY_QUEST_COUNT: usize = 3;
pub const MS_PER_DAY: i64 = 86_400_000;

// Leaderboard ---------------------------------------------------------------
pub const LEADERBOARD_CAPACITY: usize = 100;

// Social --------------------------------------------------------------------
pub const FRIEND_LIMIT: usize = 50;
pub const GUILD_NAME_MIN_LEN: usize = 3;
pub const GUILD_NAME_MAX_LEN: usize = 24;
pub const GUILD_TAG_MIN_LEN: usize = 2;
pub const GUILD_TAG_MAX_LEN: usize = 5;
pub const GUILD_MEMBER_LIMIT: usize = 30;
pub const GUILD_XP_PER_LEVEL: u64 = 1_000;

// Chain ---------------------------------------------------------------------
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;
pub const ABI_WORD: usize = 32;
