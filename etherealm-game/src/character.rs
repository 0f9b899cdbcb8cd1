//! Character NFTs as the game sees them: class, level, XP, and the local
//! roster cache of owned tokens.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{KEY_CHARACTERS, MAX_LEVEL, NAME_MAX_LEN, NAME_MIN_LEN, XP_BASE};
use crate::items::StatBlock;
use crate::storage::StoredBlob;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9 _-]+$").expect("name pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CharacterError {
    #[error("invalid character name '{0}'")]
    InvalidName(String),
    #[error("character #{0} is not in the roster")]
    UnknownCharacter(u64),
    #[error("no active character selected")]
    NoActiveCharacter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Warrior,
    Mage,
    Rogue,
    Ranger,
}

impl CharacterClass {
    pub const ALL: [Self; 4] = [Self::Warrior, Self::Mage, Self::Rogue, Self::Ranger];

    /// Numeric id used by the character contract.
    #[must_use]
    pub const fn contract_id(self) -> u8 {
        match self {
            Self::Warrior => 0,
            Self::Mage => 1,
            Self::Rogue => 2,
            Self::Ranger => 3,
        }
    }

    #[must_use]
    pub const fn from_contract_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Warrior),
            1 => Some(Self::Mage),
            2 => Some(Self::Rogue),
            3 => Some(Self::Ranger),
            _ => None,
        }
    }

    #[must_use]
    pub const fn base_stats(self) -> StatBlock {
        match self {
            Self::Warrior => StatBlock::new(12, 10, 120, 5, 3),
            Self::Mage => StatBlock::new(15, 4, 80, 6, 5),
            Self::Rogue => StatBlock::new(10, 6, 90, 12, 8),
            Self::Ranger => StatBlock::new(11, 7, 95, 9, 6),
        }
    }

    /// Stats gained per level above 1.
    #[must_use]
    pub const fn growth(self) -> StatBlock {
        match self {
            Self::Warrior => StatBlock::new(2, 2, 12, 0, 0),
            Self::Mage => StatBlock::new(3, 1, 7, 1, 0),
            Self::Rogue => StatBlock::new(2, 1, 8, 2, 1),
            Self::Ranger => StatBlock::new(2, 1, 9, 1, 1),
        }
    }
}

/// XP needed to advance from `level` to `level + 1`.
#[must_use]
pub fn xp_to_next(level: u32) -> u64 {
    let level = u64::from(level.max(1));
    XP_BASE.saturating_mul(level).saturating_mul(level)
}

/// Trim and validate a character name.
///
/// # Errors
///
/// Returns `InvalidName` for names outside the length limits or containing
/// characters other than letters, digits, space, `-` and `_`.
pub fn validate_name(name: &str) -> Result<String, CharacterError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) || !NAME_RE.is_match(trimmed) {
        return Err(CharacterError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub token_id: u64,
    pub name: String,
    pub class: CharacterClass,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Progress toward the next level.
    #[serde(default)]
    pub xp: u64,
    /// Evolution count recorded on-chain.
    #[serde(default)]
    pub generation: u8,
}

const fn default_level() -> u32 {
    1
}

impl Character {
    #[must_use]
    pub fn new(token_id: u64, name: impl Into<String>, class: CharacterClass) -> Self {
        Self {
            token_id,
            name: name.into(),
            class,
            level: 1,
            xp: 0,
            generation: 0,
        }
    }

    #[must_use]
    pub const fn is_max_level(&self) -> bool {
        self.level >= MAX_LEVEL
    }

    /// Add XP and apply any level-ups. Returns the number of levels gained.
    /// XP is discarded once the level cap is reached.
    pub fn gain_xp(&mut self, amount: u64) -> u32 {
        if self.is_max_level() {
            return 0;
        }
        let start = self.level;
        self.xp = self.xp.saturating_add(amount);
        while !self.is_max_level() && self.xp >= xp_to_next(self.level) {
            self.xp -= xp_to_next(self.level);
            self.level += 1;
        }
        if self.is_max_level() {
            self.xp = 0;
        }
        self.level - start
    }

    /// Class base stats with level growth and a per-generation bonus.
    #[must_use]
    pub fn base_stats(&self) -> StatBlock {
        let growth = self.class.growth();
        let levels = i32::try_from(self.level.saturating_sub(1)).unwrap_or(i32::MAX);
        self.class.base_stats()
            + growth.scaled(levels)
            + growth.scaled(i32::from(self.generation) * 2)
    }

    /// Effective stats once gear and skill bonuses are applied.
    #[must_use]
    pub fn combat_stats(&self, gear: StatBlock, skills: StatBlock) -> StatBlock {
        self.base_stats() + gear + skills
    }
}

/// Local cache of the wallet's character tokens plus the active selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub active: Option<u64>,
}

impl StoredBlob for Roster {
    const KEY: &'static str = KEY_CHARACTERS;
}

impl Roster {
    #[must_use]
    pub fn get(&self, token_id: u64) -> Option<&Character> {
        self.characters.iter().find(|c| c.token_id == token_id)
    }

    /// Insert or replace by token id, keeping the list sorted by id. The
    /// first character added becomes active.
    pub fn upsert(&mut self, character: Character) {
        let token_id = character.token_id;
        match self.characters.iter_mut().find(|c| c.token_id == token_id) {
            Some(existing) => *existing = character,
            None => {
                self.characters.push(character);
                self.characters.sort_by_key(|c| c.token_id);
            }
        }
        if self.active.is_none() {
            self.active = Some(token_id);
        }
    }

    /// Make `token_id` the active character.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCharacter` when the token is not cached.
    pub fn select_active(&mut self, token_id: u64) -> Result<(), CharacterError> {
        if self.get(token_id).is_none() {
            return Err(CharacterError::UnknownCharacter(token_id));
        }
        self.active = Some(token_id);
        Ok(())
    }

    #[must_use]
    pub fn active(&self) -> Option<&Character> {
        self.active.and_then(|id| self.get(id))
    }

    /// Mutable access to the active character.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveCharacter` when nothing is selected.
    pub fn active_mut(&mut self) -> Result<&mut Character, CharacterError> {
        let id = self.active.ok_or(CharacterError::NoActiveCharacter)?;
        self.characters
            .iter_mut()
            .find(|c| c.token_id == id)
            .ok_or(CharacterError::NoActiveCharacter)
    }

    /// Drop a token from the cache (sold or transferred away). The active
    /// selection falls back to the lowest remaining token.
    pub fn remove(&mut self, token_id: u64) -> Option<Character> {
        let pos = self.characters.iter().position(|c| c.token_id == token_id)?;
        let removed = self.characters.remove(pos);
        if self.active == Some(token_id) {
            self.active = self.characters.first().map(|c| c.token_id);
        }
        Some(removed)
    }
}
