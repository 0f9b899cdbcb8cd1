//! Item definitions and the item catalog
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Add, AddAssign};
use thiserror::Error;

use crate::equipment::EquipmentSlot;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("duplicate catalog id: {0}")]
    Duplicate(String),
    #[error("invalid catalog entry {id}: {reason}")]
    Invalid { id: String, reason: String },
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Weapon,
    Helmet,
    Armor,
    Boots,
    Accessory,
    Consumable,
    Material,
}

impl ItemKind {
    /// Equipment slot this kind occupies; `None` for non-equippables.
    #[must_use]
    pub const fn slot(self) -> Option<EquipmentSlot> {
        match self {
            Self::Weapon => Some(EquipmentSlot::Weapon),
            Self::Helmet => Some(EquipmentSlot::Head),
            Self::Armor => Some(EquipmentSlot::Body),
            Self::Boots => Some(EquipmentSlot::Feet),
            Self::Accessory => Some(EquipmentSlot::Accessory),
            Self::Consumable | Self::Material => None,
        }
    }

    #[must_use]
    pub const fn is_equippable(self) -> bool {
        self.slot().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
        }
    }

    /// Higher sorts first in rarity-ordered views.
    #[must_use]
    pub const fn sort_value(self) -> u8 {
        match self {
            Self::Common => 0,
            Self::Uncommon => 1,
            Self::Rare => 2,
            Self::Epic => 3,
            Self::Legendary => 4,
        }
    }

    /// Resale multiplier applied to the catalog price, in percent.
    #[must_use]
    pub const fn sell_multiplier_pct(self) -> u64 {
        match self {
            Self::Common => 100,
            Self::Uncommon => 120,
            Self::Rare => 150,
            Self::Epic => 200,
            Self::Legendary => 300,
        }
    }
}

/// Additive combat stats. Used for class bases, gear, and skill bonuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    #[serde(default)]
    pub attack: i32,
    #[serde(default)]
    pub defense: i32,
    #[serde(default)]
    pub health: i32,
    #[serde(default)]
    pub speed: i32,
    #[serde(default)]
    pub luck: i32,
}

impl StatBlock {
    #[must_use]
    pub const fn new(attack: i32, defense: i32, health: i32, speed: i32, luck: i32) -> Self {
        Self {
            attack,
            defense,
            health,
            speed,
            luck,
        }
    }

    #[must_use]
    pub const fn scaled(self, factor: i32) -> Self {
        Self {
            attack: self.attack.saturating_mul(factor),
            defense: self.defense.saturating_mul(factor),
            health: self.health.saturating_mul(factor),
            speed: self.speed.saturating_mul(factor),
            luck: self.luck.saturating_mul(factor),
        }
    }

    /// Simple power rating for leaderboards and sorting.
    #[must_use]
    pub const fn power(self) -> i64 {
        self.attack as i64 * 2
            + self.defense as i64 * 2
            + self.health as i64 / 5
            + self.speed as i64
            + self.luck as i64
    }
}

impl Add for StatBlock {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            attack: self.attack.saturating_add(rhs.attack),
            defense: self.defense.saturating_add(rhs.defense),
            health: self.health.saturating_add(rhs.health),
            speed: self.speed.saturating_add(rhs.speed),
            luck: self.luck.saturating_add(rhs.luck),
        }
    }
}

impl AddAssign for StatBlock {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for StatBlock {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub kind: ItemKind,
    pub rarity: Rarity,
    #[serde(default)]
    pub stats: StatBlock,
    /// Shop price in gold; 0 means not sold in the shop.
    #[serde(default)]
    pub price: u64,
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    #[serde(default = "default_level_req")]
    pub level_req: u32,
}

const fn default_max_stack() -> u32 {
    1
}

const fn default_level_req() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    items: Vec<ItemDef>,
}

/// Validated, id-indexed item list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "CatalogFile")]
pub struct ItemCatalog {
    items: Vec<ItemDef>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TryFrom<CatalogFile> for ItemCatalog {
    type Error = CatalogError;

    fn try_from(file: CatalogFile) -> Result<Self, Self::Error> {
        Self::new(file.items)
    }
}

impl ItemCatalog {
    /// Build a catalog, rejecting duplicate ids and impossible entries.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate ids, zero stack sizes, or equippable
    /// items that stack.
    pub fn new(items: Vec<ItemDef>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if item.max_stack == 0 {
                return Err(CatalogError::Invalid {
                    id: item.id.clone(),
                    reason: "max_stack must be at least 1".into(),
                });
            }
            if item.kind.is_equippable() && item.max_stack != 1 {
                return Err(CatalogError::Invalid {
                    id: item.id.clone(),
                    reason: "equippable items cannot stack".into(),
                });
            }
            if index.insert(item.id.clone(), pos).is_some() {
                return Err(CatalogError::Duplicate(item.id.clone()));
            }
        }
        Ok(Self { items, index })
    }

    /// Parse a catalog from its JSON file form (`{"items": [...]}`).
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::try_from(file)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ItemDef> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    /// Look up an item or fail with `UnknownItem`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` when `id` is not in the catalog.
    pub fn require(&self, id: &str) -> Result<&ItemDef, CatalogError> {
        self.get(id)
            .ok_or_else(|| CatalogError::UnknownItem(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemDef> {
        self.items.iter()
    }

    pub fn by_kind(&self, kind: ItemKind) -> impl Iterator<Item = &ItemDef> {
        self.items.iter().filter(move |item| item.kind == kind)
    }

    /// Items the shop lists, cheapest first.
    #[must_use]
    pub fn shop_listing(&self) -> Vec<&ItemDef> {
        let mut listing: Vec<&ItemDef> = self.items.iter().filter(|i| i.price > 0).collect();
        listing.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.id.cmp(&b.id)));
        listing
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
