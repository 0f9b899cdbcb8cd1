//! Worn gear, one item per slot.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::KEY_EQUIPMENT;
use crate::inventory::{Inventory, InventoryError};
use crate::items::{CatalogError, ItemCatalog, StatBlock};
use crate::storage::StoredBlob;

#[derive(Debug, Error)]
pub enum EquipmentError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("{0} cannot be equipped")]
    NotEquippable(String),
    #[error("{item} requires level {required} (current {current})")]
    LevelTooLow {
        item: String,
        required: u32,
        current: u32,
    },
    #[error("{0} is not in the inventory")]
    NotOwned(String),
    #[error("nothing equipped in {0:?}")]
    EmptySlot(EquipmentSlot),
    #[error("no room in the inventory for {0}")]
    InventoryFull(String),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    Head,
    Body,
    Feet,
    Accessory,
}

impl EquipmentSlot {
    pub const ALL: [Self; 5] = [
        Self::Weapon,
        Self::Head,
        Self::Body,
        Self::Feet,
        Self::Accessory,
    ];
}

/// Equipped item ids keyed by slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
    #[serde(default)]
    pub slots: BTreeMap<EquipmentSlot, String>,
}

impl StoredBlob for Loadout {
    const KEY: &'static str = KEY_EQUIPMENT;
}

impl Loadout {
    #[must_use]
    pub fn equipped(&self, slot: EquipmentSlot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    #[must_use]
    pub fn is_equipped(&self, item_id: &str) -> bool {
        self.slots.values().any(|id| id == item_id)
    }

    /// Move one `item_id` from the inventory into its slot. Whatever occupied
    /// the slot goes back to the inventory. Returns the replaced item id.
    ///
    /// # Errors
    ///
    /// Fails without changing anything when the item is unknown, not gear,
    /// above the character's level, or not owned.
    pub fn equip(
        &mut self,
        catalog: &ItemCatalog,
        inventory: &mut Inventory,
        item_id: &str,
        level: u32,
    ) -> Result<Option<String>, EquipmentError> {
        let def = catalog.require(item_id)?;
        let slot = def
            .kind
            .slot()
            .ok_or_else(|| EquipmentError::NotEquippable(item_id.to_string()))?;
        if level < def.level_req {
            return Err(EquipmentError::LevelTooLow {
                item: item_id.to_string(),
                required: def.level_req,
                current: level,
            });
        }
        if !inventory.has_item(item_id, 1) {
            return Err(EquipmentError::NotOwned(item_id.to_string()));
        }
        inventory.remove_item(item_id, 1)?;
        let previous = self.slots.insert(slot, item_id.to_string());
        if let Some(old) = previous.as_deref() {
            // Roll back if the replaced item cannot go back to the bag.
            if let Err(err) = inventory.add_item(catalog, old, 1) {
                self.slots.insert(slot, old.to_string());
                inventory.add_item(catalog, item_id, 1)?;
                log::warn!("could not return {old} to inventory: {err}");
                return Err(EquipmentError::InventoryFull(old.to_string()));
            }
        }
        log::debug!("equipped {item_id} in {slot:?}");
        Ok(previous)
    }

    /// Return the item in `slot` to the inventory.
    ///
    /// # Errors
    ///
    /// Fails when the slot is empty or the inventory has no room.
    pub fn unequip(
        &mut self,
        catalog: &ItemCatalog,
        inventory: &mut Inventory,
        slot: EquipmentSlot,
    ) -> Result<String, EquipmentError> {
        let item_id = self
            .slots
            .get(&slot)
            .cloned()
            .ok_or(EquipmentError::EmptySlot(slot))?;
        if !inventory.fits(catalog, &item_id, 1)? {
            return Err(EquipmentError::InventoryFull(item_id));
        }
        inventory.add_item(catalog, &item_id, 1)?;
        self.slots.remove(&slot);
        Ok(item_id)
    }

    /// Sum of stats from every equipped item still present in the catalog.
    #[must_use]
    pub fn total_stats(&self, catalog: &ItemCatalog) -> StatBlock {
        self.slots
            .values()
            .filter_map(|id| catalog.get(id))
            .map(|def| def.stats)
            .sum()
    }
}
