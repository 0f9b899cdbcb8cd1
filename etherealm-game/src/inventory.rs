//! Bag of item stacks plus the gold purse.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{INVENTORY_CAPACITY, KEY_INVENTORY, STARTING_GOLD};
use crate::items::{CatalogError, ItemCatalog};
use crate::storage::StoredBlob;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("inventory full: {item} needs {needed} free slots, {free} available")]
    Full {
        item: String,
        needed: usize,
        free: usize,
    },
    #[error("not enough {item}: have {have}, need {want}")]
    Insufficient { item: String, have: u32, want: u32 },
    #[error("not enough gold: have {have}, need {need}")]
    NotEnoughGold { have: u64, need: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_id: String,
    pub qty: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub stacks: Vec<ItemStack>,
    #[serde(default)]
    pub gold: u64,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

const fn default_capacity() -> usize {
    INVENTORY_CAPACITY
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            stacks: Vec::new(),
            gold: STARTING_GOLD,
            capacity: INVENTORY_CAPACITY,
        }
    }
}

impl StoredBlob for Inventory {
    const KEY: &'static str = KEY_INVENTORY;
}

impl Inventory {
    #[must_use]
    pub fn used_slots(&self) -> usize {
        self.stacks.len()
    }

    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.stacks.len())
    }

    /// Total quantity of `item_id` across all stacks.
    #[must_use]
    pub fn count(&self, item_id: &str) -> u32 {
        self.stacks
            .iter()
            .filter(|s| s.item_id == item_id)
            .map(|s| s.qty)
            .fold(0_u32, u32::saturating_add)
    }

    #[must_use]
    pub fn has_item(&self, item_id: &str, qty: u32) -> bool {
        self.count(item_id) >= qty
    }

    /// Number of new slots adding `qty` of `item_id` would open.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is not in the catalog.
    pub fn slots_needed(
        &self,
        catalog: &ItemCatalog,
        item_id: &str,
        qty: u32,
    ) -> Result<usize, InventoryError> {
        let max = catalog.require(item_id)?.max_stack;
        let room: u32 = self
            .stacks
            .iter()
            .filter(|s| s.item_id == item_id)
            .map(|s| max.saturating_sub(s.qty))
            .fold(0_u32, u32::saturating_add);
        let overflow = qty.saturating_sub(room);
        Ok(overflow.div_ceil(max) as usize)
    }

    /// Whether `qty` of `item_id` fits without evicting anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is not in the catalog.
    pub fn fits(&self, catalog: &ItemCatalog, item_id: &str, qty: u32) -> Result<bool, InventoryError> {
        Ok(self.slots_needed(catalog, item_id, qty)? <= self.free_slots())
    }

    /// Add items, topping up existing stacks before opening new ones.
    /// Nothing changes when the items do not all fit.
    ///
    /// # Errors
    ///
    /// Returns `Full` when capacity would be exceeded, or a catalog error for
    /// unknown items.
    pub fn add_item(
        &mut self,
        catalog: &ItemCatalog,
        item_id: &str,
        qty: u32,
    ) -> Result<(), InventoryError> {
        let needed = self.slots_needed(catalog, item_id, qty)?;
        if needed > self.free_slots() {
            return Err(InventoryError::Full {
                item: item_id.to_string(),
                needed,
                free: self.free_slots(),
            });
        }
        let max = catalog.require(item_id)?.max_stack;
        let mut remaining = qty;
        for stack in self.stacks.iter_mut().filter(|s| s.item_id == item_id) {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(max.saturating_sub(stack.qty));
            stack.qty += take;
            remaining -= take;
        }
        while remaining > 0 {
            let take = remaining.min(max);
            self.stacks.push(ItemStack {
                item_id: item_id.to_string(),
                qty: take,
            });
            remaining -= take;
        }
        Ok(())
    }

    /// Remove items, draining the most recently opened stacks first.
    ///
    /// # Errors
    ///
    /// Returns `Insufficient` (and changes nothing) when fewer than `qty` are
    /// held.
    pub fn remove_item(&mut self, item_id: &str, qty: u32) -> Result<(), InventoryError> {
        let have = self.count(item_id);
        if have < qty {
            return Err(InventoryError::Insufficient {
                item: item_id.to_string(),
                have,
                want: qty,
            });
        }
        let mut remaining = qty;
        for stack in self.stacks.iter_mut().rev().filter(|s| s.item_id == item_id) {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(stack.qty);
            stack.qty -= take;
            remaining -= take;
        }
        self.stacks.retain(|s| s.qty > 0);
        Ok(())
    }

    pub fn add_gold(&mut self, amount: u64) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Deduct gold.
    ///
    /// # Errors
    ///
    /// Returns `NotEnoughGold` when the purse is short.
    pub fn spend_gold(&mut self, amount: u64) -> Result<(), InventoryError> {
        if self.gold < amount {
            return Err(InventoryError::NotEnoughGold {
                have: self.gold,
                need: amount,
            });
        }
        self.gold -= amount;
        Ok(())
    }

    /// Order stacks rarest first, then by id; unknown ids sink to the end.
    pub fn sort_by_rarity(&mut self, catalog: &ItemCatalog) {
        self.stacks.sort_by(|a, b| {
            let rank = |s: &ItemStack| {
                catalog
                    .get(&s.item_id)
                    .map_or(0, |def| u16::from(def.rarity.sort_value()) + 1)
            };
            rank(b)
                .cmp(&rank(a))
                .then_with(|| a.item_id.cmp(&b.item_id))
                .then_with(|| b.qty.cmp(&a.qty))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::tests::fixture_catalog;
    use crate::storage::{MemoryStore, Namespace};

    #[test]
    fn default_inventory_starts_with_purse() {
        let inv = Inventory::default();
        assert_eq!(inv.gold, STARTING_GOLD);
        assert_eq!(inv.free_slots(), INVENTORY_CAPACITY);
    }

    #[test]
    fn stackables_fill_existing_stacks_first() {
        let catalog = fixture_catalog();
        let mut inv = Inventory::default();
        inv.add_item(&catalog, "health_potion", 15).unwrap();
        inv.add_item(&catalog, "health_potion", 10).unwrap();
        assert_eq!(inv.used_slots(), 2);
        assert_eq!(inv.stacks[0].qty, 20);
        assert_eq!(inv.stacks[1].qty, 5);
        assert_eq!(inv.count("health_potion"), 25);
    }

    #[test]
    fn full_inventory_rejects_without_partial_add() {
        let catalog = fixture_catalog();
        let mut inv = Inventory {
            capacity: 2,
            ..Inventory::default()
        };
        inv.add_item(&catalog, "iron_sword", 1).unwrap();
        let err = inv.add_item(&catalog, "health_potion", 25).unwrap_err();
        assert!(matches!(err, InventoryError::Full { needed: 2, free: 1, .. }));
        assert_eq!(inv.used_slots(), 1);
        assert_eq!(inv.count("health_potion"), 0);
    }

    #[test]
    fn remove_drains_and_drops_empty_stacks() {
        let catalog = fixture_catalog();
        let mut inv = Inventory::default();
        inv.add_item(&catalog, "health_potion", 25).unwrap();
        inv.remove_item("health_potion", 6).unwrap();
        assert_eq!(inv.used_slots(), 1);
        assert_eq!(inv.count("health_potion"), 19);

        let err = inv.remove_item("health_potion", 50).unwrap_err();
        assert!(matches!(err, InventoryError::Insufficient { have: 19, want: 50, .. }));
        assert_eq!(inv.count("health_potion"), 19);
    }

    #[test]
    fn unknown_items_are_rejected() {
        let catalog = fixture_catalog();
        let mut inv = Inventory::default();
        assert!(matches!(
            inv.add_item(&catalog, "ghost", 1),
            Err(InventoryError::Catalog(CatalogError::UnknownItem(_)))
        ));
    }

    #[test]
    fn gold_cannot_go_negative() {
        let mut inv = Inventory::default();
        inv.add_gold(50);
        inv.spend_gold(120).unwrap();
        assert_eq!(inv.gold, STARTING_GOLD + 50 - 120);
        assert!(matches!(
            inv.spend_gold(1_000),
            Err(InventoryError::NotEnoughGold { .. })
        ));
    }

    #[test]
    fn sort_puts_rarest_first() {
        let catalog = fixture_catalog();
        let mut inv = Inventory::default();
        inv.add_item(&catalog, "iron_sword", 1).unwrap();
        inv.add_item(&catalog, "iron_ore", 3).unwrap();
        inv.add_item(&catalog, "ember_blade", 1).unwrap();
        inv.stacks.push(ItemStack {
            item_id: "retired".into(),
            qty: 1,
        });
        inv.sort_by_rarity(&catalog);
        let order: Vec<&str> = inv.stacks.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(order, vec!["ember_blade", "iron_ore", "iron_sword", "retired"]);
    }

    #[test]
    fn inventory_persists_through_store() {
        let catalog = fixture_catalog();
        let store = MemoryStore::new();
        let ns = Namespace::guest();
        let mut inv = Inventory::load(&store, &ns);
        inv.add_item(&catalog, "iron_ore", 4).unwrap();
        inv.save(&store, &ns).unwrap();
        assert_eq!(Inventory::load(&store, &ns).count("iron_ore"), 4);
    }

    #[test]
    fn legacy_blob_without_capacity_gets_default() {
        let inv: Inventory = serde_json::from_str(r#"{"stacks":[],"gold":5}"#).unwrap();
        assert_eq!(inv.capacity, INVENTORY_CAPACITY);
        assert_eq!(inv.gold, 5);
    }
}
