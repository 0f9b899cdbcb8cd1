//! Gold shop: buying from the catalog price list and selling back.
use thiserror::Error;

use crate::constants::{SELL_RATIO_PCT, UNPRICED_BASE_VALUE};
use crate::inventory::{Inventory, InventoryError};
use crate::items::{CatalogError, ItemCatalog, ItemDef};

#[derive(Debug, Error)]
pub enum ShopError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("{0} is not sold in the shop")]
    NotForSale(String),
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("price overflow")]
    Overflow,
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// Gold cost of `qty` units.
///
/// # Errors
///
/// Returns an error if the item is not for sale or the total overflows.
pub fn quote_buy(def: &ItemDef, qty: u32) -> Result<u64, ShopError> {
    if def.price == 0 {
        return Err(ShopError::NotForSale(def.id.clone()));
    }
    def.price
        .checked_mul(u64::from(qty))
        .ok_or(ShopError::Overflow)
}

/// Gold paid per unit when selling: the rarity-adjusted price scaled by the
/// sell ratio, never below 1.
#[must_use]
pub fn unit_sell_price(def: &ItemDef) -> u64 {
    let base = if def.price == 0 {
        UNPRICED_BASE_VALUE
    } else {
        def.price
    };
    let adjusted = base
        .saturating_mul(def.rarity.sell_multiplier_pct())
        .saturating_mul(SELL_RATIO_PCT)
        / 10_000;
    adjusted.max(1)
}

#[must_use]
pub fn quote_sell(def: &ItemDef, qty: u32) -> u64 {
    unit_sell_price(def).saturating_mul(u64::from(qty))
}

/// Buy `qty` of `item_id`. Gold is only spent when every unit fits.
/// Returns the gold paid.
///
/// # Errors
///
/// Fails without changes on unknown or unlisted items, insufficient gold, or a
/// full inventory.
pub fn buy(
    catalog: &ItemCatalog,
    inventory: &mut Inventory,
    item_id: &str,
    qty: u32,
) -> Result<u64, ShopError> {
    if qty == 0 {
        return Err(ShopError::ZeroQuantity);
    }
    let def = catalog.require(item_id)?;
    let total = quote_buy(def, qty)?;
    if inventory.gold < total {
        return Err(InventoryError::NotEnoughGold {
            have: inventory.gold,
            need: total,
        }
        .into());
    }
    if !inventory.fits(catalog, item_id, qty)? {
        return Err(InventoryError::Full {
            item: item_id.to_string(),
            needed: inventory.slots_needed(catalog, item_id, qty)?,
            free: inventory.free_slots(),
        }
        .into());
    }
    inventory.spend_gold(total)?;
    inventory.add_item(catalog, item_id, qty)?;
    log::debug!("bought {qty}x {item_id} for {total}");
    Ok(total)
}

/// Sell `qty` of `item_id` from the inventory. Returns the gold received.
///
/// # Errors
///
/// Fails without changes on unknown items or when fewer than `qty` are held.
pub fn sell(
    catalog: &ItemCatalog,
    inventory: &mut Inventory,
    item_id: &str,
    qty: u32,
) -> Result<u64, ShopError> {
    if qty == 0 {
        return Err(ShopError::ZeroQuantity);
    }
    let def = catalog.require(item_id)?;
    let payout = quote_sell(def, qty);
    inventory.remove_item(item_id, qty)?;
    inventory.add_gold(payout);
    Ok(payout)
}
