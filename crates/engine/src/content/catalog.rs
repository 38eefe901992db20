use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{Inventory, ItemIndex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_id: String,
    pub index: ItemIndex,
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("item '{item_id}' uses out-of-range inventory index {index}")]
    IndexOutOfRange { item_id: String, index: ItemIndex },
    #[error("inventory index {index} is used by more than one item")]
    DuplicateIndex { index: ItemIndex },
    #[error("item id '{item_id}' is defined more than once")]
    DuplicateItemId { item_id: String },
}

/// Item definitions for the inventory tray, keyed by their fixed bit index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryCatalog {
    items: Vec<InventoryItem>,
    by_index: HashMap<ItemIndex, usize>,
}

impl InventoryCatalog {
    pub fn from_items(items: Vec<InventoryItem>) -> Result<Self, CatalogError> {
        let mut by_index = HashMap::with_capacity(items.len());
        let mut seen_ids = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if !item.index.is_in_range() {
                return Err(CatalogError::IndexOutOfRange {
                    item_id: item.item_id.clone(),
                    index: item.index,
                });
            }
            if by_index.insert(item.index, position).is_some() {
                return Err(CatalogError::DuplicateIndex { index: item.index });
            }
            if seen_ids.insert(item.item_id.as_str(), position).is_some() {
                return Err(CatalogError::DuplicateItemId {
                    item_id: item.item_id.clone(),
                });
            }
        }
        Ok(Self { items, by_index })
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn item(&self, index: ItemIndex) -> Option<&InventoryItem> {
        self.by_index
            .get(&index)
            .and_then(|position| self.items.get(*position))
    }

    /// Items the player currently holds, in catalog order.
    pub fn owned_items<'a>(
        &'a self,
        inventory: &'a Inventory,
    ) -> impl Iterator<Item = &'a InventoryItem> {
        self.items.iter().filter(|item| inventory.has(item.index))
    }
}
