use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

pub const INVENTORY_SIZE: usize = 256;
pub const DEFAULT_STATE_TAG: &str = "village_start";

const INVENTORY_WORDS: usize = INVENTORY_SIZE / 64;

/// Bit position of an item in the inventory. Values at or above
/// [`INVENTORY_SIZE`] are representable so that content referencing them can
/// be loaded, but they never match and never mutate anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemIndex(pub u16);

/// Any integer is accepted. Negative or oversized values collapse onto
/// [`ItemIndex::OUT_OF_RANGE`] instead of failing the whole document.
impl<'de> Deserialize<'de> for ItemIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(u16::try_from(raw).map_or(ItemIndex::OUT_OF_RANGE, ItemIndex))
    }
}

impl ItemIndex {
    pub const OUT_OF_RANGE: ItemIndex = ItemIndex(u16::MAX);

    pub fn is_in_range(self) -> bool {
        (self.0 as usize) < INVENTORY_SIZE
    }
}

impl fmt::Display for ItemIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Inventory {
    bits: [u64; INVENTORY_WORDS],
}

impl Inventory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// `None` for indices outside the inventory.
    pub fn get(&self, index: ItemIndex) -> Option<bool> {
        let (word, mask) = bit_location(index)?;
        Some(self.bits[word] & mask != 0)
    }

    pub fn has(&self, index: ItemIndex) -> bool {
        self.get(index).unwrap_or(false)
    }

    /// Returns `false` and leaves the set untouched when `index` is out of range.
    pub fn set(&mut self, index: ItemIndex, value: bool) -> bool {
        let Some((word, mask)) = bit_location(index) else {
            return false;
        };
        if value {
            self.bits[word] |= mask;
        } else {
            self.bits[word] &= !mask;
        }
        true
    }

    pub fn owned(&self) -> impl Iterator<Item = ItemIndex> + '_ {
        (0..INVENTORY_SIZE as u16)
            .map(ItemIndex)
            .filter(|index| self.has(*index))
    }

    pub fn owned_count(&self) -> u32 {
        self.bits.iter().map(|word| word.count_ones()).sum()
    }
}

fn bit_location(index: ItemIndex) -> Option<(usize, u64)> {
    if !index.is_in_range() {
        return None;
    }
    let raw = index.0 as usize;
    Some((raw / 64, 1u64 << (raw % 64)))
}

/// Snapshot of the externally owned game state. The engine reads it and
/// proposes [`MutationEvent`]s; only the owning store applies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentState {
    pub state_tag: String,
    pub inventory: Inventory,
}

impl Default for PersistentState {
    fn default() -> Self {
        Self {
            state_tag: DEFAULT_STATE_TAG.to_string(),
            inventory: Inventory::empty(),
        }
    }
}

impl PersistentState {
    pub fn new(state_tag: impl Into<String>, inventory: Inventory) -> Self {
        Self {
            state_tag: state_tag.into(),
            inventory,
        }
    }

    pub fn apply(&mut self, event: &MutationEvent) {
        for (index, value) in &event.inventory_set {
            if !self.inventory.set(*index, *value) {
                warn!(index = index.0, "mutation_inventory_index_out_of_range");
            }
        }
        if let Some(tag) = &event.state_tag_set {
            self.state_tag.clone_from(tag);
        }
    }

    pub fn applied(&self, event: &MutationEvent) -> Self {
        let mut next = self.clone();
        next.apply(event);
        next
    }
}

/// State change authored on a click outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMutation {
    #[serde(default, rename = "inventory")]
    pub inventory_sets: BTreeMap<ItemIndex, bool>,
    #[serde(default, rename = "game_state")]
    pub new_state_tag: Option<String>,
}

impl StateMutation {
    pub fn is_empty(&self) -> bool {
        self.inventory_sets.is_empty() && self.new_state_tag.is_none()
    }

    pub fn to_event(&self) -> MutationEvent {
        MutationEvent {
            inventory_set: self
                .inventory_sets
                .iter()
                .map(|(index, value)| (*index, *value))
                .collect(),
            state_tag_set: self.new_state_tag.clone(),
        }
    }
}

/// Mutation request delivered to the external store after a dialog has been
/// acknowledged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationEvent {
    pub inventory_set: Vec<(ItemIndex, bool)>,
    pub state_tag_set: Option<String>,
}
