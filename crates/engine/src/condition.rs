use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::{ItemIndex, PersistentState};

/// Declarative gate over the persistent state. Every present clause must
/// agree with the state; a condition with no clauses always matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, rename = "game_state")]
    pub state_tag: Option<String>,
    #[serde(default, rename = "inventory")]
    pub inventory_flags: BTreeMap<ItemIndex, bool>,
}

impl Condition {
    pub fn state_tag(tag: impl Into<String>) -> Self {
        Self {
            state_tag: Some(tag.into()),
            inventory_flags: BTreeMap::new(),
        }
    }

    pub fn with_flag(mut self, index: ItemIndex, expected: bool) -> Self {
        self.inventory_flags.insert(index, expected);
        self
    }

    pub fn is_satisfied_by(&self, state: &PersistentState) -> bool {
        if let Some(tag) = &self.state_tag {
            if *tag != state.state_tag {
                return false;
            }
        }
        // Out-of-range indices read as `None` and therefore never match,
        // whatever the expected value.
        self.inventory_flags
            .iter()
            .all(|(index, expected)| state.inventory.get(*index) == Some(*expected))
    }
}

/// An absent condition always matches.
pub fn matches(condition: Option<&Condition>, state: &PersistentState) -> bool {
    condition.map_or(true, |condition| condition.is_satisfied_by(state))
}
