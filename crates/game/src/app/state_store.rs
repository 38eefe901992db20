use std::fs;
use std::path::{Path, PathBuf};

use scene_engine::{Inventory, ItemIndex, MutationEvent, PersistentState, DEFAULT_STATE_TAG};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const INITIAL_STATE_FILE: &str = "initial_state.json";

#[derive(Debug, Error)]
pub(crate) enum StateFileError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse state file {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk shape of a starting state: the tag plus the indices of owned
/// items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StateFile {
    #[serde(default = "default_game_state")]
    pub(crate) game_state: String,
    #[serde(default)]
    pub(crate) owned_items: Vec<ItemIndex>,
}

fn default_game_state() -> String {
    DEFAULT_STATE_TAG.to_string()
}

impl StateFile {
    fn into_state(self) -> PersistentState {
        let mut inventory = Inventory::empty();
        for index in self.owned_items {
            if !inventory.set(index, true) {
                warn!(index = index.0, "initial_state_item_out_of_range");
            }
        }
        PersistentState::new(self.game_state, inventory)
    }
}

/// Single writer of the persistent state. Every applied mutation bumps the
/// generation.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateStore {
    state: PersistentState,
    generation: u64,
}

impl StateStore {
    pub(crate) fn new(state: PersistentState) -> Self {
        Self {
            state,
            generation: 0,
        }
    }

    /// Reads `path` when it exists; otherwise starts from the default state.
    pub(crate) fn load_or_default(path: &Path) -> Result<Self, StateFileError> {
        if !path.is_file() {
            info!(path = %path.display(), "initial_state_default");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| StateFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file = parse_state_file(&raw, path)?;
        info!(
            path = %path.display(),
            game_state = %file.game_state,
            owned = file.owned_items.len(),
            "initial_state_loaded"
        );
        Ok(Self::new(file.into_state()))
    }

    pub(crate) fn snapshot(&self) -> &PersistentState {
        &self.state
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn apply(&mut self, event: &MutationEvent) {
        self.state.apply(event);
        self.generation += 1;
        info!(
            generation = self.generation,
            game_state = %self.state.state_tag,
            owned = self.state.inventory.owned_count(),
            "state_mutation_applied"
        );
    }
}

fn parse_state_file(raw: &str, path: &Path) -> Result<StateFile, StateFileError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, StateFile>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        StateFileError::Parse {
            path: path.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_starts_from_default_state() {
        let temp = TempDir::new().expect("tempdir");
        let store = StateStore::load_or_default(&temp.path().join(INITIAL_STATE_FILE))
            .expect("store");
        assert_eq!(store.snapshot(), &PersistentState::default());
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn loads_owned_items_and_reports_json_path_on_error() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join(INITIAL_STATE_FILE);
        fs::write(&path, r#"{"game_state": "dock", "owned_items": [1, 300, 7]}"#).expect("write");
        let store = StateStore::load_or_default(&path).expect("store");
        assert_eq!(store.snapshot().state_tag, "dock");
        assert_eq!(
            store.snapshot().inventory.owned().collect::<Vec<_>>(),
            vec![ItemIndex(1), ItemIndex(7)]
        );

        fs::write(&path, r#"{"owned_items": [1, "two"]}"#).expect("write");
        let error = StateStore::load_or_default(&path).expect_err("bad item");
        match error {
            StateFileError::Parse { json_path, .. } => assert_eq!(json_path, "owned_items[1]"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn applying_mutations_bumps_generation() {
        let mut store = StateStore::default();
        store.apply(&MutationEvent {
            inventory_set: vec![(ItemIndex(4), true)],
            state_tag_set: Some("after_statue".to_string()),
        });
        store.apply(&MutationEvent::default());
        assert_eq!(store.generation(), 2);
        assert_eq!(store.snapshot().state_tag, "after_statue");
        assert!(store.snapshot().inventory.has(ItemIndex(4)));
    }
}
