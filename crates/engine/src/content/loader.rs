use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::nav::{MaskError, WalkabilityMask};

use super::catalog::{CatalogError, InventoryCatalog, InventoryItem};
use super::types::{ConfigDocument, SceneDocument};

pub const SCENE_DOCUMENT_FILE: &str = "scene.json";
pub const SCENES_DIR: &str = "scenes";
pub const CONFIG_FILE: &str = "config.json";
pub const INVENTORY_FILE: &str = "inventory.json";

#[derive(Debug, Error)]
pub enum ContentLoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}{}: {source}", json_location(.json_path))]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Mask(#[from] MaskError),
    #[error("invalid content in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("invalid inventory catalog {path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}

fn json_location(json_path: &str) -> String {
    if json_path.is_empty() || json_path == "." {
        String::new()
    } else {
        format!(" at {json_path}")
    }
}

/// A scene document with its decoded walkability mask.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub document: SceneDocument,
    pub mask: WalkabilityMask,
    pub scene_dir: PathBuf,
}

pub fn parse_json_document<T: DeserializeOwned>(
    raw: &str,
    path: &Path,
) -> Result<T, ContentLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ContentLoadError::Parse {
            path: path.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}

fn read_text(path: &Path) -> Result<String, ContentLoadError> {
    fs::read_to_string(path).map_err(|source| ContentLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_scene_document(path: &Path) -> Result<SceneDocument, ContentLoadError> {
    let raw = read_text(path)?;
    let document = parse_json_document::<SceneDocument>(&raw, path)?;
    validate_scene_document(&document, path)?;
    Ok(document)
}

pub fn load_config_document(path: &Path) -> Result<ConfigDocument, ContentLoadError> {
    let raw = read_text(path)?;
    let config = parse_json_document::<ConfigDocument>(&raw, path)?;
    if let Some(speed) = config.player.speed {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(invalid(path, format!("player.speed must be positive, got {speed}")));
        }
    }
    let missing = config.missing_motion_types();
    if !missing.is_empty() {
        warn!(
            path = %path.display(),
            missing = ?missing,
            "config_missing_player_animations"
        );
    }
    Ok(config)
}

pub fn load_inventory_catalog(path: &Path) -> Result<InventoryCatalog, ContentLoadError> {
    let raw = read_text(path)?;
    let items = parse_json_document::<Vec<InventoryItem>>(&raw, path)?;
    InventoryCatalog::from_items(items).map_err(|source| ContentLoadError::Catalog {
        path: path.to_path_buf(),
        source,
    })
}

/// `<content_dir>/scenes/<scene_id>`
pub fn scene_dir(content_dir: &Path, scene_id: &str) -> PathBuf {
    content_dir.join(SCENES_DIR).join(scene_id)
}

/// Loads `scene.json` from `scene_dir` and the mask it names.
pub fn load_scene(scene_dir: &Path) -> Result<LoadedScene, ContentLoadError> {
    let document_path = scene_dir.join(SCENE_DOCUMENT_FILE);
    let document = load_scene_document(&document_path)?;
    let mask_path = scene_dir.join(&document.walkability_mask_image);
    let mask = WalkabilityMask::open(&mask_path)?;
    debug!(
        scene = %document.scene_id,
        mask = %mask_path.display(),
        width = mask.width(),
        height = mask.height(),
        "walkability_mask_loaded"
    );
    Ok(LoadedScene {
        document,
        mask,
        scene_dir: scene_dir.to_path_buf(),
    })
}

pub fn validate_scene_document(
    document: &SceneDocument,
    path: &Path,
) -> Result<(), ContentLoadError> {
    if document.scene_id.trim().is_empty() {
        return Err(invalid(path, "scene_id must not be empty"));
    }
    if document.walkability_mask_image.trim().is_empty() {
        return Err(invalid(path, "walkability_mask must not be empty"));
    }
    if !document.player_start.is_finite() {
        return Err(invalid(path, "player_position must be finite"));
    }

    let mut seen_ids = HashSet::new();
    for (index, interaction) in document.interactions.iter().enumerate() {
        let at = format!("interactions[{index}]");
        if interaction.id.as_str().trim().is_empty() {
            return Err(invalid(path, format!("{at}.id must not be empty")));
        }
        if !seen_ids.insert(interaction.id.as_str()) {
            return Err(invalid(
                path,
                format!("{at}.id '{}' is not unique in the scene", interaction.id),
            ));
        }
        if !interaction.position.is_finite() {
            return Err(invalid(path, format!("{at}.position must be finite")));
        }
        if interaction
            .walk_to_position
            .is_some_and(|point| !point.is_finite())
        {
            return Err(invalid(path, format!("{at}.walk_to must be finite")));
        }
        if !interaction.hotspot_radius.is_finite() || interaction.hotspot_radius < 0.0 {
            return Err(invalid(
                path,
                format!("{at}.hotspot_radius must be a non-negative number"),
            ));
        }

        let mut seen_guards = HashSet::new();
        for (outcome_index, outcome) in interaction.click_outcomes.iter().enumerate() {
            let Some(item) = outcome.required_item_used else {
                continue;
            };
            if !seen_guards.insert(item) {
                return Err(invalid(
                    path,
                    format!(
                        "{at}.click[{outcome_index}] repeats required_item {item} of an earlier outcome"
                    ),
                ));
            }
            if !item.is_in_range() {
                warn!(
                    path = %path.display(),
                    interaction = %interaction.id,
                    item = item.0,
                    "click_outcome_item_out_of_range"
                );
            }
        }
    }
    Ok(())
}

fn invalid(path: &Path, message: impl Into<String>) -> ContentLoadError {
    ContentLoadError::Invalid {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
