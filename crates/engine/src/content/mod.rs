mod catalog;
mod fingerprint;
mod loader;
mod types;

pub use catalog::{CatalogError, InventoryCatalog, InventoryItem};
pub use fingerprint::mask_fingerprint;
pub use loader::{
    load_config_document, load_inventory_catalog, load_scene, load_scene_document,
    parse_json_document, scene_dir, validate_scene_document, ContentLoadError, LoadedScene,
    CONFIG_FILE, INVENTORY_FILE, SCENES_DIR, SCENE_DOCUMENT_FILE,
};
pub use types::{
    AnimationRef, Background, ClickOutcome, ConfigDocument, Interaction, InteractionId,
    PlayerAnimationDescriptor, PlayerConfig, SceneDocument, DEFAULT_DIALOG_BUTTON_TEXT,
    DEFAULT_HOTSPOT_RADIUS_PX,
};
