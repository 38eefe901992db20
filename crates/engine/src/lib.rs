use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod assets;
pub mod condition;
pub mod content;
pub mod events;
pub mod geometry;
pub mod interaction;
pub mod motion;
pub mod nav;
pub mod scene;
pub mod state;

pub use assets::{AssetResolver, FsAssetResolver, MemoryAssetResolver};
pub use condition::{matches, Condition};
pub use content::{
    load_config_document, load_inventory_catalog, AnimationRef, ClickOutcome, ConfigDocument,
    ContentLoadError, Interaction, InteractionId, InventoryCatalog, InventoryItem, SceneDocument,
    CONFIG_FILE, INVENTORY_FILE,
};
pub use events::{CancelReason, SceneEvent};
pub use geometry::{Vec2, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use interaction::{ClickDisposition, TriggerPhase};
pub use motion::{AgentMotionController, Direction, MotionEvent, IDLE_ANIMATION_TYPE};
pub use nav::{find_path, plan_path, CellCoord, PathResolution, WalkabilityGrid, WalkabilityMask};
pub use scene::{ApplyItemRequest, FrameReport, GridCache, SceneRuntime};
pub use state::{
    Inventory, ItemIndex, MutationEvent, PersistentState, StateMutation, DEFAULT_STATE_TAG,
    INVENTORY_SIZE,
};

pub const ROOT_ENV_VAR: &str = "ADVENTURE_ROOT";
pub const CONTENT_DIR_NAME: &str = "content";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub content_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let content_dir = root.join(CONTENT_DIR_NAME);
        Self { root, content_dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.content_dir.join(CONFIG_FILE)
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.content_dir.join(INVENTORY_FILE)
    }

    pub fn scene_dir(&self, scene_id: &str) -> PathBuf {
        content::scene_dir(&self.content_dir, scene_id)
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "ADVENTURE_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or content/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or content/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/adventure\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
    #[error("content directory is missing: {path}")]
    MissingContentDir { path: PathBuf },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let paths = AppPaths::from_root(root);
    if !paths.content_dir.is_dir() {
        return Err(StartupError::MissingContentDir {
            path: paths.content_dir,
        });
    }
    Ok(paths)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            find_root_from(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_content = path.join(CONTENT_DIR_NAME).is_dir();

    cargo_toml && (has_crates || has_content)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_repo_marker(&cwd.join("definitely_not_a_marker")));
    }

    #[test]
    fn root_walk_finds_nearest_marked_ancestor() {
        let temp = TempDir::new().expect("tempdir");
        let root = temp.path().join("game");
        let nested = root.join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested");
        fs::create_dir_all(root.join(CONTENT_DIR_NAME)).expect("content");
        fs::write(root.join("Cargo.toml"), "[workspace]\n").expect("cargo");

        let found = find_root_from(&nested).expect("root");
        assert_eq!(found, normalize_path(&root));
        assert!(find_root_from(temp.path()).is_none());
    }

    #[test]
    fn app_paths_lay_out_content_files() {
        let paths = AppPaths::from_root("/srv/adventure");
        assert_eq!(paths.content_dir, PathBuf::from("/srv/adventure/content"));
        assert_eq!(
            paths.config_path(),
            PathBuf::from("/srv/adventure/content/config.json")
        );
        assert_eq!(
            paths.scene_dir("village"),
            PathBuf::from("/srv/adventure/content/scenes/village")
        );
    }
}
