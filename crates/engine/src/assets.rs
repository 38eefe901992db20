use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::content::AnimationRef;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetKeyError {
    #[error("asset key must not be empty")]
    Empty,
    #[error("asset key must not start with '/'")]
    LeadingSlash,
    #[error("asset key must not contain backslashes")]
    Backslash,
    #[error("asset key must not contain '..'")]
    ParentTraversal,
}

/// Asset keys are paths relative to the content directory.
pub fn validate_asset_key(key: &str) -> Result<(), AssetKeyError> {
    if key.is_empty() {
        return Err(AssetKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(AssetKeyError::LeadingSlash);
    }
    if key.contains('\\') {
        return Err(AssetKeyError::Backslash);
    }
    if key.split('/').any(|segment| segment == "..") {
        return Err(AssetKeyError::ParentTraversal);
    }
    Ok(())
}

/// Answers whether presentation cues can be played, and resolves the
/// animations a registry rebuild needs. Resolution may finish on a later
/// frame; the runtime polls [`AssetResolver::is_resolved`] each update.
pub trait AssetResolver {
    fn has_animation(&self, animation: &AnimationRef) -> bool;
    fn has_sound(&self, key: &str) -> bool;
    fn begin_resolve(&mut self, generation: u64, animations: &[AnimationRef]);
    fn is_resolved(&self, generation: u64) -> bool;
}

/// Resolves keys against files under a content directory. Lookups are cached
/// and each missing key is warned about once.
#[derive(Debug)]
pub struct FsAssetResolver {
    content_dir: PathBuf,
    known: RefCell<HashMap<String, bool>>,
    warned_missing: RefCell<HashSet<String>>,
    resolved_generation: Option<u64>,
}

impl FsAssetResolver {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            known: RefCell::new(HashMap::new()),
            warned_missing: RefCell::new(HashSet::new()),
            resolved_generation: None,
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    fn exists(&self, key: &str) -> bool {
        if let Some(known) = self.known.borrow().get(key) {
            return *known;
        }
        let found = match validate_asset_key(key) {
            Ok(()) if self.content_dir.join(key).is_file() => true,
            Ok(()) => {
                self.warn_missing_once(key, "file_not_found");
                false
            }
            Err(error) => {
                self.warn_missing_once(key, &error.to_string());
                false
            }
        };
        self.known.borrow_mut().insert(key.to_string(), found);
        found
    }

    fn warn_missing_once(&self, key: &str, reason: &str) {
        if !self.warned_missing.borrow_mut().insert(key.to_string()) {
            return;
        }
        warn!(
            asset_key = key,
            content_dir = %self.content_dir.display(),
            reason = reason,
            "asset_missing_cue_skipped"
        );
    }
}

impl AssetResolver for FsAssetResolver {
    fn has_animation(&self, animation: &AnimationRef) -> bool {
        self.exists(&animation.spritesheet)
    }

    fn has_sound(&self, key: &str) -> bool {
        self.exists(key)
    }

    fn begin_resolve(&mut self, generation: u64, animations: &[AnimationRef]) {
        let available = animations
            .iter()
            .filter(|animation| self.has_animation(animation))
            .count();
        debug!(
            generation,
            requested = animations.len(),
            available,
            "assets_resolved"
        );
        self.resolved_generation = Some(generation);
    }

    fn is_resolved(&self, generation: u64) -> bool {
        self.resolved_generation
            .is_some_and(|resolved| resolved >= generation)
    }
}

/// In-memory catalog of available assets. In deferred mode a resolve stays
/// outstanding until [`MemoryAssetResolver::finish_pending`] is called, which
/// lets callers exercise rebuilds that span several frames.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetResolver {
    spritesheets: HashSet<String>,
    sounds: HashSet<String>,
    deferred: bool,
    pending_generation: Option<u64>,
    resolved_generation: Option<u64>,
    resolve_requests: Vec<u64>,
}

impl MemoryAssetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    pub fn with_spritesheet(mut self, spritesheet: impl Into<String>) -> Self {
        self.spritesheets.insert(spritesheet.into());
        self
    }

    pub fn with_sound(mut self, key: impl Into<String>) -> Self {
        self.sounds.insert(key.into());
        self
    }

    pub fn finish_pending(&mut self) -> Option<u64> {
        let generation = self.pending_generation.take()?;
        self.resolved_generation = Some(generation);
        Some(generation)
    }

    /// Generations passed to `begin_resolve`, oldest first.
    pub fn resolve_requests(&self) -> &[u64] {
        &self.resolve_requests
    }
}

impl AssetResolver for MemoryAssetResolver {
    fn has_animation(&self, animation: &AnimationRef) -> bool {
        self.spritesheets.contains(&animation.spritesheet)
    }

    fn has_sound(&self, key: &str) -> bool {
        self.sounds.contains(key)
    }

    fn begin_resolve(&mut self, generation: u64, _animations: &[AnimationRef]) {
        self.resolve_requests.push(generation);
        if self.deferred {
            self.pending_generation = Some(generation);
        } else {
            self.resolved_generation = Some(generation);
        }
    }

    fn is_resolved(&self, generation: u64) -> bool {
        self.resolved_generation
            .is_some_and(|resolved| resolved >= generation)
    }
}
