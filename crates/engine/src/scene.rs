use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::assets::{AssetResolver, FsAssetResolver};
use crate::content::{
    load_scene, mask_fingerprint, scene_dir, ConfigDocument, InteractionId, LoadedScene,
    SceneDocument,
};
use crate::events::SceneEvent;
use crate::geometry::Vec2;
use crate::interaction::{
    ClickDisposition, InteractionRegistry, TriggerContext, TriggerPhase, TriggerSequencer,
    VisibilityDelta,
};
use crate::motion::{
    AgentMotionController, PendingInteraction, DEFAULT_PLAYER_SPEED_PX, IDLE_ANIMATION_TYPE,
};
use crate::nav::{WalkabilityGrid, WalkabilityMask};
use crate::state::{ItemIndex, MutationEvent, PersistentState};

/// Drag-and-drop of an inventory item onto an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyItemRequest {
    pub interaction_id: InteractionId,
    pub item_index: ItemIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub events: Vec<SceneEvent>,
    pub player_position: Option<Vec2>,
    pub player_animation: &'static str,
}

/// Walkability grids keyed by the fingerprint of the mask they were built
/// from.
#[derive(Debug, Default)]
pub struct GridCache {
    grids: HashMap<String, Arc<WalkabilityGrid>>,
    hits: u64,
}

impl GridCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid_for(&mut self, mask: &WalkabilityMask) -> Arc<WalkabilityGrid> {
        let fingerprint = mask_fingerprint(mask);
        if let Some(grid) = self.grids.get(&fingerprint) {
            self.hits += 1;
            debug!(fingerprint = %fingerprint, "walkability_grid_cache_hit");
            return Arc::clone(grid);
        }
        let grid = Arc::new(WalkabilityGrid::build(mask));
        info!(
            fingerprint = %fingerprint,
            width = grid.width(),
            height = grid.height(),
            walkable = grid.walkable_cell_count(),
            "walkability_grid_built"
        );
        self.grids.insert(fingerprint, Arc::clone(&grid));
        grid
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}

struct LiveScene {
    document: SceneDocument,
    mask: WalkabilityMask,
    grid: Arc<WalkabilityGrid>,
    registry: InteractionRegistry,
    motion: AgentMotionController,
    sequencer: TriggerSequencer,
    assets: Box<dyn AssetResolver>,
    observed_state: Option<PersistentState>,
    background: Option<String>,
    hovered: Option<InteractionId>,
}

impl LiveScene {
    fn split(&mut self) -> (&mut TriggerSequencer, TriggerContext<'_>) {
        (
            &mut self.sequencer,
            TriggerContext {
                registry: &mut self.registry,
                motion: &mut self.motion,
                grid: &self.grid,
                assets: &*self.assets,
            },
        )
    }

    fn check_state(&mut self, state: &PersistentState, events: &mut Vec<SceneEvent>) {
        if self.observed_state.as_ref() == Some(state) {
            return;
        }
        self.observed_state = Some(state.clone());

        if let Some(request) = self.registry.request_rebuild(state) {
            self.assets
                .begin_resolve(request.generation, &request.animations);
        }

        let background = self
            .document
            .active_background(state)
            .map(|background| background.image.clone());
        if background != self.background {
            debug!(image = ?background, "background_selected");
            self.background = background.clone();
            events.push(SceneEvent::BackgroundChanged { image: background });
        }
    }

    fn poll_rebuild(&mut self, events: &mut Vec<SceneEvent>) {
        while let Some(generation) = self.registry.in_flight_generation() {
            if !self.assets.is_resolved(generation) {
                return;
            }
            let (delta, next) = self.registry.complete_rebuild(generation);
            self.report_visibility(delta, events);
            if let Some(next) = next {
                self.assets.begin_resolve(next.generation, &next.animations);
            }
        }
    }

    fn report_visibility(&mut self, delta: VisibilityDelta, events: &mut Vec<SceneEvent>) {
        for id in delta.hidden {
            if self.hovered.as_ref() == Some(&id) {
                self.hovered = None;
                events.push(SceneEvent::InteractionHoverEnded { id: id.clone() });
            }
            events.push(SceneEvent::InteractionHidden { id });
        }
        for id in delta.shown {
            let idle_animation = self
                .registry
                .get(&id)
                .and_then(|interaction| interaction.idle_animation.clone());
            events.push(SceneEvent::InteractionShown { id, idle_animation });
        }
    }
}

/// One loaded scene: registry, navigation, avatar motion and trigger
/// sequencing driven by a fixed per-frame order. A runtime without a scene
/// (failed load) accepts every call and reports nothing.
pub struct SceneRuntime {
    live: Option<LiveScene>,
    outbox: Vec<SceneEvent>,
}

impl SceneRuntime {
    pub fn empty() -> Self {
        Self {
            live: None,
            outbox: Vec::new(),
        }
    }

    /// Loads `<content_dir>/scenes/<scene_id>`. Any content error is logged
    /// and yields an empty runtime.
    pub fn load(
        content_dir: &Path,
        scene_id: &str,
        config: &ConfigDocument,
        cache: &mut GridCache,
    ) -> Self {
        let dir = scene_dir(content_dir, scene_id);
        match load_scene(&dir) {
            Ok(loaded) => {
                if loaded.document.scene_id != scene_id {
                    warn!(
                        requested = scene_id,
                        declared = %loaded.document.scene_id,
                        "scene_id_mismatch"
                    );
                }
                let assets = Box::new(FsAssetResolver::new(content_dir));
                Self::from_loaded(loaded, config, cache, assets)
            }
            Err(error) => {
                warn!(
                    scene = scene_id,
                    dir = %dir.display(),
                    error = %error,
                    "scene_load_failed_using_empty_scene"
                );
                Self::empty()
            }
        }
    }

    pub fn from_loaded(
        loaded: LoadedScene,
        config: &ConfigDocument,
        cache: &mut GridCache,
        assets: Box<dyn AssetResolver>,
    ) -> Self {
        let LoadedScene { document, mask, .. } = loaded;
        let grid = cache.grid_for(&mask);
        let speed = config.player.speed.unwrap_or(DEFAULT_PLAYER_SPEED_PX);
        let start = document.player_start;
        if !mask.is_walkable_at(start) {
            warn!(x = start.x, y = start.y, "player_start_not_walkable");
        }

        let mut outbox = Vec::new();
        if let Some(track) = &document.soundtrack {
            outbox.push(SceneEvent::SoundtrackStarted {
                track: track.clone(),
            });
        }
        info!(
            scene = %document.scene_id,
            interactions = document.interactions.len(),
            backgrounds = document.backgrounds.len(),
            speed,
            "scene_loaded"
        );

        let registry = InteractionRegistry::new(document.interactions.clone());
        Self {
            live: Some(LiveScene {
                document,
                mask,
                grid,
                registry,
                motion: AgentMotionController::new(start, speed),
                sequencer: TriggerSequencer::new(),
                assets,
                observed_state: None,
                background: None,
                hovered: None,
            }),
            outbox,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_none()
    }

    pub fn scene_id(&self) -> Option<&str> {
        self.live
            .as_ref()
            .map(|live| live.document.scene_id.as_str())
    }

    pub fn document(&self) -> Option<&SceneDocument> {
        self.live.as_ref().map(|live| &live.document)
    }

    pub fn registry(&self) -> Option<&InteractionRegistry> {
        self.live.as_ref().map(|live| &live.registry)
    }

    pub fn grid(&self) -> Option<&WalkabilityGrid> {
        self.live.as_ref().map(|live| live.grid.as_ref())
    }

    pub fn phase(&self) -> Option<&TriggerPhase> {
        self.live.as_ref().map(|live| live.sequencer.phase())
    }

    pub fn player_position(&self) -> Option<Vec2> {
        self.live.as_ref().map(|live| live.motion.position())
    }

    pub fn player_animation(&self) -> &'static str {
        self.live
            .as_ref()
            .map_or(IDLE_ANIMATION_TYPE, |live| live.motion.animation_type())
    }

    pub fn active_background(&self) -> Option<&str> {
        self.live
            .as_ref()
            .and_then(|live| live.background.as_deref())
    }

    /// Topmost visible, enabled interaction under `point`.
    pub fn hit_test(&self, point: Vec2) -> Option<&InteractionId> {
        self.live
            .as_ref()
            .and_then(|live| live.registry.hit_test(point))
            .map(|interaction| &interaction.id)
    }

    /// Pointer click: an interaction under the point takes the click,
    /// otherwise the avatar walks there.
    pub fn click_at(&mut self, point: Vec2) -> ClickDisposition {
        match self.hit_test(point).cloned() {
            Some(id) => self.click_interaction(&id),
            None => self.click_ground(point),
        }
    }

    /// Pointer movement. Hover start and end are reported only when the
    /// topmost interaction under the pointer changes.
    pub fn pointer_moved(&mut self, point: Vec2) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        let under = live.registry.hit_test(point).map(|interaction| {
            let hover_animation = interaction
                .hover_animation
                .clone()
                .filter(|animation| live.assets.has_animation(animation));
            (interaction.id.clone(), hover_animation)
        });
        if under.as_ref().map(|(id, _)| id) == live.hovered.as_ref() {
            return;
        }
        if let Some(id) = live.hovered.take() {
            self.outbox.push(SceneEvent::InteractionHoverEnded { id });
        }
        if let Some((id, hover_animation)) = under {
            debug!(interaction = %id, "interaction_hovered");
            live.hovered = Some(id.clone());
            self.outbox
                .push(SceneEvent::InteractionHoverStarted { id, hover_animation });
        }
    }

    pub fn click_ground(&mut self, point: Vec2) -> ClickDisposition {
        let Some(live) = self.live.as_mut() else {
            return ClickDisposition::Ignored;
        };
        let (sequencer, ctx) = live.split();
        sequencer.on_ground_click(ctx, point, &mut self.outbox)
    }

    pub fn click_interaction(&mut self, id: &InteractionId) -> ClickDisposition {
        self.trigger(PendingInteraction {
            interaction_id: id.clone(),
            applied_item: None,
        })
    }

    pub fn apply_item(&mut self, request: ApplyItemRequest) -> ClickDisposition {
        self.trigger(PendingInteraction {
            interaction_id: request.interaction_id,
            applied_item: Some(request.item_index),
        })
    }

    /// Closes the open dialog. The returned mutation is also reported as a
    /// [`SceneEvent::StateMutation`] in the next frame.
    pub fn acknowledge_dialog(&mut self) -> Option<MutationEvent> {
        let live = self.live.as_mut()?;
        live.sequencer
            .acknowledge(&mut live.registry, &mut self.outbox)
    }

    /// Advances one frame: state check, then motion, then sequencer
    /// resolution.
    pub fn update(&mut self, dt_seconds: f32, state: &PersistentState) -> FrameReport {
        let mut events = std::mem::take(&mut self.outbox);
        let Some(live) = self.live.as_mut() else {
            return FrameReport {
                events,
                player_position: None,
                player_animation: IDLE_ANIMATION_TYPE,
            };
        };

        live.check_state(state, &mut events);
        live.poll_rebuild(&mut events);

        let step = live.motion.tick(dt_seconds, &live.mask);
        events.extend(step.events.into_iter().map(SceneEvent::Motion));

        if let Some(outcome) = step.outcome {
            let (sequencer, ctx) = live.split();
            sequencer.on_motion_outcome(ctx, outcome, &mut events);
        }

        FrameReport {
            events,
            player_position: Some(live.motion.position()),
            player_animation: live.motion.animation_type(),
        }
    }

    /// Tears the scene down, returning any undelivered events followed by
    /// the soundtrack stop cue.
    pub fn unload(mut self) -> Vec<SceneEvent> {
        let mut events = std::mem::take(&mut self.outbox);
        if let Some(live) = self.live.take() {
            if let Some(track) = live.document.soundtrack {
                events.push(SceneEvent::SoundtrackStopped { track });
            }
            info!(scene = %live.document.scene_id, "scene_unloaded");
        }
        events
    }

    fn trigger(&mut self, request: PendingInteraction) -> ClickDisposition {
        let Some(live) = self.live.as_mut() else {
            return ClickDisposition::Ignored;
        };
        let (sequencer, ctx) = live.split();
        sequencer.on_click(ctx, request, &mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    use super::*;
    use crate::assets::MemoryAssetResolver;
    use crate::content::{parse_json_document, AnimationRef};
    use crate::events::CancelReason;
    use crate::motion::MotionEvent;
    use crate::state::Inventory;

    const DT: f32 = 1.0 / 60.0;

    fn open_mask(width: u32, height: u32) -> WalkabilityMask {
        WalkabilityMask::from_alpha(width, height, vec![0; (width * height) as usize])
            .expect("mask")
    }

    fn mask_with_wall(width: u32, height: u32, wall_x: std::ops::Range<u32>) -> WalkabilityMask {
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for _y in 0..height {
            for x in 0..width {
                alpha.push(if wall_x.contains(&x) { 255 } else { 0 });
            }
        }
        WalkabilityMask::from_alpha(width, height, alpha).expect("mask")
    }

    fn runtime(
        json: &str,
        mask: WalkabilityMask,
        assets: Box<dyn AssetResolver>,
    ) -> (SceneRuntime, GridCache) {
        let document =
            parse_json_document::<SceneDocument>(json, Path::new("scene.json")).expect("scene");
        let mut cache = GridCache::new();
        let runtime = SceneRuntime::from_loaded(
            LoadedScene {
                document,
                mask,
                scene_dir: PathBuf::from("scenes/test"),
            },
            &ConfigDocument::default(),
            &mut cache,
            assets,
        );
        (runtime, cache)
    }

    fn run_frames(
        runtime: &mut SceneRuntime,
        state: &PersistentState,
        frames: usize,
    ) -> Vec<SceneEvent> {
        let mut events = Vec::new();
        for _ in 0..frames {
            events.extend(runtime.update(DT, state).events);
        }
        events
    }

    fn visible_ids(runtime: &SceneRuntime) -> Vec<String> {
        runtime
            .registry()
            .expect("registry")
            .visible()
            .map(|interaction| interaction.id.to_string())
            .collect()
    }

    fn dialogs(events: &[SceneEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|event| match event {
                SceneEvent::ShowDialog { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    const VILLAGE_JSON: &str = r#"{
        "scene_id": "village",
        "soundtrack": "village_theme.mp3",
        "backgrounds": [
            {"image": "village_after.png", "condition": {"game_state": "after_statue"}},
            {"image": "village.png"}
        ],
        "player_position": {"x": 24, "y": 40},
        "walkability_mask": "walkable.png",
        "interactions": [
            {
                "id": "statue",
                "position": {"x": 200, "y": 40},
                "idle_animation": {"spritesheet": "statue.png", "name": "idle"},
                "condition": {"game_state": "village_start"},
                "click": [
                    {"dialog_text": "The statue crumbles.", "state_change": {"game_state": "after_statue"}}
                ]
            },
            {
                "id": "rubble",
                "position": {"x": 200, "y": 40},
                "condition": {"game_state": "after_statue"},
                "click": [{"dialog_text": "Just rubble now."}]
            }
        ]
    }"#;

    #[test]
    fn state_change_swaps_visible_interactions_and_background() {
        let (mut runtime, _) = runtime(
            VILLAGE_JSON,
            open_mask(320, 96),
            Box::new(MemoryAssetResolver::new()),
        );
        let mut state = PersistentState::default();

        let first = runtime.update(DT, &state);
        assert_eq!(
            first.events[0],
            SceneEvent::SoundtrackStarted {
                track: "village_theme.mp3".to_string()
            }
        );
        assert!(first.events.contains(&SceneEvent::BackgroundChanged {
            image: Some("village.png".to_string())
        }));
        assert!(first.events.contains(&SceneEvent::InteractionShown {
            id: InteractionId::new("statue"),
            idle_animation: Some(AnimationRef {
                spritesheet: "statue.png".to_string(),
                name: "idle".to_string(),
            }),
        }));
        assert_eq!(visible_ids(&runtime), vec!["statue"]);

        let statue = InteractionId::new("statue");
        assert_eq!(
            runtime.click_interaction(&statue),
            ClickDisposition::Resolving
        );
        let frame = runtime.update(DT, &state);
        assert_eq!(dialogs(&frame.events), vec!["The statue crumbles."]);

        let mutation = runtime.acknowledge_dialog().expect("mutation");
        state.apply(&mutation);
        let frame = runtime.update(DT, &state);
        assert!(frame
            .events
            .contains(&SceneEvent::StateMutation(mutation.clone())));
        assert!(frame.events.contains(&SceneEvent::InteractionHidden {
            id: statue.clone()
        }));
        assert!(frame.events.contains(&SceneEvent::InteractionShown {
            id: InteractionId::new("rubble"),
            idle_animation: None,
        }));
        assert!(frame.events.contains(&SceneEvent::BackgroundChanged {
            image: Some("village_after.png".to_string())
        }));
        assert_eq!(visible_ids(&runtime), vec!["rubble"]);
        assert_eq!(runtime.active_background(), Some("village_after.png"));

        let quiet = runtime.update(DT, &state);
        assert!(quiet.events.is_empty());

        let stopped = runtime.unload();
        assert_eq!(
            stopped,
            vec![SceneEvent::SoundtrackStopped {
                track: "village_theme.mp3".to_string()
            }]
        );
    }

    #[test]
    fn obstructed_walk_cancels_interaction_without_dialog_or_mutation() {
        let json = r#"{
            "scene_id": "gate",
            "player_position": {"x": 16, "y": 24},
            "walkability_mask": "walkable.png",
            "interactions": [
                {
                    "id": "gate",
                    "position": {"x": 150, "y": 24},
                    "walk_to": {"x": 136, "y": 24},
                    "click": [{"dialog_text": "Locked.", "state_change": {"game_state": "gate_seen"}}]
                }
            ]
        }"#;
        // A 6px wall inside a 16px column: the coarse grid keeps the column
        // walkable, so only the per-pixel check can stop the avatar.
        let (mut runtime, _) = runtime(
            json,
            mask_with_wall(160, 48, 72..78),
            Box::new(MemoryAssetResolver::new()),
        );
        let state = PersistentState::default();
        runtime.update(DT, &state);

        let gate = InteractionId::new("gate");
        assert_eq!(runtime.click_interaction(&gate), ClickDisposition::Walking);
        assert!(matches!(
            runtime.phase(),
            Some(TriggerPhase::WalkingToInteraction { .. })
        ));

        let events = run_frames(&mut runtime, &state, 120);
        assert!(events.contains(&SceneEvent::InteractionCancelled {
            id: gate.clone(),
            reason: CancelReason::Obstructed,
        }));
        assert_eq!(
            events.last(),
            Some(&SceneEvent::InteractionCancelled {
                id: gate,
                reason: CancelReason::Obstructed,
            })
        );
        assert!(dialogs(&events).is_empty());
        assert!(!events
            .iter()
            .any(|event| matches!(event, SceneEvent::StateMutation(_))));
        assert!(events.contains(&SceneEvent::Motion(MotionEvent::MovingChanged(false))));
        assert_eq!(runtime.phase(), Some(&TriggerPhase::Idle));
        assert!(runtime.player_position().expect("position").x < 72.0);
        assert!(runtime.acknowledge_dialog().is_none());
    }

    #[test]
    fn walk_to_beyond_solid_barrier_never_resolves() {
        let json = r#"{
            "scene_id": "gate",
            "player_position": {"x": 16, "y": 24},
            "walkability_mask": "walkable.png",
            "interactions": [
                {
                    "id": "gate",
                    "position": {"x": 150, "y": 24},
                    "walk_to": {"x": 136, "y": 24},
                    "click": [{"dialog_text": "Locked.", "state_change": {"game_state": "gate_seen"}}]
                }
            ]
        }"#;
        // Two whole grid columns are blocked, so the pathfinder can only get
        // next to the wall.
        let (mut runtime, _) = runtime(
            json,
            mask_with_wall(160, 48, 64..96),
            Box::new(MemoryAssetResolver::new()),
        );
        let state = PersistentState::default();
        runtime.update(DT, &state);

        let gate = InteractionId::new("gate");
        assert_eq!(runtime.click_interaction(&gate), ClickDisposition::Cancelled);
        assert_eq!(runtime.phase(), Some(&TriggerPhase::Idle));

        let events = run_frames(&mut runtime, &state, 300);
        assert_eq!(
            events.first(),
            Some(&SceneEvent::InteractionCancelled {
                id: gate,
                reason: CancelReason::Unreachable,
            })
        );
        assert!(dialogs(&events).is_empty());
        assert!(!events
            .iter()
            .any(|event| matches!(event, SceneEvent::StateMutation(_))));
        assert!(runtime.player_position().expect("position").x < 64.0);
        assert_eq!(runtime.phase(), Some(&TriggerPhase::Idle));
        assert!(runtime.acknowledge_dialog().is_none());
    }

    #[test]
    fn applied_items_select_distinct_outcomes() {
        let json = r#"{
            "scene_id": "well",
            "player_position": {"x": 24, "y": 24},
            "walkability_mask": "walkable.png",
            "interactions": [
                {
                    "id": "well",
                    "position": {"x": 120, "y": 24},
                    "click": [
                        {"dialog_text": "A deep well."},
                        {"required_item": 3, "dialog_text": "The bucket fills.",
                         "state_change": {"inventory": {"3": false, "10": true}}},
                        {"required_item": 5, "dialog_text": "The coin sinks.",
                         "state_change": {"inventory": {"5": false}, "game_state": "wished"}}
                    ]
                }
            ]
        }"#;
        let (mut runtime, _) = runtime(
            json,
            open_mask(160, 48),
            Box::new(MemoryAssetResolver::new()),
        );
        let mut inventory = Inventory::empty();
        inventory.set(ItemIndex(3), true);
        inventory.set(ItemIndex(5), true);
        let mut state = PersistentState::new("village_start", inventory);
        runtime.update(DT, &state);
        let well = InteractionId::new("well");

        runtime.apply_item(ApplyItemRequest {
            interaction_id: well.clone(),
            item_index: ItemIndex(3),
        });
        let first_dialog = dialogs(&runtime.update(DT, &state).events)
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let first = runtime.acknowledge_dialog().expect("first mutation");
        state.apply(&first);

        runtime.apply_item(ApplyItemRequest {
            interaction_id: well.clone(),
            item_index: ItemIndex(5),
        });
        let second_dialog = dialogs(&runtime.update(DT, &state).events)
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let second = runtime.acknowledge_dialog().expect("second mutation");
        state.apply(&second);

        assert_eq!(first_dialog, vec!["The bucket fills."]);
        assert_eq!(second_dialog, vec!["The coin sinks."]);
        assert_ne!(first, second);
        assert_eq!(
            first.inventory_set,
            vec![(ItemIndex(3), false), (ItemIndex(10), true)]
        );
        assert_eq!(second.state_tag_set.as_deref(), Some("wished"));
        assert!(state.inventory.has(ItemIndex(10)));
        assert!(!state.inventory.has(ItemIndex(5)));

        runtime.update(DT, &state);
        runtime.click_interaction(&well);
        let plain = runtime.update(DT, &state);
        assert_eq!(dialogs(&plain.events), vec!["A deep well."]);
        assert!(runtime.acknowledge_dialog().is_none());

        assert_eq!(
            runtime.apply_item(ApplyItemRequest {
                interaction_id: well,
                item_index: ItemIndex(7),
            }),
            ClickDisposition::Ignored
        );
    }

    struct SharedResolver(Rc<RefCell<MemoryAssetResolver>>);

    impl AssetResolver for SharedResolver {
        fn has_animation(&self, animation: &AnimationRef) -> bool {
            self.0.borrow().has_animation(animation)
        }

        fn has_sound(&self, key: &str) -> bool {
            self.0.borrow().has_sound(key)
        }

        fn begin_resolve(&mut self, generation: u64, animations: &[AnimationRef]) {
            self.0.borrow_mut().begin_resolve(generation, animations);
        }

        fn is_resolved(&self, generation: u64) -> bool {
            self.0.borrow().is_resolved(generation)
        }
    }

    #[test]
    fn state_changes_during_asset_resolution_are_serialized() {
        let shared = Rc::new(RefCell::new(MemoryAssetResolver::deferred()));
        let (mut runtime, _) = runtime(
            VILLAGE_JSON,
            open_mask(320, 96),
            Box::new(SharedResolver(Rc::clone(&shared))),
        );
        let start = PersistentState::default();
        let detour = PersistentState::new("detour", Inventory::empty());
        let after = PersistentState::new("after_statue", Inventory::empty());

        runtime.update(DT, &start);
        runtime.update(DT, &detour);
        runtime.update(DT, &after);
        assert_eq!(shared.borrow().resolve_requests(), &[1]);
        assert!(visible_ids(&runtime).is_empty());

        assert_eq!(shared.borrow_mut().finish_pending(), Some(1));
        let frame = runtime.update(DT, &after);
        assert!(frame.events.contains(&SceneEvent::InteractionShown {
            id: InteractionId::new("statue"),
            idle_animation: Some(AnimationRef {
                spritesheet: "statue.png".to_string(),
                name: "idle".to_string(),
            }),
        }));
        assert_eq!(shared.borrow().resolve_requests(), &[1, 2]);

        shared.borrow_mut().finish_pending();
        let frame = runtime.update(DT, &after);
        assert!(frame.events.contains(&SceneEvent::InteractionHidden {
            id: InteractionId::new("statue")
        }));
        assert_eq!(visible_ids(&runtime), vec!["rubble"]);
        assert_eq!(shared.borrow().resolve_requests(), &[1, 2]);
    }

    #[test]
    fn clicks_route_through_hit_test_and_cancel_superseded_walks() {
        let json = r#"{
            "scene_id": "yard",
            "player_position": {"x": 24, "y": 24},
            "walkability_mask": "walkable.png",
            "interactions": [
                {"id": "barrel", "position": {"x": 280, "y": 24}, "hotspot_radius": 10,
                 "walk_to": {"x": 264, "y": 24},
                 "click": [{"dialog_text": "Empty."}]}
            ]
        }"#;
        let (mut runtime, _) = runtime(
            json,
            open_mask(320, 64),
            Box::new(MemoryAssetResolver::new()),
        );
        let state = PersistentState::default();
        runtime.update(DT, &state);

        assert_eq!(
            runtime.hit_test(Vec2::new(285.0, 20.0)),
            Some(&InteractionId::new("barrel"))
        );
        assert_eq!(
            runtime.click_at(Vec2::new(285.0, 20.0)),
            ClickDisposition::Walking
        );
        assert_eq!(
            runtime.click_at(Vec2::new(100.0, 40.0)),
            ClickDisposition::Walking
        );
        let events = run_frames(&mut runtime, &state, 120);
        assert_eq!(
            events[0],
            SceneEvent::InteractionCancelled {
                id: InteractionId::new("barrel"),
                reason: CancelReason::Superseded,
            }
        );
        assert!(dialogs(&events).is_empty());
        assert_eq!(runtime.player_animation(), IDLE_ANIMATION_TYPE);
    }

    #[test]
    fn pointer_movement_reports_hover_transitions_once() {
        let json = r#"{
            "scene_id": "square",
            "player_position": {"x": 16, "y": 16},
            "walkability_mask": "walkable.png",
            "interactions": [
                {"id": "lamp", "position": {"x": 100, "y": 40}, "hotspot_radius": 20,
                 "hover_animation": {"spritesheet": "lamp.png", "name": "glow"},
                 "click": [{"dialog_text": "A lamp."}]},
                {"id": "sign", "position": {"x": 200, "y": 40}, "hotspot_radius": 20,
                 "hover_animation": {"spritesheet": "missing.png", "name": "wobble"},
                 "click": [{"dialog_text": "A sign."}]}
            ]
        }"#;
        let (mut runtime, _) = runtime(
            json,
            open_mask(320, 96),
            Box::new(MemoryAssetResolver::new().with_spritesheet("lamp.png")),
        );
        let state = PersistentState::default();
        runtime.update(DT, &state);
        let lamp = InteractionId::new("lamp");
        let sign = InteractionId::new("sign");

        runtime.pointer_moved(Vec2::new(105.0, 42.0));
        runtime.pointer_moved(Vec2::new(98.0, 38.0));
        assert_eq!(
            runtime.update(DT, &state).events,
            vec![SceneEvent::InteractionHoverStarted {
                id: lamp.clone(),
                hover_animation: Some(AnimationRef {
                    spritesheet: "lamp.png".to_string(),
                    name: "glow".to_string(),
                }),
            }]
        );

        runtime.pointer_moved(Vec2::new(200.0, 40.0));
        assert_eq!(
            runtime.update(DT, &state).events,
            vec![
                SceneEvent::InteractionHoverEnded { id: lamp },
                SceneEvent::InteractionHoverStarted {
                    id: sign.clone(),
                    hover_animation: None,
                },
            ]
        );

        runtime.pointer_moved(Vec2::new(300.0, 90.0));
        runtime.pointer_moved(Vec2::new(301.0, 90.0));
        assert_eq!(
            runtime.update(DT, &state).events,
            vec![SceneEvent::InteractionHoverEnded { id: sign }]
        );
    }

    #[test]
    fn identical_masks_share_a_cached_grid() {
        let mut cache = GridCache::new();
        let a = cache.grid_for(&open_mask(64, 32));
        let b = cache.grid_for(&open_mask(64, 32));
        let c = cache.grid_for(&open_mask(32, 32));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn missing_scene_degrades_to_empty_runtime() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let mut cache = GridCache::new();
        let mut runtime =
            SceneRuntime::load(temp.path(), "nowhere", &ConfigDocument::default(), &mut cache);
        assert!(runtime.is_empty());
        assert_eq!(
            runtime.click_at(Vec2::new(10.0, 10.0)),
            ClickDisposition::Ignored
        );
        let frame = runtime.update(DT, &PersistentState::default());
        assert!(frame.events.is_empty());
        assert!(frame.player_position.is_none());
        assert!(runtime.acknowledge_dialog().is_none());
        assert!(runtime.unload().is_empty());
    }
}
