use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use scene_engine::{
    load_config_document, load_inventory_catalog, resolve_app_paths, ApplyItemRequest,
    ConfigDocument, ContentLoadError, GridCache, InventoryCatalog, MotionEvent, SceneEvent,
    SceneRuntime, StartupError,
};
use thiserror::Error;
use tracing::{error, info, warn};

use super::bootstrap::{AppWiring, LoopConfig};
use super::session::{parse_session, SessionCommand, SessionParseError};
use super::state_store::{StateFileError, StateStore, INITIAL_STATE_FILE};

#[derive(Debug, Error)]
pub(crate) enum HostError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    State(#[from] StateFileError),
    #[error("failed to read session script {path}: {source}")]
    ReadSession {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Session(#[from] SessionParseError),
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_session(app) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run_session(app: AppWiring) -> Result<(), HostError> {
    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), content = %paths.content_dir.display(), "app_paths_resolved");

    let mut config = load_or_default(load_config_document(&paths.config_path()), "config");
    if let Some(speed) = app.config.player_speed_override {
        config.player.speed = Some(speed);
    }
    let catalog = load_or_default(load_inventory_catalog(&paths.inventory_path()), "inventory");
    let store = StateStore::load_or_default(&paths.content_dir.join(INITIAL_STATE_FILE))?;
    let commands = parse_session(&read_session(app.session_path.as_deref())?)?;

    let mut cache = GridCache::new();
    let runtime = SceneRuntime::load(&paths.content_dir, &app.config.scene_id, &config, &mut cache);
    let mut host = Host::new(runtime, store, catalog, &app.config);
    info!(commands = commands.len(), "session_started");
    for command in commands {
        host.execute(command);
    }
    host.finish();
    Ok(())
}

fn load_or_default<T: Default>(result: Result<T, ContentLoadError>, document: &str) -> T {
    result.unwrap_or_else(|err| {
        warn!(document, error = %err, "content_document_unavailable_using_default");
        T::default()
    })
}

fn read_session(path: Option<&Path>) -> Result<String, HostError> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|source| HostError::ReadSession {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut script = String::new();
            io::stdin()
                .read_to_string(&mut script)
                .map_err(|source| HostError::ReadSession {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?;
            Ok(script)
        }
    }
}

struct Host {
    runtime: SceneRuntime,
    store: StateStore,
    catalog: InventoryCatalog,
    fixed_dt_seconds: f32,
    ticks: u64,
}

impl Host {
    fn new(
        runtime: SceneRuntime,
        store: StateStore,
        catalog: InventoryCatalog,
        config: &LoopConfig,
    ) -> Self {
        Self {
            runtime,
            store,
            catalog,
            fixed_dt_seconds: config.fixed_dt_seconds(),
            ticks: 0,
        }
    }

    fn execute(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Tick(count) => {
                for _ in 0..count {
                    self.tick();
                }
            }
            SessionCommand::Click(point) => {
                let disposition = self.runtime.click_at(point);
                info!(x = point.x, y = point.y, disposition = ?disposition, "pointer_click");
            }
            SessionCommand::Hover(point) => self.runtime.pointer_moved(point),
            SessionCommand::Use(id) => {
                let disposition = self.runtime.click_interaction(&id);
                info!(interaction = %id, disposition = ?disposition, "interaction_click");
            }
            SessionCommand::Apply(id, item) => {
                let item_id = self
                    .catalog
                    .item(item)
                    .map_or("<uncataloged>", |entry| entry.item_id.as_str());
                if !self.store.snapshot().inventory.has(item) {
                    warn!(interaction = %id, item = item.0, item_id, "apply_item_not_owned");
                    return;
                }
                let disposition = self.runtime.apply_item(ApplyItemRequest {
                    interaction_id: id.clone(),
                    item_index: item,
                });
                info!(
                    interaction = %id,
                    item = item.0,
                    item_id,
                    disposition = ?disposition,
                    "item_applied"
                );
            }
            SessionCommand::Ack => match self.runtime.acknowledge_dialog() {
                Some(mutation) => self.store.apply(&mutation),
                None => info!("dialog_acknowledged"),
            },
            SessionCommand::State => self.log_state(),
        }
    }

    fn tick(&mut self) {
        let report = self
            .runtime
            .update(self.fixed_dt_seconds, self.store.snapshot());
        self.ticks += 1;
        for event in &report.events {
            log_scene_event(self.ticks, event);
        }
    }

    fn log_state(&self) {
        let state = self.store.snapshot();
        let owned = self
            .catalog
            .owned_items(&state.inventory)
            .map(|item| item.item_id.as_str())
            .collect::<Vec<_>>();
        info!(
            tick = self.ticks,
            generation = self.store.generation(),
            game_state = %state.state_tag,
            owned_flags = state.inventory.owned_count(),
            owned_items = ?owned,
            position = ?self.runtime.player_position(),
            animation = self.runtime.player_animation(),
            background = ?self.runtime.active_background(),
            phase = ?self.runtime.phase(),
            "state_snapshot"
        );
    }

    fn finish(self) {
        let ticks = self.ticks;
        let generation = self.store.generation();
        for event in self.runtime.unload() {
            log_scene_event(ticks, &event);
        }
        info!(ticks, generation, "session_finished");
    }
}

fn log_scene_event(tick: u64, event: &SceneEvent) {
    let name = event.name();
    match event {
        SceneEvent::SoundtrackStarted { track } | SceneEvent::SoundtrackStopped { track } => {
            info!(tick, event = name, track = %track, "scene_event");
        }
        SceneEvent::BackgroundChanged { image } => {
            info!(tick, event = name, image = ?image, "scene_event");
        }
        SceneEvent::InteractionShown { id, idle_animation } => {
            info!(
                tick,
                event = name,
                interaction = %id,
                idle_animation = ?idle_animation.as_ref().map(|animation| animation.name.as_str()),
                "scene_event"
            );
        }
        SceneEvent::InteractionHoverStarted {
            id,
            hover_animation,
        } => {
            info!(
                tick,
                event = name,
                interaction = %id,
                hover_animation = ?hover_animation.as_ref().map(|animation| animation.name.as_str()),
                "scene_event"
            );
        }
        SceneEvent::InteractionHidden { id }
        | SceneEvent::InteractionHoverEnded { id }
        | SceneEvent::InteractionDisabled { id }
        | SceneEvent::IdleAnimationStopped { id }
        | SceneEvent::InteractionEnabled { id } => {
            info!(tick, event = name, interaction = %id, "scene_event");
        }
        SceneEvent::Motion(MotionEvent::MovingChanged(moving)) => {
            info!(tick, event = name, moving, "scene_event");
        }
        SceneEvent::Motion(MotionEvent::DirectionChanged(direction)) => {
            info!(
                tick,
                event = name,
                animation = direction.animation_type(),
                "scene_event"
            );
        }
        SceneEvent::PlayAnimation { id, animation }
        | SceneEvent::IdleAnimationRestored { id, animation } => {
            info!(
                tick,
                event = name,
                interaction = %id,
                spritesheet = %animation.spritesheet,
                animation = %animation.name,
                "scene_event"
            );
        }
        SceneEvent::PlaySound { key } => {
            info!(tick, event = name, sound = %key, "scene_event");
        }
        SceneEvent::ShowDialog {
            id,
            text,
            button_text,
        } => {
            info!(
                tick,
                event = name,
                interaction = %id,
                text = %text,
                button = %button_text,
                "scene_event"
            );
        }
        SceneEvent::StateMutation(mutation) => {
            info!(
                tick,
                event = name,
                inventory_set = ?mutation.inventory_set,
                game_state = ?mutation.state_tag_set,
                "scene_event"
            );
        }
        SceneEvent::InteractionCancelled { id, reason } => {
            info!(
                tick,
                event = name,
                interaction = %id,
                reason = reason.as_str(),
                "scene_event"
            );
        }
    }
}
