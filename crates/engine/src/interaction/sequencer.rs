use tracing::{debug, info};

use crate::assets::AssetResolver;
use crate::content::{ClickOutcome, Interaction, InteractionId};
use crate::events::{CancelReason, SceneEvent};
use crate::geometry::Vec2;
use crate::motion::{AgentMotionController, MotionOutcome, PendingInteraction};
use crate::nav::{plan_path, PathResolution, WalkabilityGrid};
use crate::state::{MutationEvent, StateMutation};

use super::registry::InteractionRegistry;

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerPhase {
    Idle,
    WalkingToInteraction {
        pending: PendingInteraction,
    },
    /// Dialog is on screen; the mutation waits for acknowledgment.
    Resolving {
        interaction_id: InteractionId,
        outcome_index: usize,
        mutation: Option<StateMutation>,
    },
}

/// Collaborators a trigger needs for one call.
pub struct TriggerContext<'a> {
    pub registry: &'a mut InteractionRegistry,
    pub motion: &'a mut AgentMotionController,
    pub grid: &'a WalkabilityGrid,
    pub assets: &'a dyn AssetResolver,
}

/// What became of a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickDisposition {
    Walking,
    Resolving,
    Cancelled,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct TriggerSequencer {
    phase: TriggerPhase,
}

impl Default for TriggerSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerSequencer {
    pub fn new() -> Self {
        Self {
            phase: TriggerPhase::Idle,
        }
    }

    pub fn phase(&self) -> &TriggerPhase {
        &self.phase
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self.phase, TriggerPhase::Resolving { .. })
    }

    /// Plain ground click: walk there, dropping any walk toward an
    /// interaction. Ignored while a dialog is open.
    pub fn on_ground_click(
        &mut self,
        ctx: TriggerContext<'_>,
        target: Vec2,
        events: &mut Vec<SceneEvent>,
    ) -> ClickDisposition {
        if self.is_resolving() {
            debug!(x = target.x, y = target.y, "ground_click_ignored_while_resolving");
            return ClickDisposition::Ignored;
        }
        let path = plan_path(ctx.grid, ctx.motion.position(), target);
        debug!(
            x = target.x,
            y = target.y,
            waypoints = path.len(),
            resolution = ?path.resolution(),
            "ground_path_planned"
        );
        let superseded = ctx.motion.set_path(path, None);
        self.cancel_superseded(superseded, events);
        self.phase = TriggerPhase::Idle;
        ClickDisposition::Walking
    }

    /// Click on an interaction, optionally with an item applied to it.
    pub fn on_click(
        &mut self,
        ctx: TriggerContext<'_>,
        request: PendingInteraction,
        events: &mut Vec<SceneEvent>,
    ) -> ClickDisposition {
        if self.is_resolving() {
            debug!(
                interaction = %request.interaction_id,
                "interaction_click_ignored_while_resolving"
            );
            return ClickDisposition::Ignored;
        }
        if !ctx.registry.is_enabled(&request.interaction_id) {
            debug!(
                interaction = %request.interaction_id,
                "interaction_click_ignored_unavailable"
            );
            return ClickDisposition::Ignored;
        }
        let Some(interaction) = ctx.registry.get(&request.interaction_id) else {
            return ClickDisposition::Ignored;
        };
        if interaction.select_outcome(request.applied_item).is_none() {
            debug!(
                interaction = %request.interaction_id,
                applied_item = ?request.applied_item.map(|item| item.0),
                "interaction_click_ignored_no_outcome"
            );
            return ClickDisposition::Ignored;
        }

        let Some(walk_to) = interaction.walk_to_position else {
            let superseded = ctx.motion.stop();
            self.cancel_superseded(superseded, events);
            self.phase = TriggerPhase::Idle;
            return self.resolve(ctx, &request, events);
        };

        let path = plan_path(ctx.grid, ctx.motion.position(), walk_to);
        if path.is_empty() {
            let already_there = ctx.grid.cell_at(ctx.motion.position()) == ctx.grid.cell_at(walk_to);
            let superseded = ctx.motion.set_path(path, None);
            self.cancel_superseded(superseded, events);
            self.phase = TriggerPhase::Idle;
            if already_there {
                return self.resolve(ctx, &request, events);
            }
            info!(
                interaction = %request.interaction_id,
                "interaction_walk_unreachable"
            );
            events.push(SceneEvent::InteractionCancelled {
                id: request.interaction_id,
                reason: CancelReason::Unreachable,
            });
            return ClickDisposition::Cancelled;
        }

        if path.resolution() != Some(PathResolution::Reached) {
            // Walk as close as the terrain allows, but the interaction itself
            // only fires from its walk-to spot.
            info!(
                interaction = %request.interaction_id,
                waypoints = path.len(),
                "interaction_walk_unreachable_moving_closer"
            );
            let superseded = ctx.motion.set_path(path, None);
            self.cancel_superseded(superseded, events);
            self.phase = TriggerPhase::Idle;
            events.push(SceneEvent::InteractionCancelled {
                id: request.interaction_id,
                reason: CancelReason::Unreachable,
            });
            return ClickDisposition::Cancelled;
        }

        debug!(
            interaction = %request.interaction_id,
            waypoints = path.len(),
            "interaction_walk_started"
        );
        let superseded = ctx.motion.set_path(path, Some(request.clone()));
        self.cancel_superseded(superseded, events);
        self.phase = TriggerPhase::WalkingToInteraction { pending: request };
        ClickDisposition::Walking
    }

    /// Feeds the outcome of a motion tick. Arrival with a latched interaction
    /// resolves it; an obstruction cancels it.
    pub fn on_motion_outcome(
        &mut self,
        ctx: TriggerContext<'_>,
        outcome: MotionOutcome,
        events: &mut Vec<SceneEvent>,
    ) {
        match outcome {
            MotionOutcome::Arrived { pending: None }
            | MotionOutcome::Obstructed {
                abandoned: None, ..
            } => {}
            MotionOutcome::Arrived {
                pending: Some(pending),
            } => {
                self.phase = TriggerPhase::Idle;
                if !ctx.registry.is_enabled(&pending.interaction_id) {
                    info!(
                        interaction = %pending.interaction_id,
                        "interaction_unavailable_on_arrival"
                    );
                    events.push(SceneEvent::InteractionCancelled {
                        id: pending.interaction_id,
                        reason: CancelReason::Unavailable,
                    });
                    return;
                }
                self.resolve(ctx, &pending, events);
            }
            MotionOutcome::Obstructed {
                at,
                abandoned: Some(abandoned),
            } => {
                info!(
                    interaction = %abandoned.interaction_id,
                    x = at.x,
                    y = at.y,
                    "interaction_walk_obstructed"
                );
                self.phase = TriggerPhase::Idle;
                events.push(SceneEvent::InteractionCancelled {
                    id: abandoned.interaction_id,
                    reason: CancelReason::Obstructed,
                });
            }
        }
    }

    /// Closes the open dialog: emits the outcome's mutation, restores the
    /// idle animation and re-enables the interaction. `None` when no dialog
    /// is open or the outcome mutates nothing.
    pub fn acknowledge(
        &mut self,
        registry: &mut InteractionRegistry,
        events: &mut Vec<SceneEvent>,
    ) -> Option<MutationEvent> {
        let (interaction_id, outcome_index, mutation) =
            match std::mem::replace(&mut self.phase, TriggerPhase::Idle) {
                TriggerPhase::Resolving {
                    interaction_id,
                    outcome_index,
                    mutation,
                } => (interaction_id, outcome_index, mutation),
                other => {
                    debug!("dialog_acknowledge_ignored");
                    self.phase = other;
                    return None;
                }
            };

        let event = mutation
            .filter(|mutation| !mutation.is_empty())
            .map(|mutation| mutation.to_event());
        if let Some(event) = &event {
            events.push(SceneEvent::StateMutation(event.clone()));
        }
        if let Some(animation) = registry
            .get(&interaction_id)
            .and_then(|interaction| interaction.idle_animation.clone())
        {
            events.push(SceneEvent::IdleAnimationRestored {
                id: interaction_id.clone(),
                animation,
            });
        }
        registry.set_enabled(&interaction_id, true);
        info!(
            interaction = %interaction_id,
            outcome = outcome_index,
            mutates = event.is_some(),
            "interaction_resolved"
        );
        events.push(SceneEvent::InteractionEnabled { id: interaction_id });
        event
    }

    fn resolve(
        &mut self,
        ctx: TriggerContext<'_>,
        request: &PendingInteraction,
        events: &mut Vec<SceneEvent>,
    ) -> ClickDisposition {
        let Some(interaction) = ctx.registry.get(&request.interaction_id) else {
            return ClickDisposition::Ignored;
        };
        let Some((outcome_index, outcome)) = interaction.select_outcome(request.applied_item)
        else {
            return ClickDisposition::Ignored;
        };
        let id = interaction.id.clone();
        let cues = resolution_cues(interaction, outcome, ctx.assets);
        let mutation = outcome.state_mutation.clone();

        ctx.registry.set_enabled(&id, false);
        events.push(SceneEvent::InteractionDisabled { id: id.clone() });
        events.extend(cues);
        debug!(
            interaction = %id,
            outcome = outcome_index,
            applied_item = ?request.applied_item.map(|item| item.0),
            "interaction_resolving"
        );
        self.phase = TriggerPhase::Resolving {
            interaction_id: id,
            outcome_index,
            mutation,
        };
        ClickDisposition::Resolving
    }

    fn cancel_superseded(
        &mut self,
        superseded: Option<PendingInteraction>,
        events: &mut Vec<SceneEvent>,
    ) {
        if let Some(superseded) = superseded {
            debug!(
                interaction = %superseded.interaction_id,
                "interaction_walk_superseded"
            );
            events.push(SceneEvent::InteractionCancelled {
                id: superseded.interaction_id,
                reason: CancelReason::Superseded,
            });
        }
    }
}

/// Idle stop, animation, sound and dialog for an outcome. Cues whose asset is
/// missing are skipped.
fn resolution_cues(
    interaction: &Interaction,
    outcome: &ClickOutcome,
    assets: &dyn AssetResolver,
) -> Vec<SceneEvent> {
    let mut cues = Vec::new();
    if interaction.idle_animation.is_some() {
        cues.push(SceneEvent::IdleAnimationStopped {
            id: interaction.id.clone(),
        });
    }
    if let Some(animation) = &outcome.animation {
        if assets.has_animation(animation) {
            cues.push(SceneEvent::PlayAnimation {
                id: interaction.id.clone(),
                animation: animation.clone(),
            });
        } else {
            debug!(
                interaction = %interaction.id,
                spritesheet = %animation.spritesheet,
                "animation_cue_skipped"
            );
        }
    }
    if let Some(key) = &outcome.sound_key {
        if assets.has_sound(key) {
            cues.push(SceneEvent::PlaySound { key: key.clone() });
        } else {
            debug!(interaction = %interaction.id, sound = %key, "sound_cue_skipped");
        }
    }
    cues.push(SceneEvent::ShowDialog {
        id: interaction.id.clone(),
        text: outcome.dialog_text.clone(),
        button_text: outcome.dialog_button_text.clone(),
    });
    cues
}
