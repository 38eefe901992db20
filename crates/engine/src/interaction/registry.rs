use std::collections::HashSet;

use tracing::{debug, warn};

use crate::content::{AnimationRef, Interaction, InteractionId};
use crate::geometry::Vec2;
use crate::state::PersistentState;

/// Work handed to the asset resolver before a rebuild can be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct RebuildRequest {
    pub generation: u64,
    pub animations: Vec<AnimationRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityDelta {
    pub shown: Vec<InteractionId>,
    pub hidden: Vec<InteractionId>,
}

impl VisibilityDelta {
    pub fn is_empty(&self) -> bool {
        self.shown.is_empty() && self.hidden.is_empty()
    }
}

#[derive(Debug, Clone)]
enum RebuildGuard {
    Idle,
    InFlight {
        generation: u64,
        target: Vec<usize>,
        queued: Option<PersistentState>,
    },
}

/// Interactions of the active scene and the subset currently visible.
///
/// Visibility is recomputed through a two-step rebuild: `request_rebuild`
/// evaluates conditions and asks for the needed animations, and
/// `complete_rebuild` commits once they are resolved. At most one rebuild is
/// in flight; requests arriving meanwhile collapse into a single queued one
/// that starts when the current rebuild completes.
#[derive(Debug, Clone)]
pub struct InteractionRegistry {
    interactions: Vec<Interaction>,
    visible: Vec<usize>,
    disabled: HashSet<InteractionId>,
    guard: RebuildGuard,
    last_generation: u64,
}

impl InteractionRegistry {
    pub fn new(interactions: Vec<Interaction>) -> Self {
        Self {
            interactions,
            visible: Vec::new(),
            disabled: HashSet::new(),
            guard: RebuildGuard::Idle,
            last_generation: 0,
        }
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn get(&self, id: &InteractionId) -> Option<&Interaction> {
        self.interactions
            .iter()
            .find(|interaction| interaction.id == *id)
    }

    /// Visible interactions in document order.
    pub fn visible(&self) -> impl Iterator<Item = &Interaction> + '_ {
        self.visible
            .iter()
            .filter_map(|index| self.interactions.get(*index))
    }

    pub fn is_visible(&self, id: &InteractionId) -> bool {
        self.visible().any(|interaction| interaction.id == *id)
    }

    pub fn is_enabled(&self, id: &InteractionId) -> bool {
        self.is_visible(id) && !self.disabled.contains(id)
    }

    /// Returns whether the flag changed.
    pub fn set_enabled(&mut self, id: &InteractionId, enabled: bool) -> bool {
        if enabled {
            self.disabled.remove(id)
        } else {
            self.disabled.insert(id.clone())
        }
    }

    pub fn is_rebuild_in_flight(&self) -> bool {
        matches!(self.guard, RebuildGuard::InFlight { .. })
    }

    pub fn in_flight_generation(&self) -> Option<u64> {
        match &self.guard {
            RebuildGuard::InFlight { generation, .. } => Some(*generation),
            RebuildGuard::Idle => None,
        }
    }

    /// Starts a rebuild for `state`, or queues it behind the one in flight.
    /// A queued request replaces any request queued before it.
    pub fn request_rebuild(&mut self, state: &PersistentState) -> Option<RebuildRequest> {
        if let RebuildGuard::InFlight {
            generation, queued, ..
        } = &mut self.guard
        {
            debug!(
                in_flight = *generation,
                replaced_queued = queued.is_some(),
                "registry_rebuild_queued"
            );
            *queued = Some(state.clone());
            return None;
        }
        Some(self.start_rebuild(state))
    }

    /// Commits the in-flight rebuild. A stale or unknown generation is
    /// ignored. When a request was queued its rebuild starts immediately and
    /// is returned.
    pub fn complete_rebuild(
        &mut self,
        generation: u64,
    ) -> (VisibilityDelta, Option<RebuildRequest>) {
        let guard = std::mem::replace(&mut self.guard, RebuildGuard::Idle);
        let (target, queued) = match guard {
            RebuildGuard::InFlight {
                generation: in_flight,
                target,
                queued,
            } if in_flight == generation => (target, queued),
            other => {
                warn!(generation, "registry_rebuild_completion_ignored");
                self.guard = other;
                return (VisibilityDelta::default(), None);
            }
        };

        let delta = self.commit_visible(target);
        debug!(
            generation,
            shown = delta.shown.len(),
            hidden = delta.hidden.len(),
            "registry_rebuild_completed"
        );
        let next = queued.map(|state| self.start_rebuild(&state));
        (delta, next)
    }

    /// Topmost enabled visible interaction whose hotspot contains `point`.
    /// Later document entries draw above earlier ones.
    pub fn hit_test(&self, point: Vec2) -> Option<&Interaction> {
        self.visible()
            .filter(|interaction| !self.disabled.contains(&interaction.id))
            .filter(|interaction| interaction.contains_point(point))
            .last()
    }

    fn start_rebuild(&mut self, state: &PersistentState) -> RebuildRequest {
        self.last_generation += 1;
        let generation = self.last_generation;
        let target = self
            .interactions
            .iter()
            .enumerate()
            .filter(|(_, interaction)| interaction.is_visible(state))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        let mut animations = Vec::new();
        for index in &target {
            if let Some(interaction) = self.interactions.get(*index) {
                for animation in interaction.animation_refs() {
                    if !animations.contains(animation) {
                        animations.push(animation.clone());
                    }
                }
            }
        }

        debug!(
            generation,
            state_tag = %state.state_tag,
            visible = target.len(),
            "registry_rebuild_started"
        );
        self.guard = RebuildGuard::InFlight {
            generation,
            target,
            queued: None,
        };
        RebuildRequest {
            generation,
            animations,
        }
    }

    fn commit_visible(&mut self, target: Vec<usize>) -> VisibilityDelta {
        let mut delta = VisibilityDelta::default();
        for index in &target {
            if !self.visible.contains(index) {
                if let Some(interaction) = self.interactions.get(*index) {
                    delta.shown.push(interaction.id.clone());
                }
            }
        }
        for index in &self.visible {
            if !target.contains(index) {
                if let Some(interaction) = self.interactions.get(*index) {
                    delta.hidden.push(interaction.id.clone());
                }
            }
        }
        self.visible = target;
        delta
    }
}
