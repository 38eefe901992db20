use crate::content::{AnimationRef, InteractionId};
use crate::motion::MotionEvent;
use crate::state::MutationEvent;

/// Why a click stopped before its outcome was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// A newer click took over the walk.
    Superseded,
    /// The avatar hit a blocked mask pixel on the way.
    Obstructed,
    /// No walkable route brings the avatar any closer.
    Unreachable,
    /// The interaction stopped being visible or enabled before arrival.
    Unavailable,
}

impl CancelReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CancelReason::Superseded => "superseded",
            CancelReason::Obstructed => "obstructed",
            CancelReason::Unreachable => "unreachable",
            CancelReason::Unavailable => "unavailable",
        }
    }
}

/// Everything a presentation layer needs to mirror the scene, in the order it
/// happened within a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    SoundtrackStarted {
        track: String,
    },
    SoundtrackStopped {
        track: String,
    },
    BackgroundChanged {
        image: Option<String>,
    },
    InteractionShown {
        id: InteractionId,
        idle_animation: Option<AnimationRef>,
    },
    InteractionHidden {
        id: InteractionId,
    },
    Motion(MotionEvent),
    InteractionDisabled {
        id: InteractionId,
    },
    IdleAnimationStopped {
        id: InteractionId,
    },
    PlayAnimation {
        id: InteractionId,
        animation: AnimationRef,
    },
    PlaySound {
        key: String,
    },
    ShowDialog {
        id: InteractionId,
        text: String,
        button_text: String,
    },
    StateMutation(MutationEvent),
    IdleAnimationRestored {
        id: InteractionId,
        animation: AnimationRef,
    },
    InteractionEnabled {
        id: InteractionId,
    },
    InteractionCancelled {
        id: InteractionId,
        reason: CancelReason,
    },
    /// `hover_animation` is `None` when the interaction has none or its
    /// asset is missing.
    InteractionHoverStarted {
        id: InteractionId,
        hover_animation: Option<AnimationRef>,
    },
    InteractionHoverEnded {
        id: InteractionId,
    },
}

impl SceneEvent {
    /// Stable snake_case name used when logging the event.
    pub fn name(&self) -> &'static str {
        match self {
            SceneEvent::SoundtrackStarted { .. } => "soundtrack_started",
            SceneEvent::SoundtrackStopped { .. } => "soundtrack_stopped",
            SceneEvent::BackgroundChanged { .. } => "background_changed",
            SceneEvent::InteractionShown { .. } => "interaction_shown",
            SceneEvent::InteractionHidden { .. } => "interaction_hidden",
            SceneEvent::Motion(MotionEvent::MovingChanged(_)) => "moving_changed",
            SceneEvent::Motion(MotionEvent::DirectionChanged(_)) => "direction_changed",
            SceneEvent::InteractionDisabled { .. } => "interaction_disabled",
            SceneEvent::IdleAnimationStopped { .. } => "idle_animation_stopped",
            SceneEvent::PlayAnimation { .. } => "play_animation",
            SceneEvent::PlaySound { .. } => "play_sound",
            SceneEvent::ShowDialog { .. } => "show_dialog",
            SceneEvent::StateMutation(_) => "state_mutation",
            SceneEvent::IdleAnimationRestored { .. } => "idle_animation_restored",
            SceneEvent::InteractionEnabled { .. } => "interaction_enabled",
            SceneEvent::InteractionCancelled { .. } => "interaction_cancelled",
            SceneEvent::InteractionHoverStarted { .. } => "interaction_hover_started",
            SceneEvent::InteractionHoverEnded { .. } => "interaction_hover_ended",
        }
    }
}
