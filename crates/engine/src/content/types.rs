use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::{matches, Condition};
use crate::geometry::Vec2;
use crate::motion::{Direction, IDLE_ANIMATION_TYPE};
use crate::state::{ItemIndex, PersistentState, StateMutation};

pub const DEFAULT_HOTSPOT_RADIUS_PX: f32 = 48.0;
pub const DEFAULT_DIALOG_BUTTON_TEXT: &str = "OK";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionId(String);

impl InteractionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InteractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimationRef {
    pub spritesheet: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    pub image: String,
    #[serde(default)]
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub scene_id: String,
    #[serde(default)]
    pub soundtrack: Option<String>,
    #[serde(default)]
    pub backgrounds: Vec<Background>,
    #[serde(rename = "player_position")]
    pub player_start: Vec2,
    #[serde(rename = "walkability_mask")]
    pub walkability_mask_image: String,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl SceneDocument {
    /// First background whose condition holds.
    pub fn active_background(&self, state: &PersistentState) -> Option<&Background> {
        self.backgrounds
            .iter()
            .find(|background| matches(background.condition.as_ref(), state))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub position: Vec2,
    #[serde(default)]
    pub idle_animation: Option<AnimationRef>,
    #[serde(default)]
    pub hover_animation: Option<AnimationRef>,
    #[serde(default, rename = "condition")]
    pub visibility_condition: Option<Condition>,
    #[serde(default, rename = "walk_to")]
    pub walk_to_position: Option<Vec2>,
    #[serde(default, rename = "click")]
    pub click_outcomes: Vec<ClickOutcome>,
    #[serde(default = "default_hotspot_radius")]
    pub hotspot_radius: f32,
}

impl Interaction {
    pub fn is_visible(&self, state: &PersistentState) -> bool {
        matches(self.visibility_condition.as_ref(), state)
    }

    /// First unguarded outcome, or the only outcome when there is just one.
    pub fn default_outcome(&self) -> Option<(usize, &ClickOutcome)> {
        if let [only] = self.click_outcomes.as_slice() {
            return Some((0, only));
        }
        self.click_outcomes
            .iter()
            .enumerate()
            .find(|(_, outcome)| outcome.required_item_used.is_none())
    }

    /// With an applied item only the outcome guarded by that exact item
    /// qualifies; without one the default outcome is used.
    pub fn select_outcome(&self, applied_item: Option<ItemIndex>) -> Option<(usize, &ClickOutcome)> {
        match applied_item {
            Some(item) => self
                .click_outcomes
                .iter()
                .enumerate()
                .find(|(_, outcome)| outcome.required_item_used == Some(item)),
            None => self.default_outcome(),
        }
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        self.position.distance_to(point) <= self.hotspot_radius
    }

    pub fn animation_refs(&self) -> impl Iterator<Item = &AnimationRef> {
        self.idle_animation
            .iter()
            .chain(self.hover_animation.iter())
            .chain(
                self.click_outcomes
                    .iter()
                    .filter_map(|outcome| outcome.animation.as_ref()),
            )
    }
}

fn default_hotspot_radius() -> f32 {
    DEFAULT_HOTSPOT_RADIUS_PX
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickOutcome {
    #[serde(default, rename = "required_item")]
    pub required_item_used: Option<ItemIndex>,
    #[serde(default, rename = "sound")]
    pub sound_key: Option<String>,
    #[serde(default)]
    pub animation: Option<AnimationRef>,
    pub dialog_text: String,
    #[serde(default = "default_dialog_button_text")]
    pub dialog_button_text: String,
    #[serde(default, rename = "state_change")]
    pub state_mutation: Option<StateMutation>,
}

fn default_dialog_button_text() -> String {
    DEFAULT_DIALOG_BUTTON_TEXT.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAnimationDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub spritesheet_path: String,
    pub animation_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub animations: Vec<PlayerAnimationDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub player: PlayerConfig,
}

impl ConfigDocument {
    pub fn animation_for(&self, kind: &str) -> Option<&PlayerAnimationDescriptor> {
        self.player
            .animations
            .iter()
            .find(|descriptor| descriptor.kind == kind)
    }

    /// Motion animation types the avatar can report but the config does not
    /// describe.
    pub fn missing_motion_types(&self) -> Vec<&'static str> {
        std::iter::once(IDLE_ANIMATION_TYPE)
            .chain(Direction::ALL.iter().map(|direction| direction.animation_type()))
            .filter(|kind| self.animation_for(kind).is_none())
            .collect()
    }
}
