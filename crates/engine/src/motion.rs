use crate::content::InteractionId;
use crate::geometry::Vec2;
use crate::nav::{Path, WalkabilityMask};
use crate::state::ItemIndex;

pub const SNAP_DISTANCE_PX: f32 = 2.0;
pub const DEFAULT_PLAYER_SPEED_PX: f32 = 200.0;
pub const IDLE_ANIMATION_TYPE: &str = "system_idle";

/// Eight compass buckets in screen space (`y` grows downward, so north is
/// negative `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Buckets are 45 degrees wide and centered on the compass points, so
    /// boundaries sit at odd multiples of 22.5 degrees. `None` for a zero
    /// vector.
    pub fn from_vector(dx: f32, dy: f32) -> Option<Direction> {
        if !(dx.is_finite() && dy.is_finite()) || (dx == 0.0 && dy == 0.0) {
            return None;
        }
        let degrees = dy.atan2(dx).to_degrees();
        let shifted = (degrees + 360.0 + 22.5).rem_euclid(360.0);
        let bucket = (shifted / 45.0).floor() as usize % 8;
        Some(match bucket {
            0 => Direction::East,
            1 => Direction::SouthEast,
            2 => Direction::South,
            3 => Direction::SouthWest,
            4 => Direction::West,
            5 => Direction::NorthWest,
            6 => Direction::North,
            _ => Direction::NorthEast,
        })
    }

    /// Animation `type` string used by the config document.
    pub fn animation_type(self) -> &'static str {
        match self {
            Direction::North => "system_walk_n",
            Direction::NorthEast => "system_walk_ne",
            Direction::East => "system_walk_e",
            Direction::SouthEast => "system_walk_se",
            Direction::South => "system_walk_s",
            Direction::SouthWest => "system_walk_sw",
            Direction::West => "system_walk_w",
            Direction::NorthWest => "system_walk_nw",
        }
    }
}

/// Interaction latched while the agent walks toward it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInteraction {
    pub interaction_id: InteractionId,
    pub applied_item: Option<ItemIndex>,
}

/// Reported only on transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    MovingChanged(bool),
    DirectionChanged(Direction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MotionOutcome {
    Arrived {
        pending: Option<PendingInteraction>,
    },
    Obstructed {
        at: Vec2,
        abandoned: Option<PendingInteraction>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionStep {
    pub events: Vec<MotionEvent>,
    pub outcome: Option<MotionOutcome>,
}

#[derive(Debug, Clone)]
pub struct AgentMotionController {
    position: Vec2,
    speed: f32,
    path: Path,
    target: Option<Vec2>,
    moving: bool,
    direction: Direction,
    reported_moving: Option<bool>,
    reported_direction: Option<Direction>,
    pending: Option<PendingInteraction>,
}

impl AgentMotionController {
    pub fn new(position: Vec2, speed: f32) -> Self {
        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            DEFAULT_PLAYER_SPEED_PX
        };
        Self {
            position,
            speed,
            path: Path::empty(),
            target: None,
            moving: false,
            direction: Direction::South,
            reported_moving: None,
            reported_direction: None,
            pending: None,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn current_target(&self) -> Option<Vec2> {
        self.target
    }

    pub fn remaining_waypoints(&self) -> usize {
        self.path.len() + usize::from(self.target.is_some())
    }

    pub fn pending(&self) -> Option<&PendingInteraction> {
        self.pending.as_ref()
    }

    pub fn animation_type(&self) -> &'static str {
        if self.moving {
            self.direction.animation_type()
        } else {
            IDLE_ANIMATION_TYPE
        }
    }

    /// Replaces the active path. Any previously latched interaction is
    /// returned as superseded. `pending` is only latched when the path has
    /// at least one waypoint.
    pub fn set_path(
        &mut self,
        path: Path,
        pending: Option<PendingInteraction>,
    ) -> Option<PendingInteraction> {
        let superseded = self.pending.take();
        self.path = path;
        self.target = self.path.pop_front();
        if self.target.is_some() {
            self.pending = pending;
        }
        superseded
    }

    /// Drops the path and any latched interaction without emitting events;
    /// the idle transition is reported on the next tick.
    pub fn stop(&mut self) -> Option<PendingInteraction> {
        self.path.clear();
        self.target = None;
        self.pending.take()
    }

    pub fn tick(&mut self, dt_seconds: f32, mask: &WalkabilityMask) -> MotionStep {
        let mut step = MotionStep::default();
        if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return step;
        }

        let Some(target) = self.target else {
            self.moving = false;
            self.report_moving(&mut step.events);
            return step;
        };

        let distance = self.position.distance_to(target);
        if distance < SNAP_DISTANCE_PX {
            if !mask.is_segment_walkable(self.position, target) {
                self.obstruct(&mut step);
                return step;
            }
            self.reach_target(target, &mut step);
            return step;
        }

        let travel = (self.speed * dt_seconds).min(distance);
        let dx = (target.x - self.position.x) / distance;
        let dy = (target.y - self.position.y) / distance;
        let candidate = Vec2 {
            x: self.position.x + dx * travel,
            y: self.position.y + dy * travel,
        };

        // The whole swept segment is checked so a fence thinner than one
        // step still blocks.
        let arrives = candidate.distance_to(target) < SNAP_DISTANCE_PX;
        let end = if arrives { target } else { candidate };
        if !mask.is_segment_walkable(self.position, end) {
            self.obstruct(&mut step);
            return step;
        }

        self.position = candidate;
        self.moving = true;
        if let Some(direction) = Direction::from_vector(dx, dy) {
            self.direction = direction;
        }
        self.report_moving(&mut step.events);
        self.report_direction(&mut step.events);

        if arrives {
            self.reach_target(target, &mut step);
        }
        step
    }

    fn obstruct(&mut self, step: &mut MotionStep) {
        self.path.clear();
        self.target = None;
        self.moving = false;
        self.report_moving(&mut step.events);
        step.outcome = Some(MotionOutcome::Obstructed {
            at: self.position,
            abandoned: self.pending.take(),
        });
    }

    fn reach_target(&mut self, target: Vec2, step: &mut MotionStep) {
        self.position = target;
        self.target = self.path.pop_front();
        if self.target.is_some() {
            return;
        }
        self.moving = false;
        self.report_moving(&mut step.events);
        step.outcome = Some(MotionOutcome::Arrived {
            pending: self.pending.take(),
        });
    }

    fn report_moving(&mut self, events: &mut Vec<MotionEvent>) {
        if self.reported_moving != Some(self.moving) {
            self.reported_moving = Some(self.moving);
            events.push(MotionEvent::MovingChanged(self.moving));
        }
    }

    fn report_direction(&mut self, events: &mut Vec<MotionEvent>) {
        if self.reported_direction != Some(self.direction) {
            self.reported_direction = Some(self.direction);
            events.push(MotionEvent::DirectionChanged(self.direction));
        }
    }
}
