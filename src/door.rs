//! Door state machine.
//!
//! A doorway between two rooms is two `Door`s, one owned by each room. Each
//! side is locked and unlocked by its own room, but once either side opens,
//! both sides are forced open for good.

use crate::direction::Direction;
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorState {
    Locked,
    Closed,
    /// Terminal.
    Opened,
}

/// Presentation flags a renderer mirrors for one door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorIndicators {
    /// "Defeat the enemies" marker.
    pub locked_visible: bool,
    /// "Press to open" prompt.
    pub interact_visible: bool,
    /// Door mesh.
    pub visual_visible: bool,
    /// Physical blocker.
    pub blocker_enabled: bool,
    /// Passage volume that raises `doorway_passed`.
    pub passage_active: bool,
}

impl DoorIndicators {
    fn locked() -> Self {
        Self {
            locked_visible: true,
            interact_visible: false,
            visual_visible: true,
            blocker_enabled: true,
            passage_active: false,
        }
    }
}

/// The door on the far side of a doorway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorLink {
    pub room: usize,
    pub direction: Direction,
}

/// A ray cast by the acting agent, typically from the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimProbe {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl AimProbe {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }
}

/// Offset of a socket from the room pivot (floor center).
pub fn socket_offset(dir: Direction, cell_size: Vec3) -> Vec3 {
    let half = cell_size * 0.5;
    match dir {
        Direction::XPlus => Vec3::new(half.x, half.y, 0.0),
        Direction::XMinus => Vec3::new(-half.x, half.y, 0.0),
        Direction::ZPlus => Vec3::new(0.0, half.y, half.z),
        Direction::ZMinus => Vec3::new(0.0, half.y, -half.z),
        Direction::YPlus => Vec3::new(0.0, cell_size.y, 0.0),
        Direction::YMinus => Vec3::ZERO,
    }
}

/// Rotate X-facing collider extents onto the door's axis.
fn oriented_half_extents(dir: Direction, base: Vec3) -> Vec3 {
    match dir {
        Direction::XPlus | Direction::XMinus => base,
        Direction::ZPlus | Direction::ZMinus => Vec3::new(base.z, base.y, base.x),
        Direction::YPlus | Direction::YMinus => Vec3::new(base.y, base.x, base.z),
    }
}

#[derive(Debug, Clone)]
pub struct Door {
    pub direction: Direction,
    pub owner: usize,
    /// Creation index of the room behind this door, if one exists.
    pub target: Option<usize>,
    /// World-space socket position.
    pub position: Vec3,
    half_extents: Vec3,
    state: DoorState,
    permanently_open: bool,
    indicators: DoorIndicators,
}

impl Door {
    /// New doors start locked; the owning room unlocks them.
    pub fn new(owner: usize, direction: Direction, target: Option<usize>, position: Vec3, collider: Vec3) -> Self {
        Self {
            direction,
            owner,
            target,
            position,
            half_extents: oriented_half_extents(direction, collider),
            state: DoorState::Locked,
            permanently_open: false,
            indicators: DoorIndicators::locked(),
        }
    }

    pub fn state(&self) -> DoorState {
        self.state
    }

    pub fn is_permanently_open(&self) -> bool {
        self.permanently_open
    }

    pub fn indicators(&self) -> DoorIndicators {
        self.indicators
    }

    /// The opposite-facing door owned by the target room.
    pub fn mirror(&self) -> Option<DoorLink> {
        self.target.map(|room| DoorLink {
            room,
            direction: self.direction.opposite(),
        })
    }

    /// Toggle between Locked and Closed. Once permanently open this only
    /// re-applies the opened presentation.
    pub fn set_locked(&mut self, locked: bool) {
        if self.permanently_open {
            self.force_open_visual();
            return;
        }
        self.state = if locked { DoorState::Locked } else { DoorState::Closed };
        self.indicators.locked_visible = locked;
        self.indicators.interact_visible = !locked;
        if !locked {
            self.indicators.visual_visible = true;
            self.indicators.blocker_enabled = true;
            self.indicators.passage_active = false;
        }
    }

    /// Open from Closed. Returns `false` (and does nothing) in any other state.
    ///
    /// The caller is responsible for force-opening [`Door::mirror`].
    pub fn open(&mut self) -> bool {
        if self.state != DoorState::Closed {
            return false;
        }
        self.force_open_visual();
        true
    }

    /// Force the opened state regardless of the current one. Idempotent.
    pub fn force_open_visual(&mut self) {
        self.permanently_open = true;
        self.state = DoorState::Opened;
        self.indicators = DoorIndicators {
            locked_visible: false,
            interact_visible: false,
            visual_visible: false,
            blocker_enabled: false,
            passage_active: self.target.is_some(),
        };
    }

    /// Distance along `probe` to this door's collider, if the ray hits it.
    ///
    /// Only a door with an enabled blocker has a collider.
    pub fn ray_hit(&self, probe: &AimProbe) -> Option<f32> {
        if !self.indicators.blocker_enabled || probe.direction == Vec3::ZERO {
            return None;
        }
        let min = self.position - self.half_extents;
        let max = self.position + self.half_extents;
        let inv = probe.direction.recip();
        let t0 = (min - probe.origin) * inv;
        let t1 = (max - probe.origin) * inv;
        let near = t0.min(t1).max_element();
        let far = t0.max(t1).min_element();
        if far < 0.0 || near > far {
            return None;
        }
        Some(near.max(0.0))
    }

    /// Whether an open request along `probe` would be accepted.
    pub fn accepts_interaction(&self, probe: &AimProbe, range: f32) -> bool {
        self.state == DoorState::Closed && self.ray_hit(probe).is_some_and(|t| t <= range)
    }

    /// Whether the interact prompt should show.
    pub fn prompt_visible(&self, aimed: bool, only_when_aimed: bool) -> bool {
        self.state == DoorState::Closed && (!only_when_aimed || aimed)
    }
}
