//! Dungeon event system for decoupled communication between rooms, doors and the run.
//!
//! Rooms and doors emit events, the run controller and outside collaborators
//! (UI, audio) consume them. This replaces per-object callback lists.

use crate::direction::Direction;
use crate::door::DoorState;
use crate::engine::RunState;
use hecs::Entity;

/// Events the dungeon core emits
#[derive(Debug, Clone, PartialEq)]
pub enum DungeonEvent {
    /// A room was instantiated (generation or a staggered batch)
    RoomMaterialized { room: usize },
    /// A room started its combat encounter
    RoomActivated { room: usize },
    /// Every enemy registered with a room is dead (or it had none)
    RoomCleared { room: usize },
    /// The obstacle field of a room was built
    ObstaclesBuilt { room: usize, count: usize },
    /// A door changed state
    DoorStateChanged {
        room: usize,
        direction: Direction,
        state: DoorState,
    },
    /// An enemy was spawned and registered with a room
    EnemySpawned { entity: Entity, room: usize },
    /// An enemy reached zero health
    EnemyDied { entity: Entity, room: usize },
    /// The run moved between states
    RunStateChanged { from: RunState, to: RunState },
    /// The last room was cleared
    RunCompleted { room: usize },
    /// The player asked to leave after completing the run
    ExitRequested,
}

/// Simple event queue - events are pushed during an input, dispatched before it returns
#[derive(Default)]
pub struct EventQueue {
    events: Vec<DungeonEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Push an event to be processed later
    pub fn push(&mut self, event: DungeonEvent) {
        self.events.push(event);
    }

    /// Drain all events for processing
    pub fn drain(&mut self) -> impl Iterator<Item = DungeonEvent> + '_ {
        self.events.drain(..)
    }

    /// Check if there are pending events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Pending events, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &DungeonEvent> {
        self.events.iter()
    }
}
