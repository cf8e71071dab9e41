//! Run progression - sequences entry into rooms, combat and completion.

use crate::constants::ENTRY_ROOM_INDEX;
use crate::events::{DungeonEvent, EventQueue};

use super::dungeon::Dungeon;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Global state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// Waiting for the player to confirm the start
    PreGame,
    /// Walking around cleared rooms
    Exploring,
    /// Enemies remain in the current room
    InCombat,
    /// The current room is cleared and its doors may be opened
    DoorInteractable,
    /// Passing through a doorway into the next room
    Transitioning,
    /// The last room was cleared
    Completed,
    /// The player died
    Dead,
}

impl RunState {
    /// States in which the simulation is paused waiting for the player
    pub fn is_paused(self) -> bool {
        matches!(self, RunState::PreGame | RunState::Completed)
    }

    /// States that ignore room and doorway notifications
    fn ignores_movement(self) -> bool {
        matches!(self, RunState::PreGame | RunState::Completed | RunState::Dead)
    }
}

/// Drives [`RunState`] from room, doorway and death notifications.
#[derive(Debug, Clone)]
pub struct RunController {
    state: RunState,
    current: usize,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RunController {
    pub fn new() -> Self {
        Self {
            state: RunState::PreGame,
            current: ENTRY_ROOM_INDEX,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Index of the room the run considers current
    pub fn current_index(&self) -> usize {
        self.current
    }

    fn set_state(&mut self, to: RunState, events: &mut EventQueue) {
        if self.state == to {
            return;
        }
        log::debug!("Run state {:?} -> {:?}", self.state, to);
        events.push(DungeonEvent::RunStateChanged { from: self.state, to });
        self.state = to;
    }

    /// Leave PreGame. Ignored in any other state.
    pub fn begin_run(&mut self, events: &mut EventQueue) -> bool {
        if self.state != RunState::PreGame {
            return false;
        }
        log::info!("Run started");
        self.set_state(RunState::Exploring, events);
        true
    }

    /// The single "confirm" input: start the run, or ask to exit once completed.
    pub fn confirm(&mut self, events: &mut EventQueue) -> bool {
        match self.state {
            RunState::PreGame => self.begin_run(events),
            RunState::Completed => {
                events.push(DungeonEvent::ExitRequested);
                true
            }
            _ => false,
        }
    }

    /// The agent crossed into a room's volume. Re-entering the current room is a no-op.
    pub fn on_room_entered(
        &mut self,
        index: usize,
        agent: Vec3,
        dungeon: &mut Dungeon,
        events: &mut EventQueue,
    ) -> bool {
        if index == self.current || self.state.ignores_movement() {
            return false;
        }
        self.enter_room(index, agent, dungeon, events)
    }

    /// The agent walked through an opened doorway towards `target`.
    ///
    /// Passage is allowed from the entry room while exploring, or once the
    /// current room's doors are interactable.
    pub fn on_doorway_passed(
        &mut self,
        target: usize,
        agent: Vec3,
        dungeon: &mut Dungeon,
        events: &mut EventQueue,
    ) -> bool {
        let can_pass = (self.state == RunState::Exploring && self.current == ENTRY_ROOM_INDEX)
            || self.state == RunState::DoorInteractable;
        if !can_pass || dungeon.get_room_controller(target).is_none() {
            return false;
        }
        self.set_state(RunState::Transitioning, events);
        self.enter_room(target, agent, dungeon, events)
    }

    fn enter_room(&mut self, index: usize, agent: Vec3, dungeon: &mut Dungeon, events: &mut EventQueue) -> bool {
        let Some(room) = dungeon.get_room_controller(index) else {
            log::debug!("Ignoring entry into unknown room {index}");
            return false;
        };
        let (cleared, activated, remaining) = (room.is_cleared(), room.has_activated(), room.remaining_enemies());
        self.current = index;

        if index == ENTRY_ROOM_INDEX {
            self.set_state(RunState::Exploring, events);
        } else if cleared {
            self.set_state(RunState::DoorInteractable, events);
        } else if !activated {
            self.set_state(RunState::InCombat, events);
            dungeon.activate_room(index, agent, events);
        } else if remaining > 0 {
            self.set_state(RunState::InCombat, events);
        } else {
            self.set_state(RunState::DoorInteractable, events);
        }
        true
    }

    /// A room reported all of its enemies dead.
    ///
    /// Only the current room counts. Completion happens at most once.
    pub fn on_room_cleared(&mut self, index: usize, dungeon: &Dungeon, events: &mut EventQueue) -> bool {
        if index != self.current || matches!(self.state, RunState::Completed | RunState::Dead) {
            return false;
        }
        self.set_state(RunState::DoorInteractable, events);
        if dungeon.is_last_room(index) {
            log::info!("Last room {index} cleared, run complete");
            self.set_state(RunState::Completed, events);
            events.push(DungeonEvent::RunCompleted { room: index });
        }
        true
    }

    /// The player died. Allowed from any state.
    pub fn on_player_died(&mut self, events: &mut EventQueue) {
        log::info!("Player died in room {}", self.current);
        self.set_state(RunState::Dead, events);
    }
}
