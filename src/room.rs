//! Room lifecycle: locked lobby or combat encounter, then cleared for good.

use crate::direction::Direction;
use crate::door::{Door, DoorState};
use crate::dungeon_gen::{Room, RoomKind};
use crate::events::{DungeonEvent, EventQueue};
use crate::obstacles::{ObstacleField, ObstaclePlacer};
use crate::spawning::SpawnPoint;
use glam::Vec3;
use hecs::{Entity, World};
use rand::Rng;
use std::collections::HashSet;

/// Per-room combat state, enemy accounting and door locking policy.
#[derive(Debug)]
pub struct RoomController {
    room: Room,
    origin: Vec3,
    doors: Vec<Door>,
    caps: Vec<Direction>,
    spawners: Vec<SpawnPoint>,
    placer: Option<ObstaclePlacer>,
    has_activated: bool,
    is_cleared: bool,
    alive: usize,
    registered: HashSet<Entity>,
}

impl RoomController {
    pub fn new(room: Room, origin: Vec3) -> Self {
        Self {
            room,
            origin,
            doors: Vec::new(),
            caps: Vec::new(),
            spawners: Vec::new(),
            placer: None,
            has_activated: false,
            is_cleared: false,
            alive: 0,
            registered: HashSet::new(),
        }
    }

    /// Bind doors and spawn points, lock every door and reset counters.
    pub fn init(&mut self, doors: Vec<Door>, spawners: Vec<SpawnPoint>, events: &mut EventQueue) {
        self.doors = doors;
        self.spawners = spawners;
        self.has_activated = false;
        self.is_cleared = false;
        self.alive = 0;
        self.registered.clear();
        if let Some(placer) = &mut self.placer {
            placer.clear();
        }
        self.lock_doors(true, events);
    }

    /// Record which closed sides were capped.
    pub fn set_caps(&mut self, caps: Vec<Direction>) {
        self.caps = caps;
    }

    pub fn set_obstacles(&mut self, placer: Option<ObstaclePlacer>) {
        self.placer = placer;
    }

    pub fn index(&self) -> usize {
        self.room.index
    }

    pub fn kind(&self) -> RoomKind {
        self.room.kind
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    /// World position of the room pivot (floor center).
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn doors(&self) -> &[Door] {
        &self.doors
    }

    pub fn caps(&self) -> &[Direction] {
        &self.caps
    }

    pub fn spawners(&self) -> &[SpawnPoint] {
        &self.spawners
    }

    pub fn has_activated(&self) -> bool {
        self.has_activated
    }

    pub fn is_cleared(&self) -> bool {
        self.is_cleared
    }

    pub fn remaining_enemies(&self) -> usize {
        self.alive
    }

    pub fn obstacles(&self) -> Option<&ObstacleField> {
        self.placer.as_ref().and_then(|p| p.field())
    }

    pub fn get_door(&self, direction: Direction) -> Option<&Door> {
        self.doors.iter().find(|d| d.direction == direction)
    }

    pub fn door_mut(&mut self, direction: Direction) -> Option<&mut Door> {
        self.doors.iter_mut().find(|d| d.direction == direction)
    }

    /// Lock or unlock every door. Permanently open doors stay open.
    pub fn lock_doors(&mut self, locked: bool, events: &mut EventQueue) {
        for door in &mut self.doors {
            let before = door.state();
            door.set_locked(locked);
            if door.state() != before {
                events.push(DungeonEvent::DoorStateChanged {
                    room: self.room.index,
                    direction: door.direction,
                    state: door.state(),
                });
            }
        }
    }

    /// Mark a room without combat as cleared and open it up.
    pub fn unlock_lobby(&mut self, events: &mut EventQueue) {
        self.is_cleared = true;
        self.lock_doors(false, events);
    }

    /// Start the room's encounter. A no-op once activated or cleared.
    ///
    /// Returns `true` if this call activated the room.
    pub fn activate(&mut self, agent: Vec3, world: &mut World, rng: &mut impl Rng, events: &mut EventQueue) -> bool {
        if self.has_activated || self.is_cleared {
            return false;
        }
        self.has_activated = true;
        let index = self.room.index;

        if self.room.kind != RoomKind::Combat {
            log::debug!("Room {index} ({:?}) has no combat, clearing", self.room.kind);
            self.clear_room(events);
            return true;
        }

        events.push(DungeonEvent::RoomActivated { room: index });
        self.lock_doors(true, events);

        if let Some(placer) = &mut self.placer {
            match placer.rebuild(rng) {
                Ok(true) => {
                    let count = placer.field().map_or(0, |f| f.placements.len());
                    events.push(DungeonEvent::ObstaclesBuilt { room: index, count });
                }
                Ok(false) => {}
                Err(err) => log::warn!("Room {index}: skipping obstacles: {err}"),
            }
        }

        if self.spawners.is_empty() {
            log::warn!("Room {index} is a combat room without spawn points");
        }
        let spawners = std::mem::take(&mut self.spawners);
        for spawner in &spawners {
            for entity in spawner.spawn(world, index, self.origin, agent, rng) {
                if self.register(entity) {
                    events.push(DungeonEvent::EnemySpawned { entity, room: index });
                }
            }
        }
        self.spawners = spawners;

        log::info!("Room {index} activated with {} enemies", self.alive);
        if self.alive == 0 {
            self.clear_room(events);
        }
        true
    }

    /// Count an enemy towards this room. Ignored after clear and for repeats.
    pub fn register(&mut self, enemy: Entity) -> bool {
        if self.is_cleared || !self.registered.insert(enemy) {
            return false;
        }
        self.alive += 1;
        true
    }

    /// Death notification for a registered enemy. Clears the room on the last one.
    ///
    /// Returns `true` if the enemy was counted by this room.
    pub fn on_enemy_died(&mut self, enemy: Entity, events: &mut EventQueue) -> bool {
        if !self.registered.remove(&enemy) {
            return false;
        }
        self.alive = self.alive.saturating_sub(1);
        if self.alive == 0 {
            self.clear_room(events);
        }
        true
    }

    fn clear_room(&mut self, events: &mut EventQueue) {
        if self.is_cleared {
            return;
        }
        self.is_cleared = true;
        self.lock_doors(false, events);
        log::info!("Room {} cleared", self.room.index);
        events.push(DungeonEvent::RoomCleared { room: self.room.index });
    }

    /// Doors currently accepting an open request.
    pub fn closed_doors(&self) -> impl Iterator<Item = &Door> {
        self.doors.iter().filter(|d| d.state() == DoorState::Closed)
    }
}
