//! The dungeon context - topology, materialized rooms and the enemy world.
//!
//! Everything that used to be reached through a global run manager lives
//! here and is passed by reference to whoever needs it.

use crate::components::{Health, RoomMember};
use crate::config::DungeonConfig;
use crate::constants::*;
use crate::direction::Direction;
use crate::door::{socket_offset, AimProbe, Door, DoorLink};
use crate::dungeon_gen::{DungeonGenerator, DungeonGraph, RoomKind};
use crate::events::{DungeonEvent, EventQueue};
use crate::obstacles::ObstaclePlacer;
use crate::room::RoomController;
use crate::spawning::default_spawn_points;

use glam::Vec3;
use hecs::{Entity, World};
use rand::rngs::StdRng;

use super::materialize::MaterializeScheduler;

/// One dungeon generation epoch plus the config it was built from.
pub struct Dungeon {
    config: DungeonConfig,
    graph: DungeonGraph,
    /// Materialized rooms, in creation order.
    rooms: Vec<RoomController>,
    world: World,
    rng: StdRng,
    epoch: u64,
}

impl Dungeon {
    /// An empty dungeon. Call one of the `generate` methods to build rooms.
    pub fn new(config: DungeonConfig) -> Self {
        let rng = DungeonGenerator::rng_for(config.layout.seed);
        Self {
            config,
            graph: DungeonGraph::default(),
            rooms: Vec::new(),
            world: World::new(),
            rng,
            epoch: 0,
        }
    }

    pub fn config(&self) -> &DungeonConfig {
        &self.config
    }

    pub fn graph(&self) -> &DungeonGraph {
        &self.graph
    }

    /// Enemy entities.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Bumped on every regeneration.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Rooms in the topology, materialized or not.
    pub fn room_count(&self) -> usize {
        self.graph.len()
    }

    pub fn materialized_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_fully_materialized(&self) -> bool {
        self.rooms.len() == self.graph.len()
    }

    /// Drop every room, door and enemy of the current epoch.
    pub fn clear_all(&mut self) {
        self.rooms.clear();
        self.world.clear();
        self.graph = DungeonGraph::default();
    }

    /// Grow the topology and roll room kinds without materializing anything.
    fn plan(&mut self, seed: Option<u64>, max_rooms: usize, max_children_per_room: usize) {
        puffin::profile_function!();

        self.clear_all();
        self.rng = DungeonGenerator::rng_for(seed);
        self.graph = DungeonGenerator::new(max_rooms, max_children_per_room).grow(&mut self.rng);
        self.graph.assign_kinds(&self.config.room_kinds, &mut self.rng);
        self.epoch += 1;

        log::info!(
            "Generated dungeon epoch {} with {} rooms (seed {:?})",
            self.epoch,
            self.graph.len(),
            seed
        );
    }

    /// Generate and materialize every room at once.
    pub fn generate(
        &mut self,
        seed: Option<u64>,
        max_rooms: usize,
        max_children_per_room: usize,
        events: &mut EventQueue,
    ) -> &DungeonGraph {
        self.plan(seed, max_rooms, max_children_per_room);
        self.materialize_next(usize::MAX, events);
        &self.graph
    }

    /// [`Dungeon::generate`] with the layout from config.
    pub fn generate_from_config(&mut self, events: &mut EventQueue) -> &DungeonGraph {
        let layout = self.config.layout.clone();
        self.generate(layout.seed, layout.max_rooms, layout.max_children_per_room, events)
    }

    /// Generate the topology eagerly and return a scheduler that materializes
    /// the rooms over subsequent ticks.
    pub fn generate_cinematic(
        &mut self,
        seed: Option<u64>,
        max_rooms: usize,
        max_children_per_room: usize,
    ) -> MaterializeScheduler {
        self.plan(seed, max_rooms, max_children_per_room);
        MaterializeScheduler::new(&self.config.materialize, self.epoch)
    }

    /// Materialize up to `count` more rooms in creation order. Returns how many were built.
    pub fn materialize_next(&mut self, count: usize, events: &mut EventQueue) -> usize {
        let start = self.rooms.len();
        let end = start.saturating_add(count).min(self.graph.len());
        for index in start..end {
            self.materialize_room(index, events);
        }
        end - start
    }

    fn materialize_room(&mut self, index: usize, events: &mut EventQueue) {
        let Some(room) = self.graph.room(index).copied() else {
            return;
        };
        let cell = self.config.layout.cell_size;
        let origin = room.coord.as_vec3() * cell;
        let sockets = self.graph.sockets_for(&room);

        let doors: Vec<Door> = sockets
            .doors()
            .map(|(direction, target)| {
                Door::new(
                    index,
                    direction,
                    target,
                    origin + socket_offset(direction, cell),
                    self.config.doors.collider_half_extents,
                )
            })
            .collect();
        let combat = room.kind == RoomKind::Combat;
        let spawners = if combat {
            default_spawn_points(&self.config.spawning)
        } else {
            Vec::new()
        };

        let mut controller = RoomController::new(room, origin);
        controller.init(doors, spawners, events);
        controller.set_caps(sockets.caps().collect());
        if combat {
            controller.set_obstacles(Some(ObstaclePlacer::new(self.config.obstacles.clone())));
        }
        if index == ENTRY_ROOM_INDEX {
            controller.unlock_lobby(events);
        }

        // A doorway opened from an earlier room stays open from this side too.
        let opened: Vec<Direction> = controller
            .doors()
            .iter()
            .filter_map(|door| {
                let link = door.mirror()?;
                let mirror = self.rooms.get(link.room)?.get_door(link.direction)?;
                mirror.is_permanently_open().then_some(door.direction)
            })
            .collect();
        for direction in opened {
            if let Some(door) = controller.door_mut(direction) {
                door.force_open_visual();
            }
        }

        log::debug!(
            "Materialized room {index} at {} ({:?}, {} doors, {} caps)",
            room.coord,
            room.kind,
            controller.doors().len(),
            controller.caps().len()
        );
        self.rooms.push(controller);
        events.push(DungeonEvent::RoomMaterialized { room: index });
    }

    pub fn get_room_controller(&self, index: usize) -> Option<&RoomController> {
        self.rooms.get(index)
    }

    pub fn get_room_controller_mut(&mut self, index: usize) -> Option<&mut RoomController> {
        self.rooms.get_mut(index)
    }

    /// Materialized rooms in creation order.
    pub fn room_controllers(&self) -> &[RoomController] {
        &self.rooms
    }

    /// World position of a room's pivot, from the topology.
    pub fn room_origin(&self, index: usize) -> Option<Vec3> {
        self.graph
            .room(index)
            .map(|room| room.coord.as_vec3() * self.config.layout.cell_size)
    }

    /// Where the player appears in a materialized room.
    pub fn get_player_spawn(&self, index: usize) -> Option<Vec3> {
        self.rooms
            .get(index)
            .map(|room| room.origin() + self.config.spawning.player_spawn_offset)
    }

    pub fn is_last_room(&self, index: usize) -> bool {
        self.graph.is_last(index)
    }

    /// The room one lattice step away from `index` in `direction`.
    pub fn get_next_index(&self, index: usize, direction: Direction) -> Option<usize> {
        self.graph.neighbor_index(index, direction)
    }

    /// Center and half extents of a room's enter volume.
    pub fn enter_volume(&self, index: usize) -> Option<(Vec3, Vec3)> {
        let cell = self.config.layout.cell_size;
        let origin = self.get_room_controller(index)?.origin();
        let size = (cell - Vec3::splat(ROOM_ENTER_VOLUME_INSET)).max(Vec3::splat(ROOM_ENTER_VOLUME_MIN));
        Some((origin + Vec3::new(0.0, cell.y * 0.5, 0.0), size * 0.5))
    }

    /// The materialized room whose enter volume contains `point`.
    pub fn room_at_position(&self, point: Vec3) -> Option<usize> {
        (0..self.rooms.len()).find(|&index| {
            self.enter_volume(index).is_some_and(|(center, half)| {
                let d = (point - center).abs();
                d.cmple(half).all()
            })
        })
    }

    /// Activate a materialized room for an agent at `agent`.
    pub fn activate_room(&mut self, index: usize, agent: Vec3, events: &mut EventQueue) -> bool {
        let Some(room) = self.rooms.get_mut(index) else {
            return false;
        };
        room.activate(agent, &mut self.world, &mut self.rng, events)
    }

    pub fn lock_doors(&mut self, index: usize, locked: bool, events: &mut EventQueue) -> bool {
        let Some(room) = self.rooms.get_mut(index) else {
            return false;
        };
        room.lock_doors(locked, events);
        true
    }

    /// Open a closed door and force its mirror in the adjacent room open.
    pub fn open_door(&mut self, room: usize, direction: Direction, events: &mut EventQueue) -> bool {
        let Some(door) = self.rooms.get_mut(room).and_then(|r| r.door_mut(direction)) else {
            return false;
        };
        if !door.open() {
            return false;
        }
        let mirror = door.mirror();
        events.push(DungeonEvent::DoorStateChanged {
            room,
            direction,
            state: door.state(),
        });

        if let Some(link) = mirror {
            match self.rooms.get_mut(link.room).and_then(|r| r.door_mut(link.direction)) {
                Some(other) => {
                    let before = other.state();
                    other.force_open_visual();
                    if other.state() != before {
                        events.push(DungeonEvent::DoorStateChanged {
                            room: link.room,
                            direction: link.direction,
                            state: other.state(),
                        });
                    }
                }
                None => log::debug!("Mirror of room {room} {direction} door is not materialized yet"),
            }
        }
        log::debug!("Opened room {room} {direction} door");
        true
    }

    /// The nearest closed door the probe hits within interaction range.
    pub fn aimed_door(&self, probe: &AimProbe) -> Option<DoorLink> {
        let range = self.config.doors.interact_range;
        self.rooms
            .iter()
            .flat_map(|room| room.closed_doors())
            .filter(|door| door.accepts_interaction(probe, range))
            .filter_map(|door| door.ray_hit(probe).map(|t| (t, door)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, door)| DoorLink {
                room: door.owner,
                direction: door.direction,
            })
    }

    /// Open the door the agent is aiming at, if any.
    pub fn interact(&mut self, probe: &AimProbe, events: &mut EventQueue) -> Option<DoorLink> {
        let link = self.aimed_door(probe)?;
        self.open_door(link.room, link.direction, events).then_some(link)
    }

    /// Whether the interact prompt of a door should be shown for this probe.
    pub fn prompt_visible(&self, room: usize, direction: Direction, probe: &AimProbe) -> bool {
        let Some(door) = self.get_room_controller(room).and_then(|r| r.get_door(direction)) else {
            return false;
        };
        let aimed = self.aimed_door(probe) == Some(DoorLink { room, direction });
        door.prompt_visible(aimed, self.config.doors.prompt_only_when_aimed)
    }

    /// Damage an enemy. Returns true if the hit killed it.
    pub fn damage_enemy(&mut self, entity: Entity, amount: i32, events: &mut EventQueue) -> bool {
        let killed = match self.world.get::<&mut Health>(entity) {
            Ok(mut health) => health.take_damage(amount),
            Err(_) => return false,
        };
        if killed {
            self.enemy_died(entity, events);
        }
        killed
    }

    /// Death notification for an enemy: despawn it and tell its room.
    pub fn enemy_died(&mut self, entity: Entity, events: &mut EventQueue) -> bool {
        let Ok(member) = self.world.get::<&RoomMember>(entity).map(|m| *m) else {
            return false;
        };
        if let Err(err) = self.world.despawn(entity) {
            log::warn!("Failed to despawn enemy {entity:?}: {err}");
        }
        events.push(DungeonEvent::EnemyDied {
            entity,
            room: member.room,
        });
        match self.rooms.get_mut(member.room) {
            Some(room) => room.on_enemy_died(entity, events),
            None => false,
        }
    }

    /// Live enemies registered with `room`.
    pub fn enemies_in(&self, room: usize) -> Vec<Entity> {
        self.world
            .query::<&RoomMember>()
            .iter()
            .filter(|(_, member)| member.room == room)
            .map(|(entity, _)| entity)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::door::DoorState;

    fn config(rooms: usize) -> DungeonConfig {
        let mut config = DungeonConfig::default();
        config.layout.seed = Some(5);
        config.layout.max_rooms = rooms;
        config.spawning.enemy_count = 3;
        config
    }

    fn generated(rooms: usize) -> (Dungeon, EventQueue) {
        let mut events = EventQueue::new();
        let mut dungeon = Dungeon::new(config(rooms));
        dungeon.generate_from_config(&mut events);
        (dungeon, events)
    }

    /// A door of room 0 and the direction it leads.
    fn entry_door(dungeon: &Dungeon) -> (Direction, usize) {
        let door = &dungeon.get_room_controller(0).unwrap().doors()[0];
        (door.direction, door.target.unwrap())
    }

    #[test]
    fn test_generate_materializes_every_room() {
        let (dungeon, mut events) = generated(6);
        assert_eq!(dungeon.room_count(), 6);
        assert!(dungeon.is_fully_materialized());
        let materialized = events
            .drain()
            .filter(|e| matches!(e, DungeonEvent::RoomMaterialized { .. }))
            .count();
        assert_eq!(materialized, 6);
    }

    #[test]
    fn test_entry_room_is_unlocked_lobby() {
        let (dungeon, _) = generated(4);
        let entry = dungeon.get_room_controller(0).unwrap();
        assert!(entry.is_cleared());
        assert!(entry.doors().iter().all(|d| d.state() == DoorState::Closed));
        for room in &dungeon.room_controllers()[1..] {
            assert!(room.doors().iter().all(|d| d.state() == DoorState::Locked));
        }
    }

    #[test]
    fn test_caps_fill_closed_sockets() {
        let (dungeon, _) = generated(5);
        for room in dungeon.room_controllers() {
            assert_eq!(room.doors().len() + room.caps().len(), 6);
        }
    }

    #[test]
    fn test_regenerate_replaces_epoch() {
        let (mut dungeon, mut events) = generated(4);
        dungeon.activate_room(1, Vec3::ZERO, &mut events);
        assert!(dungeon.world().len() > 0);
        dungeon.generate(Some(1), 3, 3, &mut events);
        assert_eq!(dungeon.epoch(), 2);
        assert_eq!(dungeon.room_count(), 3);
        assert_eq!(dungeon.world().len(), 0);
    }

    #[test]
    fn test_clear_all() {
        let (mut dungeon, _) = generated(4);
        dungeon.clear_all();
        assert_eq!(dungeon.room_count(), 0);
        assert!(dungeon.get_room_controller(0).is_none());
    }

    #[test]
    fn test_invalid_indices_are_none() {
        let (dungeon, _) = generated(3);
        assert!(dungeon.get_room_controller(3).is_none());
        assert!(dungeon.get_player_spawn(3).is_none());
        assert!(!dungeon.is_last_room(3));
        assert!(dungeon.is_last_room(2));
        assert!(dungeon.get_next_index(9, Direction::XPlus).is_none());
    }

    #[test]
    fn test_player_spawn_is_offset_from_origin() {
        let (dungeon, _) = generated(3);
        let origin = dungeon.room_origin(1).unwrap();
        assert_eq!(dungeon.get_player_spawn(1), Some(origin + Vec3::from_array(PLAYER_SPAWN_OFFSET)));
    }

    #[test]
    fn test_next_index_follows_doors() {
        let (dungeon, _) = generated(5);
        let (direction, target) = entry_door(&dungeon);
        assert_eq!(dungeon.get_next_index(0, direction), Some(target));
    }

    #[test]
    fn test_room_at_position() {
        let (dungeon, _) = generated(4);
        for index in 0..4 {
            let spawn = dungeon.get_player_spawn(index).unwrap();
            assert_eq!(dungeon.room_at_position(spawn), Some(index));
        }
        assert_eq!(dungeon.room_at_position(Vec3::new(0.0, -50.0, 0.0)), None);
    }

    #[test]
    fn test_open_door_forces_mirror_open() {
        let (mut dungeon, mut events) = generated(4);
        let (direction, target) = entry_door(&dungeon);
        assert_eq!(
            dungeon.get_room_controller(target).unwrap().get_door(direction.opposite()).unwrap().state(),
            DoorState::Locked
        );
        assert!(dungeon.open_door(0, direction, &mut events));
        let mirror = dungeon.get_room_controller(target).unwrap().get_door(direction.opposite()).unwrap();
        assert_eq!(mirror.state(), DoorState::Opened);
        assert!(mirror.is_permanently_open());

        // Later locking by the target room leaves the doorway open.
        dungeon.lock_doors(target, true, &mut events);
        let mirror = dungeon.get_room_controller(target).unwrap().get_door(direction.opposite()).unwrap();
        assert_eq!(mirror.state(), DoorState::Opened);
    }

    #[test]
    fn test_open_locked_door_fails() {
        let (mut dungeon, mut events) = generated(4);
        let (direction, target) = entry_door(&dungeon);
        assert!(!dungeon.open_door(target, direction.opposite(), &mut events));
        assert!(!dungeon.open_door(99, direction, &mut events));
    }

    #[test]
    fn test_interact_opens_aimed_door() {
        let (mut dungeon, mut events) = generated(4);
        let (direction, _) = entry_door(&dungeon);
        let door_pos = dungeon.get_room_controller(0).unwrap().get_door(direction).unwrap().position;
        let aim = direction.step().as_vec3();
        let probe = AimProbe::new(door_pos - aim * 2.5, aim);
        assert!(dungeon.prompt_visible(0, direction, &probe));
        assert_eq!(dungeon.interact(&probe, &mut events), Some(DoorLink { room: 0, direction }));
        assert!(!dungeon.prompt_visible(0, direction, &probe));
    }

    #[test]
    fn test_interact_out_of_range() {
        let (mut dungeon, mut events) = generated(4);
        let (direction, _) = entry_door(&dungeon);
        let door_pos = dungeon.get_room_controller(0).unwrap().get_door(direction).unwrap().position;
        let aim = direction.step().as_vec3();
        let probe = AimProbe::new(door_pos - aim * 7.0, aim);
        assert_eq!(dungeon.interact(&probe, &mut events), None);
    }

    #[test]
    fn test_damage_kills_and_notifies_room() {
        let (mut dungeon, mut events) = generated(3);
        dungeon.activate_room(1, Vec3::ZERO, &mut events);
        let enemies = dungeon.enemies_in(1);
        assert_eq!(enemies.len(), 3);

        assert!(!dungeon.damage_enemy(enemies[0], 5, &mut events));
        assert!(dungeon.damage_enemy(enemies[0], ENEMY_HEALTH, &mut events));
        assert!(!dungeon.world().contains(enemies[0]));
        assert_eq!(dungeon.get_room_controller(1).unwrap().remaining_enemies(), 2);

        assert!(!dungeon.enemy_died(enemies[0], &mut events));
        assert!(dungeon.enemy_died(enemies[1], &mut events));
        assert!(dungeon.enemy_died(enemies[2], &mut events));
        assert!(dungeon.get_room_controller(1).unwrap().is_cleared());
    }

    #[test]
    fn test_cinematic_generation_defers_materialization() {
        let mut dungeon = Dungeon::new(config(7));
        let scheduler = dungeon.generate_cinematic(Some(5), 7, 3);
        assert_eq!(dungeon.room_count(), 7);
        assert_eq!(dungeon.materialized_count(), 0);
        assert!(!scheduler.is_finished(&dungeon));
    }

    #[test]
    fn test_late_materialized_mirror_stays_open() {
        let mut events = EventQueue::new();
        let mut dungeon = Dungeon::new(config(4));
        dungeon.generate_cinematic(Some(5), 4, 3);
        dungeon.materialize_next(1, &mut events);
        let (direction, target) = entry_door(&dungeon);
        assert!(dungeon.open_door(0, direction, &mut events));

        dungeon.materialize_next(usize::MAX, &mut events);
        let mirror = dungeon.get_room_controller(target).unwrap().get_door(direction.opposite()).unwrap();
        assert_eq!(mirror.state(), DoorState::Opened);
    }
}
