use crate::config::RoomKindConfig;
use crate::constants::*;
use crate::direction::{directions_in_mask, Direction};
use glam::IVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Integer lattice coordinate of a room. Unique key for rooms.
pub type GridCoord = IVec3;

/// What a room is used for. Only combat rooms spawn enemies and lock their doors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoomKind {
    #[default]
    Default,
    Combat,
    Shop,
    Puzzle,
}

/// A room on the lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub coord: GridCoord,
    /// Bit `d` set iff direction `d` has a door.
    pub door_mask: u8,
    pub kind: RoomKind,
    /// Creation order. The stable public handle of the room.
    pub index: usize,
}

impl Room {
    pub fn has_door(&self, dir: Direction) -> bool {
        self.door_mask & dir.mask() != 0
    }

    /// Directions with a door, in code order.
    pub fn door_directions(&self) -> impl Iterator<Item = Direction> {
        directions_in_mask(self.door_mask)
    }

    pub fn door_count(&self) -> u32 {
        self.door_mask.count_ones()
    }
}

/// One frontier pick during growth and how many rooms it produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrontierPick {
    pub coord: GridCoord,
    pub children: usize,
}

/// Room topology produced by [`DungeonGenerator::generate`].
#[derive(Clone, Debug, Default)]
pub struct DungeonGraph {
    by_coord: HashMap<GridCoord, usize>,
    rooms: Vec<Room>,
    /// Coordinates still eligible to grow when generation stopped.
    pub frontier: Vec<GridCoord>,
    /// Growth history, one entry per frontier pick.
    pub picks: Vec<FrontierPick>,
}

impl DungeonGraph {
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Rooms in creation order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, index: usize) -> Option<&Room> {
        self.rooms.get(index)
    }

    pub fn room_at(&self, coord: GridCoord) -> Option<&Room> {
        self.by_coord.get(&coord).map(|&i| &self.rooms[i])
    }

    pub fn index_of(&self, coord: GridCoord) -> Option<usize> {
        self.by_coord.get(&coord).copied()
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.by_coord.contains_key(&coord)
    }

    /// Index of the room one step from `index` in `dir`, whether or not a door joins them.
    pub fn neighbor_index(&self, index: usize, dir: Direction) -> Option<usize> {
        let room = self.rooms.get(index)?;
        self.index_of(room.coord + dir.step())
    }

    pub fn is_last(&self, index: usize) -> bool {
        !self.rooms.is_empty() && index == self.rooms.len() - 1
    }

    fn place_room(&mut self, coord: GridCoord) -> usize {
        let index = self.rooms.len();
        self.rooms.push(Room {
            coord,
            door_mask: 0,
            kind: RoomKind::Default,
            index,
        });
        self.by_coord.insert(coord, index);
        index
    }

    /// Open the door bits on both sides of the edge `from -> from + dir`.
    fn connect(&mut self, from: usize, dir: Direction) {
        let to_coord = self.rooms[from].coord + dir.step();
        self.rooms[from].door_mask |= dir.mask();
        if let Some(&to) = self.by_coord.get(&to_coord) {
            self.rooms[to].door_mask |= dir.opposite().mask();
        }
    }

    /// Roll kinds for every room. The entry room is always the non-combat lobby.
    pub fn assign_kinds(&mut self, kinds: &RoomKindConfig, rng: &mut impl Rng) {
        for room in &mut self.rooms {
            room.kind = if room.index == ENTRY_ROOM_INDEX {
                RoomKind::Default
            } else {
                let roll: f32 = rng.gen();
                if roll < kinds.shop_chance {
                    RoomKind::Shop
                } else if roll < kinds.shop_chance + kinds.puzzle_chance {
                    RoomKind::Puzzle
                } else {
                    RoomKind::Combat
                }
            };
        }
    }

    /// Override a room's kind.
    pub fn set_kind(&mut self, index: usize, kind: RoomKind) {
        if let Some(room) = self.rooms.get_mut(index) {
            room.kind = kind;
        }
    }

    /// Resolve every socket of every room into a door or a cap.
    pub fn socket_plan(&self) -> Vec<RoomSockets> {
        self.rooms.iter().map(|room| self.sockets_for(room)).collect()
    }

    pub fn sockets_for(&self, room: &Room) -> RoomSockets {
        let fittings = Direction::SOCKET_ORDER
            .iter()
            .map(|&direction| {
                if room.has_door(direction) {
                    SocketFitting::Door {
                        direction,
                        target: self.index_of(room.coord + direction.step()),
                    }
                } else {
                    SocketFitting::Cap {
                        direction,
                        vertical: direction.is_vertical(),
                    }
                }
            })
            .collect();
        RoomSockets {
            room: room.index,
            fittings,
        }
    }
}

/// What gets attached to one socket of a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketFitting {
    /// An open side. `target` is the neighbor's creation index.
    Door {
        direction: Direction,
        target: Option<usize>,
    },
    /// A closed side, capped with cosmetic geometry.
    Cap { direction: Direction, vertical: bool },
}

impl SocketFitting {
    pub fn direction(&self) -> Direction {
        match *self {
            SocketFitting::Door { direction, .. } | SocketFitting::Cap { direction, .. } => direction,
        }
    }
}

/// Socket fittings of one room, in socket order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomSockets {
    pub room: usize,
    pub fittings: Vec<SocketFitting>,
}

impl RoomSockets {
    pub fn doors(&self) -> impl Iterator<Item = (Direction, Option<usize>)> + '_ {
        self.fittings.iter().filter_map(|f| match *f {
            SocketFitting::Door { direction, target } => Some((direction, target)),
            SocketFitting::Cap { .. } => None,
        })
    }

    pub fn caps(&self) -> impl Iterator<Item = Direction> + '_ {
        self.fittings.iter().filter_map(|f| match *f {
            SocketFitting::Cap { direction, .. } => Some(direction),
            SocketFitting::Door { .. } => None,
        })
    }
}

/// Randomized frontier growth on the integer lattice.
pub struct DungeonGenerator {
    max_rooms: usize,
    max_children_per_room: usize,
}

impl DungeonGenerator {
    pub fn new(max_rooms: usize, max_children_per_room: usize) -> Self {
        Self {
            max_rooms,
            max_children_per_room,
        }
    }

    /// Build the RNG for a generation. `None` draws from entropy.
    pub fn rng_for(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Generate a room graph. Deterministic for `Some(seed)`.
    pub fn generate(seed: Option<u64>, max_rooms: usize, max_children_per_room: usize) -> DungeonGraph {
        let mut rng = Self::rng_for(seed);
        Self::new(max_rooms, max_children_per_room).grow(&mut rng)
    }

    /// Grow a graph from the origin using `rng`.
    ///
    /// Each pass removes a uniformly random frontier entry, shuffles the six
    /// directions, and places up to `max_children_per_room` new rooms on free
    /// neighbors. Doors are opened only along the edges created here.
    pub fn grow(&self, rng: &mut impl Rng) -> DungeonGraph {
        puffin::profile_function!();

        let mut graph = DungeonGraph::default();
        let start = graph.place_room(GridCoord::ZERO);
        graph.frontier.push(graph.rooms[start].coord);

        while graph.len() < self.max_rooms && !graph.frontier.is_empty() {
            let pick = rng.gen_range(0..graph.frontier.len());
            let current = graph.frontier.remove(pick);
            let Some(current_index) = graph.index_of(current) else {
                continue;
            };

            let mut dirs = Direction::ALL;
            for i in 0..dirs.len() {
                let j = rng.gen_range(i..dirs.len());
                dirs.swap(i, j);
            }

            let mut children = 0;
            for dir in dirs {
                if graph.len() >= self.max_rooms || children >= self.max_children_per_room {
                    break;
                }
                let next = current + dir.step();
                if graph.contains(next) {
                    continue;
                }
                graph.place_room(next);
                graph.connect(current_index, dir);
                graph.frontier.push(next);
                children += 1;
            }

            graph.picks.push(FrontierPick {
                coord: current,
                children,
            });
        }

        log::debug!(
            "Grew {} rooms in {} frontier picks ({} left on frontier)",
            graph.len(),
            graph.picks.len(),
            graph.frontier.len()
        );
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manhattan(a: GridCoord, b: GridCoord) -> i32 {
        let d = (a - b).abs();
        d.x + d.y + d.z
    }

    #[test]
    fn test_single_room_has_no_doors() {
        let graph = DungeonGenerator::generate(Some(3), 1, 3);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.rooms()[0].coord, GridCoord::ZERO);
        assert_eq!(graph.rooms()[0].door_mask, 0);
        assert_eq!(graph.socket_plan()[0].doors().count(), 0);
        assert_eq!(graph.socket_plan()[0].caps().count(), 6);
    }

    #[test]
    fn test_zero_max_rooms_still_places_origin() {
        let graph = DungeonGenerator::generate(Some(3), 0, 3);
        assert_eq!(graph.len(), 1);
        assert!(graph.picks.is_empty());
    }

    #[test]
    fn test_two_rooms_one_child() {
        for seed in 0..20 {
            let graph = DungeonGenerator::generate(Some(seed), 2, 1);
            assert_eq!(graph.len(), 2);
            let (a, b) = (graph.rooms()[0], graph.rooms()[1]);
            assert_eq!(manhattan(a.coord, b.coord), 1);
            assert_eq!(a.door_count(), 1);
            assert_eq!(b.door_count(), 1);
            let dir = a.door_directions().next().unwrap();
            assert!(b.has_door(dir.opposite()));
            assert_eq!(a.coord + dir.step(), b.coord);
        }
    }

    #[test]
    fn test_same_seed_same_topology() {
        let a = DungeonGenerator::generate(Some(42), 25, 3);
        let b = DungeonGenerator::generate(Some(42), 25, 3);
        assert_eq!(a.rooms(), b.rooms());
        assert_eq!(a.picks, b.picks);
    }

    #[test]
    fn test_children_per_pick_are_capped() {
        let graph = DungeonGenerator::generate(Some(11), 40, 2);
        assert!(graph.picks.iter().all(|p| p.children <= 2));
        assert!(graph.len() <= 40);
    }

    #[test]
    fn test_door_bits_are_bidirectional() {
        let graph = DungeonGenerator::generate(Some(8), 30, 3);
        for room in graph.rooms() {
            for dir in Direction::ALL {
                if room.has_door(dir) {
                    let neighbor = graph.room_at(room.coord + dir.step()).unwrap();
                    assert!(neighbor.has_door(dir.opposite()));
                }
            }
        }
    }

    #[test]
    fn test_growth_is_a_tree() {
        // Doors only follow growth edges, so door pairs = rooms - 1.
        let graph = DungeonGenerator::generate(Some(5), 30, 3);
        let door_bits: u32 = graph.rooms().iter().map(|r| r.door_count()).sum();
        assert_eq!(door_bits as usize, 2 * (graph.len() - 1));
    }

    #[test]
    fn test_indices_follow_creation_order() {
        let graph = DungeonGenerator::generate(Some(9), 15, 3);
        for (i, room) in graph.rooms().iter().enumerate() {
            assert_eq!(room.index, i);
            assert_eq!(graph.index_of(room.coord), Some(i));
        }
    }

    #[test]
    fn test_socket_plan_binds_doors_to_neighbors() {
        let graph = DungeonGenerator::generate(Some(21), 12, 3);
        for sockets in graph.socket_plan() {
            let room = graph.room(sockets.room).unwrap();
            assert_eq!(sockets.fittings.len(), 6);
            for (dir, target) in sockets.doors() {
                let target = target.unwrap();
                assert_eq!(graph.rooms()[target].coord, room.coord + dir.step());
            }
            assert_eq!(sockets.doors().count() as u32, room.door_count());
        }
    }

    #[test]
    fn test_socket_order() {
        let graph = DungeonGenerator::generate(Some(1), 1, 1);
        let order: Vec<_> = graph.socket_plan()[0].fittings.iter().map(|f| f.direction()).collect();
        assert_eq!(order, Direction::SOCKET_ORDER.to_vec());
    }

    #[test]
    fn test_entry_room_is_never_combat() {
        let mut graph = DungeonGenerator::generate(Some(4), 10, 3);
        let mut rng = StdRng::seed_from_u64(4);
        graph.assign_kinds(&RoomKindConfig::default(), &mut rng);
        assert_eq!(graph.rooms()[0].kind, RoomKind::Default);
        assert!(graph.rooms()[1..].iter().all(|r| r.kind == RoomKind::Combat));
    }

    #[test]
    fn test_kind_chances() {
        let mut graph = DungeonGenerator::generate(Some(4), 10, 3);
        let kinds = RoomKindConfig {
            shop_chance: 1.0,
            puzzle_chance: 0.0,
        };
        graph.assign_kinds(&kinds, &mut StdRng::seed_from_u64(1));
        assert!(graph.rooms()[1..].iter().all(|r| r.kind == RoomKind::Shop));
    }

    #[test]
    fn test_neighbor_index_ignores_doors() {
        let graph = DungeonGenerator::generate(Some(2), 2, 1);
        let b = graph.rooms()[1];
        let dir = Direction::ALL
            .into_iter()
            .find(|d| graph.rooms()[0].coord + d.step() == b.coord)
            .unwrap();
        assert_eq!(graph.neighbor_index(0, dir), Some(1));
        assert_eq!(graph.neighbor_index(0, dir.opposite()), None);
        assert_eq!(graph.neighbor_index(7, dir), None);
    }
}
