//! Room lattice layout constants.

/// World-space size of one lattice cell (x, y, z)
pub const CELL_SIZE: [f32; 3] = [16.0, 16.0, 16.0];
/// Room cap for a single generation
pub const MAX_ROOMS: usize = 25;
/// New neighbors a single frontier pick may create
pub const MAX_CHILDREN_PER_ROOM: usize = 3;
/// Inset applied to each axis of the room-enter volume
pub const ROOM_ENTER_VOLUME_INSET: f32 = 2.0;
/// Smallest extent the room-enter volume may shrink to
pub const ROOM_ENTER_VOLUME_MIN: f32 = 0.1;
/// Chance that a non-entry room becomes a shop
pub const SHOP_ROOM_CHANCE: f32 = 0.0;
/// Chance that a non-entry room becomes a puzzle room
pub const PUZZLE_ROOM_CHANCE: f32 = 0.0;
/// Index of the lobby room in creation order
pub const ENTRY_ROOM_INDEX: usize = 0;
