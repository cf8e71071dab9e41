//! Enemy spawning constants.

/// Enemies spawned per spawn point
pub const SPAWN_ENEMY_COUNT: usize = 10;
/// Horizontal scatter around the anchor (+/- on x and z)
pub const SPAWN_RANGE: f32 = 20.0;
/// Default enemy health
pub const ENEMY_HEALTH: i32 = 20;
/// Player spawn offset from the room origin
pub const PLAYER_SPAWN_OFFSET: [f32; 3] = [0.0, 1.0, 0.0];
