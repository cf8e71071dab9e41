//! Obstacle field defaults (room interior fill).

/// Room size in lattice units per axis
pub const OBSTACLE_TOTAL_SIZE: [i32; 3] = [32, 32, 32];
/// Wall thickness stripped from each side of the room
pub const OBSTACLE_WALL_THICKNESS: i32 = 4;
/// World size of one room unit
pub const OBSTACLE_UNIT_SIZE: f32 = 1.0;
/// Edge length of a coarse obstacle block, in room units
pub const OBSTACLE_BLOCK_SIZE: i32 = 2;
/// Base fill ratio; a block seeds alive when noise >= 1 - fill
pub const OBSTACLE_BASE_FILL: f32 = 0.48;
/// Fixed seed used when reseeding on rebuild is disabled
pub const OBSTACLE_SEED: u64 = 12345;

/// Base noise frequency (smaller = larger clusters)
pub const NOISE_SCALE: f32 = 0.2;
pub const NOISE_OCTAVES: u32 = 2;
/// Amplitude decay per octave
pub const NOISE_GAIN: f32 = 0.5;
/// Frequency multiplier per octave
pub const NOISE_LACUNARITY: f32 = 2.0;
/// Range of the random per-rebuild noise offset
pub const NOISE_OFFSET_RANGE: i32 = 10_000;
/// Per-plane offsets that decorrelate the three 2D projections
pub const NOISE_PLANE_OFFSETS: [[f32; 2]; 3] = [[19.1, 73.2], [37.7, 11.8], [53.4, 29.6]];

/// Cellular automaton smoothing passes
pub const CA_SMOOTH_STEPS: u32 = 1;
/// A live block with fewer live neighbors dies
pub const CA_DEATH_LIMIT: u32 = 9;
/// A dead block with more live neighbors is born
pub const CA_BIRTH_LIMIT: u32 = 14;
/// Neighbor count of a block in a 3D Moore neighborhood
pub const CA_NEIGHBORHOOD: u32 = 26;

/// Placement cap; 0 means "every block"
pub const MAX_OBSTACLES: usize = 0;
