//! Obstacle field generation for room interiors.
//!
//! A room's interior (its total size minus the walls) is coarsened into cubic
//! blocks. Each block is seeded alive from a cheap 3D fBM (three 2D Perlin
//! projections averaged per octave), the block lattice is smoothed with a 26-neighbor
//! cellular automaton, and every surviving block yields one placement at its center.

use crate::config::ObstacleConfig;
use crate::constants::*;
use crate::error::{DungeonError, Result};
use glam::{IVec3, Vec3};
use noise::{NoiseFn, Perlin};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Fractal noise parameters for the initial fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// When disabled every block samples 0.5.
    pub enabled: bool,
    pub scale: f32,
    pub octaves: u32,
    pub gain: f32,
    pub lacunarity: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            enabled: true,
            scale: NOISE_SCALE,
            octaves: NOISE_OCTAVES,
            gain: NOISE_GAIN,
            lacunarity: NOISE_LACUNARITY,
        }
    }
}

impl NoiseParams {
    pub fn clamped(self) -> Self {
        Self {
            enabled: self.enabled,
            scale: self.scale.clamp(0.01, 1.0),
            octaves: self.octaves.clamp(1, 6),
            gain: self.gain.clamp(0.1, 1.0),
            lacunarity: self.lacunarity.clamp(1.5, 4.0),
        }
    }
}

/// Cellular automaton smoothing rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomatonParams {
    pub smooth_steps: u32,
    /// A live block with fewer live neighbors than this dies.
    pub death_limit: u32,
    /// A dead block with more live neighbors than this is born.
    pub birth_limit: u32,
}

impl Default for AutomatonParams {
    fn default() -> Self {
        Self {
            smooth_steps: CA_SMOOTH_STEPS,
            death_limit: CA_DEATH_LIMIT,
            birth_limit: CA_BIRTH_LIMIT,
        }
    }
}

impl AutomatonParams {
    pub fn clamped(self) -> Self {
        Self {
            smooth_steps: self.smooth_steps.min(8),
            death_limit: self.death_limit.min(CA_NEIGHBORHOOD),
            birth_limit: self.birth_limit.min(CA_NEIGHBORHOOD),
        }
    }
}

/// Geometry of a room as seen by the obstacle generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomBounds {
    pub total_size: IVec3,
    pub wall_thickness: i32,
    pub unit_size: f32,
    pub origin_at_corner: bool,
}

impl RoomBounds {
    pub fn from_config(config: &ObstacleConfig) -> Self {
        Self {
            total_size: config.total_size,
            wall_thickness: config.wall_thickness,
            unit_size: config.unit_size,
            origin_at_corner: config.origin_at_corner,
        }
    }

    /// First interior cell on each axis (inclusive).
    pub fn interior_min(&self) -> IVec3 {
        IVec3::splat(self.wall_thickness)
    }

    /// Last interior cell on each axis (inclusive).
    pub fn interior_max(&self) -> IVec3 {
        self.total_size - IVec3::splat(self.wall_thickness + 1)
    }

    pub fn interior_size(&self) -> IVec3 {
        self.total_size - IVec3::splat(2 * self.wall_thickness)
    }

    /// Room-local position of the minimum corner, relative to the room pivot.
    fn local_min(&self) -> Vec3 {
        if self.origin_at_corner {
            Vec3::ZERO
        } else {
            -0.5 * self.total_size.as_vec3() * self.unit_size
        }
    }

    /// Room-local center of an absolute cell.
    pub fn cell_to_local(&self, cell: IVec3) -> Vec3 {
        self.local_min() + (cell.as_vec3() + Vec3::splat(0.5)) * self.unit_size
    }
}

/// Boolean block lattice. Out-of-bounds reads are dead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObstacleLattice {
    dims: [usize; 3],
    cells: Vec<bool>,
}

impl ObstacleLattice {
    pub fn new(dims: [usize; 3]) -> Self {
        Self {
            dims,
            cells: vec![false; dims[0] * dims[1] * dims[2]],
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.dims[1] + y) * self.dims[2] + z
    }

    pub fn get(&self, x: i64, y: i64, z: i64) -> bool {
        if x < 0 || y < 0 || z < 0 {
            return false;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        if x >= self.dims[0] || y >= self.dims[1] || z >= self.dims[2] {
            return false;
        }
        self.cells[self.index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, alive: bool) {
        let idx = self.index(x, y, z);
        self.cells[idx] = alive;
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Live cells among the 26 neighbors of (x, y, z).
    pub fn live_neighbors(&self, x: usize, y: usize, z: usize) -> u32 {
        let (x, y, z) = (x as i64, y as i64, z as i64);
        let mut count = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    if self.get(x + dx, y + dy, z + dz) {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// One synchronous automaton generation.
    pub fn step(&self, rules: &AutomatonParams) -> Self {
        let mut next = Self::new(self.dims);
        for x in 0..self.dims[0] {
            for y in 0..self.dims[1] {
                for z in 0..self.dims[2] {
                    let neighbors = self.live_neighbors(x, y, z);
                    let alive = if self.cells[self.index(x, y, z)] {
                        neighbors >= rules.death_limit
                    } else {
                        neighbors > rules.birth_limit
                    };
                    next.set(x, y, z, alive);
                }
            }
        }
        next
    }

    /// Live blocks in x-major, z-minor order.
    pub fn live_blocks(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let [_, by, bz] = self.dims;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(move |(i, _)| [i / (by * bz), (i / bz) % by, i % bz])
    }
}

/// Fractal noise in [0, 1], built from 2D projections on the xz, yx and yz planes.
fn fbm3d(perlin: &Perlin, p: Vec3, params: &NoiseParams) -> f32 {
    let mut amplitude = 1.0f32;
    let mut frequency = params.scale;
    let mut sum = 0.0f32;
    let mut total_amplitude = 0.0f32;

    let planes = [(p.x, p.z), (p.y, p.x), (p.y, p.z)];
    for _ in 0..params.octaves {
        let mut octave = 0.0f32;
        for ((a, b), [oa, ob]) in planes.iter().zip(NOISE_PLANE_OFFSETS) {
            let sample = perlin.get([
                f64::from((a + oa) * frequency),
                f64::from((b + ob) * frequency),
            ]) as f32;
            octave += ((sample + 1.0) * 0.5).clamp(0.0, 1.0);
        }
        sum += octave / 3.0 * amplitude;
        total_amplitude += amplitude;
        amplitude *= params.gain;
        frequency *= params.lacunarity;
    }

    if total_amplitude > 0.0 {
        sum / total_amplitude
    } else {
        0.5
    }
}

/// Result of one obstacle rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleField {
    /// Block centers, local to the room pivot.
    pub placements: Vec<Vec3>,
    /// Absolute cell each placement was taken from.
    pub cells: Vec<IVec3>,
    /// World-space edge length of one placed block.
    pub block_extent: f32,
    pub lattice_dims: [usize; 3],
    pub seed: u64,
}

impl ObstacleField {
    pub fn total_blocks(&self) -> usize {
        self.lattice_dims.iter().product()
    }

    /// Placements translated by the room's world origin.
    pub fn world_placements(&self, origin: Vec3) -> impl Iterator<Item = Vec3> + '_ {
        self.placements.iter().map(move |p| origin + *p)
    }
}

/// Seed the block lattice from noise and the fill threshold.
pub fn seed_lattice(
    dims: [usize; 3],
    block_size: i32,
    base_fill: f32,
    seed: u64,
    noise: &NoiseParams,
) -> ObstacleLattice {
    let mut rng = StdRng::seed_from_u64(seed);
    let offset = Vec3::new(
        rng.gen_range(0..NOISE_OFFSET_RANGE) as f32,
        rng.gen_range(0..NOISE_OFFSET_RANGE) as f32,
        rng.gen_range(0..NOISE_OFFSET_RANGE) as f32,
    );
    let perlin = Perlin::new(rng.gen());
    let threshold = 1.0 - base_fill;
    let block = block_size as f32;

    let mut lattice = ObstacleLattice::new(dims);
    for x in 0..dims[0] {
        for y in 0..dims[1] {
            for z in 0..dims[2] {
                let sample = if noise.enabled {
                    let center = (Vec3::new(x as f32, y as f32, z as f32) + Vec3::splat(0.5)) * block;
                    fbm3d(&perlin, center + offset, noise)
                } else {
                    0.5
                };
                lattice.set(x, y, z, sample >= threshold);
            }
        }
    }
    lattice
}

/// Build the obstacle field for one room interior.
///
/// Deterministic for a fixed `seed`. Fails only when the walls leave no interior.
pub fn build_field(
    bounds: &RoomBounds,
    block_size: i32,
    base_fill: f32,
    seed: u64,
    noise: &NoiseParams,
    rules: &AutomatonParams,
    max_obstacles: usize,
) -> Result<ObstacleField> {
    puffin::profile_function!();

    let interior = bounds.interior_size();
    if interior.min_element() <= 0 {
        return Err(DungeonError::DegenerateInterior {
            size: interior.to_array(),
        });
    }
    let block_size = block_size.max(1);
    let dims = [
        (interior.x as usize).div_ceil(block_size as usize),
        (interior.y as usize).div_ceil(block_size as usize),
        (interior.z as usize).div_ceil(block_size as usize),
    ];

    let mut lattice = seed_lattice(dims, block_size, base_fill, seed, noise);
    {
        puffin::profile_scope!("obstacle_automaton");
        for _ in 0..rules.smooth_steps {
            lattice = lattice.step(rules);
        }
    }

    let total = lattice.len();
    let cap = if max_obstacles > 0 {
        max_obstacles.min(total)
    } else {
        total
    };

    let interior_min = bounds.interior_min();
    let half = block_size / 2;
    let mut placements = Vec::new();
    let mut cells = Vec::new();
    for [x, y, z] in lattice.live_blocks().take(cap) {
        let start = IVec3::new(x as i32, y as i32, z as i32) * block_size;
        let center = (start + IVec3::splat(half)).min(interior - IVec3::ONE);
        let cell = interior_min + center;
        cells.push(cell);
        placements.push(bounds.cell_to_local(cell));
    }

    log::debug!(
        "Obstacle field: {} of {} blocks placed (seed {}, lattice {:?})",
        placements.len(),
        total,
        seed,
        dims
    );

    Ok(ObstacleField {
        placements,
        cells,
        block_extent: bounds.unit_size * block_size as f32,
        lattice_dims: dims,
        seed,
    })
}

/// Per-room obstacle builder that rebuilds at most once.
#[derive(Debug, Clone)]
pub struct ObstaclePlacer {
    config: ObstacleConfig,
    field: Option<ObstacleField>,
}

impl ObstaclePlacer {
    pub fn new(config: ObstacleConfig) -> Self {
        Self {
            config,
            field: None,
        }
    }

    pub fn is_built(&self) -> bool {
        self.field.is_some()
    }

    pub fn field(&self) -> Option<&ObstacleField> {
        self.field.as_ref()
    }

    /// Build the field unless it was already built.
    ///
    /// Returns `Ok(true)` if a field was built by this call.
    pub fn rebuild(&mut self, rng: &mut impl Rng) -> Result<bool> {
        if self.field.is_some() {
            return Ok(false);
        }
        let seed = if self.config.randomize_seed_on_rebuild {
            rng.gen()
        } else {
            self.config.seed
        };
        let c = &self.config;
        let field = build_field(
            &RoomBounds::from_config(c),
            c.block_size,
            c.base_fill,
            seed,
            &c.noise,
            &c.automaton,
            c.max_obstacles,
        )?;
        self.field = Some(field);
        Ok(true)
    }

    /// Drop the built field so the next activation may rebuild.
    pub fn clear(&mut self) {
        self.field = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(size: i32, wall: i32) -> RoomBounds {
        RoomBounds {
            total_size: IVec3::splat(size),
            wall_thickness: wall,
            unit_size: 1.0,
            origin_at_corner: true,
        }
    }

    fn no_smoothing() -> AutomatonParams {
        AutomatonParams {
            smooth_steps: 0,
            ..AutomatonParams::default()
        }
    }

    #[test]
    fn test_interior_bounds() {
        let b = bounds(32, 4);
        assert_eq!(b.interior_min(), IVec3::splat(4));
        assert_eq!(b.interior_max(), IVec3::splat(27));
        assert_eq!(b.interior_size(), IVec3::splat(24));
    }

    #[test]
    fn test_degenerate_interior_is_error() {
        let result = build_field(
            &bounds(8, 4),
            2,
            0.5,
            1,
            &NoiseParams::default(),
            &AutomatonParams::default(),
            0,
        );
        assert!(matches!(result, Err(DungeonError::DegenerateInterior { .. })));
    }

    #[test]
    fn test_same_seed_same_field() {
        let b = bounds(32, 4);
        let a = build_field(&b, 2, 0.48, 77, &NoiseParams::default(), &AutomatonParams::default(), 0)
            .unwrap();
        let c = build_field(&b, 2, 0.48, 77, &NoiseParams::default(), &AutomatonParams::default(), 0)
            .unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_full_fill_without_noise_places_every_block() {
        let noise = NoiseParams {
            enabled: false,
            ..NoiseParams::default()
        };
        let field = build_field(&bounds(12, 2), 2, 1.0, 5, &noise, &no_smoothing(), 0).unwrap();
        assert_eq!(field.lattice_dims, [4, 4, 4]);
        assert_eq!(field.placements.len(), 64);
    }

    #[test]
    fn test_low_fill_without_noise_places_nothing() {
        let noise = NoiseParams {
            enabled: false,
            ..NoiseParams::default()
        };
        let field = build_field(&bounds(12, 2), 2, 0.4, 5, &noise, &no_smoothing(), 0).unwrap();
        assert!(field.placements.is_empty());
    }

    #[test]
    fn test_cap_limits_placements() {
        let noise = NoiseParams {
            enabled: false,
            ..NoiseParams::default()
        };
        let field = build_field(&bounds(12, 2), 2, 1.0, 5, &noise, &no_smoothing(), 10).unwrap();
        assert_eq!(field.placements.len(), 10);
    }

    #[test]
    fn test_uneven_interior_rounds_blocks_up_and_clamps_centers() {
        // interior 5 with block 2 -> 3 blocks, last center clamped to cell 4
        let noise = NoiseParams {
            enabled: false,
            ..NoiseParams::default()
        };
        let b = bounds(9, 2);
        let field = build_field(&b, 2, 1.0, 5, &noise, &no_smoothing(), 0).unwrap();
        assert_eq!(field.lattice_dims, [3, 3, 3]);
        for cell in &field.cells {
            assert!(cell.cmpge(b.interior_min()).all());
            assert!(cell.cmple(b.interior_max()).all());
        }
        assert!(field.cells.contains(&IVec3::splat(6)));
    }

    #[test]
    fn test_centered_pivot_offsets_placements() {
        let noise = NoiseParams {
            enabled: false,
            ..NoiseParams::default()
        };
        let mut b = bounds(12, 2);
        b.origin_at_corner = false;
        let field = build_field(&b, 2, 1.0, 5, &noise, &no_smoothing(), 1).unwrap();
        // first block center cell is (3,3,3); -6 + 3.5 = -2.5
        assert_eq!(field.placements[0], Vec3::splat(-2.5));
    }

    #[test]
    fn test_isolated_cell_dies() {
        let mut lattice = ObstacleLattice::new([3, 3, 3]);
        lattice.set(1, 1, 1, true);
        let next = lattice.step(&AutomatonParams::default());
        assert_eq!(next.live_count(), 0);
    }

    #[test]
    fn test_dense_cell_is_born() {
        let mut lattice = ObstacleLattice::new([3, 3, 3]);
        for x in 0..3 {
            for y in 0..3 {
                for z in 0..3 {
                    lattice.set(x, y, z, !(x == 1 && y == 1 && z == 1));
                }
            }
        }
        assert_eq!(lattice.live_neighbors(1, 1, 1), 26);
        let next = lattice.step(&AutomatonParams::default());
        assert!(next.get(1, 1, 1));
    }

    #[test]
    fn test_out_of_bounds_neighbors_are_dead() {
        let mut lattice = ObstacleLattice::new([2, 2, 2]);
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    lattice.set(x, y, z, true);
                }
            }
        }
        assert_eq!(lattice.live_neighbors(0, 0, 0), 7);
        assert!(!lattice.get(-1, 0, 0));
        assert!(!lattice.get(0, 2, 0));
    }

    #[test]
    fn test_fbm_stays_in_unit_range() {
        let perlin = Perlin::new(3);
        let params = NoiseParams {
            octaves: 4,
            ..NoiseParams::default()
        };
        for i in 0..200 {
            let p = Vec3::new(i as f32 * 1.7, i as f32 * 0.3, i as f32 * 2.9);
            let n = fbm3d(&perlin, p, &params);
            assert!((0.0..=1.0).contains(&n));
        }
    }

    #[test]
    fn test_placer_rebuilds_once() {
        let mut placer = ObstaclePlacer::new(ObstacleConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(placer.rebuild(&mut rng).unwrap());
        let first = placer.field().cloned();
        assert!(!placer.rebuild(&mut rng).unwrap());
        assert_eq!(placer.field().cloned(), first);
    }

    #[test]
    fn test_placer_uses_fixed_seed_when_not_randomized() {
        let config = ObstacleConfig {
            randomize_seed_on_rebuild: false,
            seed: 99,
            ..ObstacleConfig::default()
        };
        let mut placer = ObstaclePlacer::new(config);
        placer.rebuild(&mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(placer.field().map(|f| f.seed), Some(99));
    }
}
