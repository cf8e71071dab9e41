//! Dungeon configuration.
//!
//! Every parameter has a default taken from `constants`, so a config file only
//! needs to mention what it changes. Configs are plain JSON:
//!
//! ```json
//! { "layout": { "max_rooms": 12, "seed": 7 }, "obstacles": { "block_size": 3 } }
//! ```

use crate::constants::*;
use crate::error::{DungeonError, Result};
use crate::obstacles::{AutomatonParams, NoiseParams};
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for one dungeon instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    pub layout: LayoutConfig,
    pub room_kinds: RoomKindConfig,
    pub obstacles: ObstacleConfig,
    pub doors: DoorConfig,
    pub spawning: SpawnConfig,
    pub materialize: MaterializeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub cell_size: Vec3,
    pub max_rooms: usize,
    pub max_children_per_room: usize,
    /// `None` draws the generation seed from entropy.
    pub seed: Option<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cell_size: Vec3::from_array(CELL_SIZE),
            max_rooms: MAX_ROOMS,
            max_children_per_room: MAX_CHILDREN_PER_ROOM,
            seed: None,
        }
    }
}

/// Chances for a non-entry room to roll a non-combat kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomKindConfig {
    pub shop_chance: f32,
    pub puzzle_chance: f32,
}

impl Default for RoomKindConfig {
    fn default() -> Self {
        Self {
            shop_chance: SHOP_ROOM_CHANCE,
            puzzle_chance: PUZZLE_ROOM_CHANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Room size in units, walls included.
    pub total_size: IVec3,
    pub wall_thickness: i32,
    pub unit_size: f32,
    /// `true` when the room pivot is its minimum corner, `false` for a centered pivot.
    pub origin_at_corner: bool,
    pub block_size: i32,
    pub base_fill: f32,
    pub noise: NoiseParams,
    pub automaton: AutomatonParams,
    /// 0 caps at the total block count.
    pub max_obstacles: usize,
    /// Draw a fresh seed from the dungeon RNG on every rebuild instead of `seed`.
    pub randomize_seed_on_rebuild: bool,
    pub seed: u64,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            total_size: IVec3::from_array(OBSTACLE_TOTAL_SIZE),
            wall_thickness: OBSTACLE_WALL_THICKNESS,
            unit_size: OBSTACLE_UNIT_SIZE,
            origin_at_corner: false,
            block_size: OBSTACLE_BLOCK_SIZE,
            base_fill: OBSTACLE_BASE_FILL,
            noise: NoiseParams::default(),
            automaton: AutomatonParams::default(),
            max_obstacles: MAX_OBSTACLES,
            randomize_seed_on_rebuild: true,
            seed: OBSTACLE_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    pub interact_range: f32,
    /// Half extents of an X-facing door collider; rotated for the other axes.
    pub collider_half_extents: Vec3,
    /// Show the interact prompt only while the door is aimed at.
    pub prompt_only_when_aimed: bool,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            interact_range: DOOR_INTERACT_RANGE,
            collider_half_extents: Vec3::from_array(DOOR_COLLIDER_HALF_EXTENTS),
            prompt_only_when_aimed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Spawn points attached to each combat room.
    pub spawn_points_per_room: usize,
    pub enemy_count: usize,
    pub spawn_range: f32,
    pub enemy_health: i32,
    pub player_spawn_offset: Vec3,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            spawn_points_per_room: 1,
            enemy_count: SPAWN_ENEMY_COUNT,
            spawn_range: SPAWN_RANGE,
            enemy_health: ENEMY_HEALTH,
            player_spawn_offset: Vec3::from_array(PLAYER_SPAWN_OFFSET),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializeConfig {
    pub batch_size: usize,
    /// Seconds between batches.
    pub batch_delay: f32,
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        Self {
            batch_size: MATERIALIZE_BATCH_SIZE,
            batch_delay: MATERIALIZE_BATCH_DELAY,
        }
    }
}

impl DungeonConfig {
    /// Parse a JSON config. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Load, validate and clamp a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| DungeonError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json).map_err(|source| DungeonError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config.validated())
    }

    /// Reject configurations nothing can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.layout.max_rooms == 0 {
            return Err(DungeonError::InvalidConfig {
                field: "layout.max_rooms",
                reason: "must allow at least the entry room".into(),
            });
        }
        if self.layout.cell_size.min_element() <= 0.0 {
            return Err(DungeonError::InvalidConfig {
                field: "layout.cell_size",
                reason: format!("every axis must be positive, got {}", self.layout.cell_size),
            });
        }
        if self.materialize.batch_size == 0 {
            return Err(DungeonError::InvalidConfig {
                field: "materialize.batch_size",
                reason: "must materialize at least one room per batch".into(),
            });
        }
        if self.obstacles.total_size.min_element() <= 0 {
            return Err(DungeonError::InvalidConfig {
                field: "obstacles.total_size",
                reason: format!("every axis must be positive, got {}", self.obstacles.total_size),
            });
        }
        Ok(())
    }

    /// Clamp tunables into their supported ranges.
    pub fn validated(mut self) -> Self {
        let o = &mut self.obstacles;
        let smallest = o.total_size.min_element();
        let max_wall = (smallest / 4).max(1);
        o.wall_thickness = o.wall_thickness.clamp(1, max_wall);
        o.unit_size = o.unit_size.max(0.001);
        o.block_size = o.block_size.max(1);
        o.base_fill = o.base_fill.clamp(0.0, 1.0);
        o.noise = o.noise.clamped();
        o.automaton = o.automaton.clamped();

        let k = &mut self.room_kinds;
        k.shop_chance = k.shop_chance.clamp(0.0, 1.0);
        k.puzzle_chance = k.puzzle_chance.clamp(0.0, 1.0 - k.shop_chance);

        self.materialize.batch_delay = self.materialize.batch_delay.max(0.0);
        self.doors.interact_range = self.doors.interact_range.max(0.0);
        self
    }
}
