//! Data-driven enemy spawning.
//!
//! Enemy types are plain definitions and rooms carry spawn points that say
//! which enemy, how many and where. Spawned enemies are `hecs` entities.

use crate::components::{Enemy, Health, Position, RoomMember};
use crate::config::SpawnConfig;
use glam::Vec3;
use hecs::{Entity, World};
use rand::Rng;

/// Definition of an enemy type - all the data needed to spawn one
#[derive(Clone, Debug, PartialEq)]
pub struct EnemyDef {
    /// Display name (for logs)
    pub name: &'static str,
    /// Maximum health
    pub health: i32,
}

impl EnemyDef {
    /// Spawn this enemy type at the given position, counted by `room`
    pub fn spawn(&self, world: &mut World, position: Vec3, room: usize) -> Entity {
        world.spawn((
            Position::new(position),
            Health::new(self.health),
            Enemy { name: self.name },
            RoomMember { room },
        ))
    }
}

/// Predefined enemy types
pub mod enemies {
    use super::*;
    use crate::constants::ENEMY_HEALTH;

    pub const GRUNT: EnemyDef = EnemyDef {
        name: "Grunt",
        health: ENEMY_HEALTH,
    };
}

/// Where a spawn point scatters its enemies around.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnAnchor {
    /// Around the agent that activated the room.
    Agent,
    /// Around a point relative to the room pivot.
    Room(Vec3),
}

/// A spawner attached to a room.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnPoint {
    pub enemy: EnemyDef,
    pub count: usize,
    /// Horizontal scatter, +/- on x and z.
    pub range: f32,
    pub anchor: SpawnAnchor,
}

impl SpawnPoint {
    pub fn from_config(config: &SpawnConfig) -> Self {
        Self {
            enemy: EnemyDef {
                health: config.enemy_health,
                ..enemies::GRUNT
            },
            count: config.enemy_count,
            range: config.spawn_range,
            anchor: SpawnAnchor::Agent,
        }
    }

    /// Spawn `count` enemies and return their handles.
    pub fn spawn(
        &self,
        world: &mut World,
        room: usize,
        room_origin: Vec3,
        agent: Vec3,
        rng: &mut impl Rng,
    ) -> Vec<Entity> {
        let center = match self.anchor {
            SpawnAnchor::Agent => agent,
            SpawnAnchor::Room(offset) => room_origin + offset,
        };
        (0..self.count)
            .map(|_| {
                let scatter = if self.range > 0.0 {
                    Vec3::new(
                        rng.gen_range(-self.range..self.range),
                        0.0,
                        rng.gen_range(-self.range..self.range),
                    )
                } else {
                    Vec3::ZERO
                };
                self.enemy.spawn(world, center + scatter, room)
            })
            .collect()
    }
}

/// Spawn points for a combat room built from config.
pub fn default_spawn_points(config: &SpawnConfig) -> Vec<SpawnPoint> {
    (0..config.spawn_points_per_room)
        .map(|_| SpawnPoint::from_config(config))
        .collect()
}
