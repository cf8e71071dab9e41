//! Procedurally generated cubic-room dungeons.
//!
//! Rooms grow on an integer lattice, each combat room locks its doors until
//! its enemies are dead, and a run controller walks the player from the entry
//! room to the last room in creation order.

pub mod components;
pub mod config;
pub mod constants;
pub mod direction;
pub mod door;
pub mod dungeon_gen;
pub mod engine;
pub mod error;
pub mod events;
pub mod obstacles;
pub mod room;
pub mod spawning;

pub use config::DungeonConfig;
pub use engine::{Dungeon, GameEngine, RunState, TickResult};
pub use error::{DungeonError, Result};
