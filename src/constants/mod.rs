//! Dungeon constants organized by domain.
//!
//! These are the defaults behind `DungeonConfig`; every one of them can be
//! overridden from a config file.

mod doors;
mod layout;
mod materialize;
mod obstacles;
mod spawning;

pub use doors::*;
pub use layout::*;
pub use materialize::*;
pub use obstacles::*;
pub use spawning::*;
