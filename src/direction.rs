//! The six axis-aligned directions a room can open toward.
//!
//! Direction arithmetic is table-driven: every direction is a small integer
//! code, and step vectors, opposites and mask bits are plain array lookups.

use glam::IVec3;
use serde::{Deserialize, Serialize};

/// An axis-aligned direction on the room lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    XPlus = 0,
    XMinus = 1,
    YPlus = 2,
    YMinus = 3,
    ZPlus = 4,
    ZMinus = 5,
}

const STEPS: [IVec3; 6] = [
    IVec3::new(1, 0, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 0, -1),
];

const OPPOSITES: [Direction; 6] = [
    Direction::XMinus,
    Direction::XPlus,
    Direction::YMinus,
    Direction::YPlus,
    Direction::ZMinus,
    Direction::ZPlus,
];

impl Direction {
    /// All directions in code order. Generation shuffles a copy of this list,
    /// so its order is part of the deterministic output.
    pub const ALL: [Direction; 6] = [
        Direction::XPlus,
        Direction::XMinus,
        Direction::YPlus,
        Direction::YMinus,
        Direction::ZPlus,
        Direction::ZMinus,
    ];

    /// Socket walk order used when attaching doors and caps to a room.
    pub const SOCKET_ORDER: [Direction; 6] = [
        Direction::XPlus,
        Direction::XMinus,
        Direction::ZPlus,
        Direction::ZMinus,
        Direction::YPlus,
        Direction::YMinus,
    ];

    /// Look up a direction by its code (0..6).
    pub fn from_code(code: u8) -> Option<Direction> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Unit step on the lattice.
    pub fn step(self) -> IVec3 {
        STEPS[self as usize]
    }

    pub fn opposite(self) -> Direction {
        OPPOSITES[self as usize]
    }

    /// Bit index inside a door mask.
    pub fn bit(self) -> u8 {
        self as u8
    }

    /// Single-bit mask for this direction.
    pub fn mask(self) -> u8 {
        1 << self.bit()
    }

    /// Floor/ceiling openings use the vertical door and cap variants.
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::YPlus | Direction::YMinus)
    }

    /// Short label, also used as the socket name suffix ("Socket_X+").
    pub fn label(self) -> &'static str {
        match self {
            Direction::XPlus => "X+",
            Direction::XMinus => "X-",
            Direction::YPlus => "Y+",
            Direction::YMinus => "Y-",
            Direction::ZPlus => "Z+",
            Direction::ZMinus => "Z-",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Iterate the directions whose bits are set in `mask`, in code order.
pub fn directions_in_mask(mask: u8) -> impl Iterator<Item = Direction> {
    Direction::ALL
        .into_iter()
        .filter(move |d| mask & d.mask() != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_ne!(d.opposite(), d);
        }
    }

    #[test]
    fn test_opposite_steps_cancel() {
        for d in Direction::ALL {
            assert_eq!(d.step() + d.opposite().step(), IVec3::ZERO);
        }
    }

    #[test]
    fn test_bits_are_distinct() {
        let combined = Direction::ALL.iter().fold(0u8, |acc, d| acc | d.mask());
        assert_eq!(combined, 0b11_1111);
    }

    #[test]
    fn test_code_round_trip() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_code(d.code()), Some(d));
        }
        assert_eq!(Direction::from_code(6), None);
    }

    #[test]
    fn test_directions_in_mask() {
        let mask = Direction::XMinus.mask() | Direction::ZPlus.mask();
        let dirs: Vec<_> = directions_in_mask(mask).collect();
        assert_eq!(dirs, vec![Direction::XMinus, Direction::ZPlus]);
    }

    #[test]
    fn test_only_y_is_vertical() {
        let vertical: Vec<_> = Direction::ALL.into_iter().filter(|d| d.is_vertical()).collect();
        assert_eq!(vertical, vec![Direction::YPlus, Direction::YMinus]);
    }
}
