use glam::Vec3;

/// Position component - world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub value: Vec3,
}

impl Position {
    pub fn new(value: Vec3) -> Self {
        Self { value }
    }
}

/// Health component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self {
            current: max,
            max,
        }
    }

    pub fn percentage(&self) -> f32 {
        if self.max <= 0 {
            return 0.0;
        }
        (self.current as f32 / self.max as f32).clamp(0.0, 1.0)
    }

    /// Apply damage, floored at zero. Returns true if this hit was the killing blow.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.is_dead() {
            return false;
        }
        self.current = (self.current - amount.max(0)).max(0);
        self.is_dead()
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }
}

/// Enemy marker with its definition name (for logs)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enemy {
    pub name: &'static str,
}

/// The room whose controller counts this entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomMember {
    pub room: usize,
}
