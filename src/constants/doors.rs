//! Door interaction constants.

/// Maximum distance at which a door accepts an open request
pub const DOOR_INTERACT_RANGE: f32 = 3.0;
/// Door collider half extents for an X-facing door (rotated for other axes)
pub const DOOR_COLLIDER_HALF_EXTENTS: [f32; 3] = [0.5, 1.5, 1.5];
