//! Staggered ("cinematic") materialization pacing.

/// Rooms materialized per batch
pub const MATERIALIZE_BATCH_SIZE: usize = 3;
/// Delay between batches (seconds)
pub const MATERIALIZE_BATCH_DELAY: f32 = 0.15;
